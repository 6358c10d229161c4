use serde::{Deserialize, Serialize};

use shopdesk_config::Keywords;

use crate::text;

/// Branch a shopper message is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	Schedule,
	Products,
	Human,
	Seller,
	Chat,
}
impl Intent {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Schedule => "schedule",
			Self::Products => "products",
			Self::Human => "human",
			Self::Seller => "seller",
			Self::Chat => "chat",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"schedule" => Some(Self::Schedule),
			"products" => Some(Self::Products),
			"human" => Some(Self::Human),
			"seller" => Some(Self::Seller),
			"chat" => Some(Self::Chat),
			_ => None,
		}
	}
}

/// First keyword list with a hit wins, in the order schedule, products, human, seller. A keyword
/// hits when it starts a word of the message, so `cita` matches `citas` but not `solicitar`.
pub fn classify(message: &str, keywords: &Keywords) -> Intent {
	let folded = text::fold(message);

	if folded.is_empty() {
		return Intent::Chat;
	}

	for (intent, list) in [
		(Intent::Schedule, &keywords.schedule),
		(Intent::Products, &keywords.products),
		(Intent::Human, &keywords.human),
		(Intent::Seller, &keywords.seller),
	] {
		if matches_any(&folded, list) {
			return intent;
		}
	}

	Intent::Chat
}

fn matches_any(folded: &str, keywords: &[String]) -> bool {
	keywords
		.iter()
		.map(|keyword| text::fold(keyword))
		.any(|keyword| !keyword.is_empty() && starts_a_word(folded, &keyword))
}

fn starts_a_word(folded: &str, keyword: &str) -> bool {
	folded.match_indices(keyword).any(|(idx, _)| {
		folded[..idx].chars().next_back().is_none_or(|prev| !prev.is_alphanumeric())
	})
}
