use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
}
impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::System => "system",
			Self::User => "user",
			Self::Assistant => "assistant",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"system" => Some(Self::System),
			"user" => Some(Self::User),
			"assistant" => Some(Self::Assistant),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: Role,
	pub content: String,
}
impl ChatMessage {
	pub fn new(role: Role, content: impl Into<String>) -> Self {
		Self { role, content: content.into() }
	}
}

pub fn history_window(history: &[ChatMessage], n: usize) -> &[ChatMessage] {
	&history[history.len().saturating_sub(n)..]
}

/// System prompt followed by the most recent `n` turns. Stored system messages are skipped so the
/// configured prompt stays the only instruction.
pub fn build_completion_messages(
	system_prompt: &str,
	history: &[ChatMessage],
	n: usize,
) -> Vec<ChatMessage> {
	let mut messages = Vec::with_capacity(n + 1);

	messages.push(ChatMessage::new(Role::System, system_prompt));
	messages.extend(
		history_window(history, n).iter().filter(|message| message.role != Role::System).cloned(),
	);

	messages
}
