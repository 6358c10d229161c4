use regex::Regex;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Lowercases, strips diacritics, and collapses whitespace so keyword lists can be written
/// without accents.
pub fn fold(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	let mut pending_space = false;

	for ch in text.nfd().filter(|ch| !is_combining_mark(*ch)) {
		for lower in ch.to_lowercase() {
			if lower.is_whitespace() {
				pending_space = !out.is_empty();

				continue;
			}
			if pending_space {
				out.push(' ');

				pending_space = false;
			}

			out.push(lower);
		}
	}

	out
}

pub fn collapse_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops markup from storefront descriptions and decodes the handful of entities WordPress emits.
///
/// Inline tags vanish so words they wrap stay glued to neighboring punctuation; any other tag
/// separates words.
pub fn strip_html(html: &str) -> String {
	let inline = replace_all(
		html,
		r"(?i)</?(?:a|abbr|b|em|i|small|span|strong|sub|sup|u)\b[^>]*>",
		"",
	);
	let without_tags = replace_all(&inline, r"(?s)<[^>]*>", " ");
	let decoded = without_tags
		.replace("&nbsp;", " ")
		.replace("&#8211;", "-")
		.replace("&#8217;", "'")
		.replace("&quot;", "\"")
		.replace("&#39;", "'")
		.replace("&lt;", "<")
		.replace("&gt;", ">")
		.replace("&amp;", "&");

	replace_all(&collapse_whitespace(&decoded), r" ([.,;:!?)])", "$1")
}

fn replace_all(text: &str, pattern: &str, with: &str) -> String {
	match Regex::new(pattern) {
		Ok(re) => re.replace_all(text, with).into_owned(),
		Err(_) => text.to_string(),
	}
}

/// First email address or phone number (eight or more digits) found in a message.
pub fn find_contact(text: &str) -> Option<String> {
	let email = Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").ok()?;

	if let Some(found) = email.find(text) {
		return Some(found.as_str().to_string());
	}

	let phone = Regex::new(r"\+?\d[\d -]{6,}\d").ok()?;

	phone
		.find_iter(text)
		.map(|found| found.as_str().trim())
		.find(|candidate| candidate.chars().filter(char::is_ascii_digit).count() >= 8)
		.map(str::to_string)
}
