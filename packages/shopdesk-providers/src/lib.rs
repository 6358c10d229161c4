pub mod calendar;
pub mod completion;
pub mod embedding;
pub mod storefront;

use color_eyre::{Result, eyre};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::{Map, Value};

pub const USER_AGENT_VALUE: &str = concat!("shopdesk/", env!("CARGO_PKG_VERSION"));

/// Bearer authorization plus any extra headers from the provider config.
pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = base_headers();
	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};
		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}
	Ok(headers)
}

pub(crate) fn base_headers() -> HeaderMap {
	let mut headers = HeaderMap::new();
	headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
	headers
}
