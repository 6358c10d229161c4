use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::{Client, Url};
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use shopdesk_config::CalendarConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
	pub summary: String,
	pub description: String,
	pub start: OffsetDateTime,
	pub end: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
	pub id: String,
	pub html_link: Option<String>,
}

pub async fn create_event(cfg: &CalendarConfig, event: &CalendarEvent) -> Result<CreatedEvent> {
	if event.end <= event.start {
		return Err(eyre::eyre!("Calendar event must end after it starts."));
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = events_url(&cfg.api_base, &cfg.calendar_id)?;
	let body = event_body(event, &cfg.time_zone)?;
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.access_token, &serde_json::Map::new())?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_created_event(json)
}

fn events_url(api_base: &str, calendar_id: &str) -> Result<Url> {
	let mut url = Url::parse(api_base)?;

	url.path_segments_mut()
		.map_err(|_| eyre::eyre!("Calendar api_base cannot be a base URL."))?
		.pop_if_empty()
		.push("calendars")
		.push(calendar_id)
		.push("events");

	Ok(url)
}

fn event_body(event: &CalendarEvent, time_zone: &str) -> Result<Value> {
	Ok(serde_json::json!({
		"summary": event.summary,
		"description": event.description,
		"start": { "dateTime": event.start.format(&Rfc3339)?, "timeZone": time_zone },
		"end": { "dateTime": event.end.format(&Rfc3339)?, "timeZone": time_zone },
	}))
}

fn parse_created_event(json: Value) -> Result<CreatedEvent> {
	let id = json
		.get("id")
		.and_then(|v| v.as_str())
		.filter(|id| !id.is_empty())
		.ok_or_else(|| eyre::eyre!("Calendar response is missing the event id."))?;
	let html_link = json.get("htmlLink").and_then(|v| v.as_str()).map(str::to_string);

	Ok(CreatedEvent { id: id.to_string(), html_link })
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn encodes_calendar_id_into_path() {
		let url = events_url("https://www.googleapis.com/calendar/v3", "ventas@shop.example")
			.expect("valid url");

		assert_eq!(
			url.as_str(),
			"https://www.googleapis.com/calendar/v3/calendars/ventas@shop.example/events"
		);

		let url = events_url("http://127.0.0.1:9000/", "a b/c").expect("valid url");

		assert_eq!(url.as_str(), "http://127.0.0.1:9000/calendars/a%20b%2Fc/events");
	}

	#[test]
	fn renders_rfc3339_times_with_zone() {
		let event = CalendarEvent {
			summary: "Llamada con cliente".to_string(),
			description: "Contacto: +56 9 1234 5678".to_string(),
			start: datetime!(2025-03-13 15:30 -4),
			end: datetime!(2025-03-13 16:00 -4),
		};
		let body = event_body(&event, "America/Santiago").expect("body");

		assert_eq!(body["start"]["dateTime"], "2025-03-13T15:30:00-04:00");
		assert_eq!(body["end"]["timeZone"], "America/Santiago");
	}

	#[test]
	fn parses_created_event() {
		let json = serde_json::json!({ "id": "evt123", "htmlLink": "https://calendar/evt123" });
		let created = parse_created_event(json).expect("parse failed");

		assert_eq!(created.id, "evt123");
		assert_eq!(created.html_link.as_deref(), Some("https://calendar/evt123"));
		assert!(parse_created_event(serde_json::json!({ "status": "confirmed" })).is_err());
	}
}
