use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, macros::format_description};
use uuid::Uuid;

use crate::{Error, Result, ShopdeskService};
use shopdesk_domain::when;
use shopdesk_providers::calendar::CalendarEvent;
use shopdesk_storage::{models::Appointment, queries};

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentRequest {
	pub session_id: Uuid,
	/// Free-text date phrase, e.g. "mañana a las 15:30".
	pub when: String,
	pub contact: String,
	pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentResponse {
	pub appointment: AppointmentSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentSummary {
	pub appointment_id: Uuid,
	#[serde(with = "time::serde::rfc3339")]
	pub starts_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub ends_at: OffsetDateTime,
	pub calendar_link: Option<String>,
}

/// Callback slot read from a shopper's message.
pub(crate) enum ScheduleOutcome {
	Missing,
	Past,
	Upcoming(OffsetDateTime),
}

pub(crate) struct Callback<'a> {
	pub(crate) session_id: Uuid,
	pub(crate) starts_at: OffsetDateTime,
	pub(crate) contact: Option<&'a str>,
	pub(crate) note: Option<&'a str>,
}

impl ShopdeskService {
	pub async fn book_appointment(&self, req: AppointmentRequest) -> Result<AppointmentResponse> {
		let contact = req.contact.trim();

		if contact.is_empty() {
			return Err(Error::InvalidRequest { message: "contact must be non-empty.".to_string() });
		}
		if queries::get_session(&self.db, req.session_id).await?.is_none() {
			return Err(Error::NotFound { message: format!("chat session {}", req.session_id) });
		}

		let now = self.local_now();
		let starts_at = match self.read_schedule(&req.when, now) {
			ScheduleOutcome::Upcoming(at) => at,
			ScheduleOutcome::Missing =>
				return Err(Error::InvalidRequest {
					message: "when must name a day or a time.".to_string(),
				}),
			ScheduleOutcome::Past =>
				return Err(Error::InvalidRequest {
					message: "when must be in the future.".to_string(),
				}),
		};
		let note = req.note.as_deref().map(str::trim).filter(|note| !note.is_empty());
		let appointment = self
			.schedule_callback(Callback {
				session_id: req.session_id,
				starts_at,
				contact: Some(contact),
				note,
			})
			.await?;

		Ok(AppointmentResponse { appointment })
	}

	pub(crate) fn read_schedule(&self, text: &str, now: OffsetDateTime) -> ScheduleOutcome {
		match when::parse_when(text, now, self.cfg.scheduling.default_hour) {
			None => ScheduleOutcome::Missing,
			Some(parsed) if parsed.at <= now => ScheduleOutcome::Past,
			Some(parsed) => ScheduleOutcome::Upcoming(parsed.at),
		}
	}

	/// Creates the calendar event first, then records it. A failed insert leaves the event in
	/// the calendar and is logged with its id.
	pub(crate) async fn schedule_callback(
		&self,
		callback: Callback<'_>,
	) -> Result<AppointmentSummary> {
		let scheduling = &self.cfg.scheduling;
		let duration = Duration::minutes(i64::from(scheduling.duration_minutes));
		let ends_at = callback.starts_at + duration;
		let event = CalendarEvent {
			summary: match callback.contact {
				Some(contact) => format!("{} ({contact})", scheduling.event_summary),
				None => scheduling.event_summary.clone(),
			},
			description: event_description(&callback),
			start: callback.starts_at,
			end: ends_at,
		};
		let created =
			self.providers.calendar.create_event(&self.cfg.providers.calendar, &event).await?;
		let appointment = Appointment {
			appointment_id: Uuid::new_v4(),
			session_id: callback.session_id,
			contact: callback.contact.map(str::to_string),
			note: callback.note.map(str::to_string),
			starts_at: callback.starts_at,
			ends_at,
			calendar_event_id: created.id,
			calendar_link: created.html_link,
			created_at: OffsetDateTime::now_utc(),
		};

		if let Err(err) = queries::insert_appointment(&self.db, &appointment).await {
			tracing::error!(
				error = %err,
				calendar_event_id = %appointment.calendar_event_id,
				"Calendar event created but appointment was not recorded."
			);

			return Err(err.into());
		}

		tracing::info!(
			session_id = %appointment.session_id,
			appointment_id = %appointment.appointment_id,
			starts_at = %appointment.starts_at,
			"Callback scheduled."
		);

		Ok(AppointmentSummary {
			appointment_id: appointment.appointment_id,
			starts_at: appointment.starts_at,
			ends_at: appointment.ends_at,
			calendar_link: appointment.calendar_link,
		})
	}
}

/// "13-03-2025 15:30", the form used in confirmation replies.
pub(crate) fn display_when(at: OffsetDateTime) -> String {
	at.format(format_description!("[day]-[month]-[year] [hour]:[minute]"))
		.unwrap_or_else(|_| at.to_string())
}

fn event_description(callback: &Callback<'_>) -> String {
	let mut lines = vec![format!("Sesión de chat: {}", callback.session_id)];

	if let Some(contact) = callback.contact {
		lines.push(format!("Contacto: {contact}"));
	}
	if let Some(note) = callback.note {
		lines.push(format!("Nota: {note}"));
	}

	lines.join("\n")
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn display_when_uses_day_first() {
		assert_eq!(display_when(datetime!(2025-03-13 15:30 -4)), "13-03-2025 15:30");
	}

	#[test]
	fn description_lists_contact_and_note() {
		let callback = Callback {
			session_id: Uuid::nil(),
			starts_at: datetime!(2025-03-13 15:30 -4),
			contact: Some("+56 9 1234 5678"),
			note: Some("Consulta por envíos"),
		};
		let description = event_description(&callback);

		assert!(description.contains("Contacto: +56 9 1234 5678"));
		assert!(description.ends_with("Nota: Consulta por envíos"));
	}
}
