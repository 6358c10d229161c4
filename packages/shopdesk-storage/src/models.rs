use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatSession {
	pub session_id: Uuid,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatMessageRow {
	pub message_id: Uuid,
	pub session_id: Uuid,
	pub seq: i32,
	pub role: String,
	pub content: String,
	pub intent: Option<String>,
	pub created_at: OffsetDateTime,
}

/// Message to append; `seq` is assigned on insert.
#[derive(Debug, Clone)]
pub struct NewChatMessage<'a> {
	pub session_id: Uuid,
	pub role: &'a str,
	pub content: &'a str,
	pub intent: Option<&'a str>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Appointment {
	pub appointment_id: Uuid,
	pub session_id: Uuid,
	pub contact: Option<String>,
	pub note: Option<String>,
	pub starts_at: OffsetDateTime,
	pub ends_at: OffsetDateTime,
	pub calendar_event_id: String,
	pub calendar_link: Option<String>,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductEmbedding {
	pub content_hash: String,
	pub embedding_version: String,
	pub embedding_dim: i32,
	pub vec: Vec<f32>,
	pub created_at: OffsetDateTime,
}
