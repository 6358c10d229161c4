use serde::Serialize;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, ShopdeskService};
use shopdesk_domain::{
	conversation::{ChatMessage, Role},
	intent::Intent,
};
use shopdesk_storage::{
	models::{ChatMessageRow, NewChatMessage},
	queries,
};

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
	pub session_id: Uuid,
	pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
	pub seq: i32,
	pub role: Role,
	pub content: String,
	pub intent: Option<Intent>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl MessageView {
	fn from_row(row: ChatMessageRow) -> Option<Self> {
		let Some(role) = Role::parse(&row.role) else {
			tracing::warn!(
				message_id = %row.message_id,
				role = %row.role,
				"Skipping message with unknown role."
			);

			return None;
		};

		Some(Self {
			seq: row.seq,
			role,
			content: row.content,
			intent: row.intent.as_deref().and_then(Intent::parse),
			created_at: row.created_at,
		})
	}
}

impl ShopdeskService {
	/// Opens a session seeded with the greeting.
	pub async fn start_session(&self) -> Result<SessionResponse> {
		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let session_id = self.open_session_tx(&mut tx, now).await?;
		let rows = queries::list_messages_tx(&mut tx, session_id).await?;

		tx.commit().await?;

		Ok(SessionResponse {
			session_id,
			messages: rows.into_iter().filter_map(MessageView::from_row).collect(),
		})
	}

	pub async fn history(&self, session_id: Uuid) -> Result<SessionResponse> {
		if queries::get_session(&self.db, session_id).await?.is_none() {
			return Err(Error::NotFound { message: format!("chat session {session_id}") });
		}

		let rows = queries::list_messages(&self.db, session_id).await?;

		Ok(SessionResponse {
			session_id,
			messages: rows.into_iter().filter_map(MessageView::from_row).collect(),
		})
	}

	pub(crate) async fn open_session_tx(
		&self,
		tx: &mut Transaction<'_, Postgres>,
		now: OffsetDateTime,
	) -> Result<Uuid> {
		let session = queries::create_session_tx(tx, Uuid::new_v4(), now).await?;
		let greeting = self.cfg.chat.greeting.trim();

		if !greeting.is_empty() {
			queries::append_message_tx(
				tx,
				&NewChatMessage {
					session_id: session.session_id,
					role: Role::Assistant.as_str(),
					content: greeting,
					intent: None,
					created_at: now,
				},
			)
			.await?;
		}

		tracing::info!(session_id = %session.session_id, "Chat session opened.");

		Ok(session.session_id)
	}
}

/// Stored rows as completion turns; rows with an unknown role are dropped.
pub(crate) fn to_chat_messages(rows: &[ChatMessageRow]) -> Vec<ChatMessage> {
	rows.iter()
		.filter_map(|row| {
			Role::parse(&row.role).map(|role| ChatMessage::new(role, row.content.as_str()))
		})
		.collect()
}
