use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result, ShopdeskService,
	appointments::{self, AppointmentSummary, Callback, ScheduleOutcome},
	sessions,
};
use shopdesk_domain::{
	catalog::ScoredProduct,
	conversation::{self, ChatMessage, Role},
	intent::{self, Intent},
	text,
};
use shopdesk_storage::{models::NewChatMessage, queries};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
	/// Omitted on the first turn; a new session is opened.
	pub session_id: Option<Uuid>,
	pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
	pub session_id: Uuid,
	pub intent: Intent,
	pub reply: String,
	pub products: Vec<ScoredProduct>,
	pub link: Option<ReplyLink>,
	pub appointment: Option<AppointmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyLink {
	pub label: String,
	pub url: String,
}

#[derive(Debug, Clone)]
pub struct Reply {
	pub intent: Intent,
	pub text: String,
	pub products: Vec<ScoredProduct>,
	pub link: Option<ReplyLink>,
	pub appointment: Option<AppointmentSummary>,
}
impl Reply {
	fn text(intent: Intent, text: impl Into<String>) -> Self {
		Self { intent, text: text.into(), products: Vec::new(), link: None, appointment: None }
	}
}

impl ShopdeskService {
	/// Runs one shopper turn: records the message, routes it, records the reply.
	pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
		let message = validate_message(&req.message, self.cfg.chat.max_message_chars as usize)?;
		let now = OffsetDateTime::now_utc();
		let intent = intent::classify(message, &self.cfg.chat.keywords);
		let mut tx = self.db.pool.begin().await?;
		let session_id = match req.session_id {
			Some(session_id) => {
				if queries::lock_session_tx(&mut tx, session_id).await?.is_none() {
					return Err(Error::NotFound { message: format!("chat session {session_id}") });
				}

				session_id
			},
			None => self.open_session_tx(&mut tx, now).await?,
		};
		let rows = queries::list_messages_tx(&mut tx, session_id).await?;

		queries::append_message_tx(
			&mut tx,
			&NewChatMessage {
				session_id,
				role: Role::User.as_str(),
				content: message,
				intent: Some(intent.as_str()),
				created_at: now,
			},
		)
		.await?;
		tx.commit().await?;

		let mut history = sessions::to_chat_messages(&rows);

		history.push(ChatMessage::new(Role::User, message));

		let reply = match self.respond(session_id, message, &history).await {
			Ok(reply) => reply,
			Err(Error::Provider { message: err }) => {
				tracing::error!(
					%session_id,
					intent = intent.as_str(),
					error = %err,
					"Reply failed; answering with the fallback."
				);

				Reply::text(intent, self.cfg.chat.replies.fallback.as_str())
			},
			Err(err) => return Err(err),
		};
		let mut tx = self.db.pool.begin().await?;

		if queries::lock_session_tx(&mut tx, session_id).await?.is_none() {
			return Err(Error::NotFound { message: format!("chat session {session_id}") });
		}

		let replied_at = OffsetDateTime::now_utc();

		if !reply.text.trim().is_empty() {
			queries::append_message_tx(
				&mut tx,
				&NewChatMessage {
					session_id,
					role: Role::Assistant.as_str(),
					content: reply.text.as_str(),
					intent: Some(reply.intent.as_str()),
					created_at: replied_at,
				},
			)
			.await?;
		}

		queries::touch_session_tx(&mut tx, session_id, replied_at).await?;
		tx.commit().await?;

		tracing::info!(
			%session_id,
			intent = reply.intent.as_str(),
			products = reply.products.len(),
			"Chat turn answered."
		);

		Ok(ChatResponse {
			session_id,
			intent: reply.intent,
			reply: reply.text,
			products: reply.products,
			link: reply.link,
			appointment: reply.appointment,
		})
	}

	/// Routes `message` by intent and builds the reply. `history` ends with `message` itself.
	///
	/// Nothing is written to the session here; only a confirmed callback creates an appointment.
	pub async fn respond(
		&self,
		session_id: Uuid,
		message: &str,
		history: &[ChatMessage],
	) -> Result<Reply> {
		let chat = &self.cfg.chat;
		let replies = &chat.replies;
		let intent = intent::classify(message, &chat.keywords);

		match intent {
			Intent::Products => {
				let products = self.search_products(message).await?;
				let text = match products.is_empty() {
					true => replies.no_products.as_str(),
					false => replies.products_intro.as_str(),
				};

				Ok(Reply { products, ..Reply::text(intent, text) })
			},
			Intent::Human => Ok(Reply::text(intent, replies.human_handoff.as_str())),
			Intent::Seller => {
				let info = replies.seller_info.trim();
				let text = if info.is_empty() {
					replies.seller_intro.clone()
				} else {
					format!("{}\n\n{info}", replies.seller_intro)
				};
				let link = replies.seller_url.as_ref().map(|url| ReplyLink {
					label: replies.seller_link_label.clone(),
					url: url.clone(),
				});

				Ok(Reply { link, ..Reply::text(intent, text) })
			},
			Intent::Schedule => self.schedule_from_chat(session_id, message).await,
			Intent::Chat => {
				let messages = conversation::build_completion_messages(
					&chat.system_prompt,
					history,
					chat.history_window as usize,
				);
				let text = self
					.providers
					.completion
					.complete(&self.cfg.providers.completion, &messages)
					.await?;

				if text.trim().is_empty() {
					tracing::warn!(%session_id, "Completion returned an empty reply.");

					return Ok(Reply::text(intent, replies.fallback.as_str()));
				}

				Ok(Reply::text(intent, text))
			},
		}
	}

	async fn schedule_from_chat(&self, session_id: Uuid, message: &str) -> Result<Reply> {
		let replies = &self.cfg.chat.replies;

		match self.read_schedule(message, self.local_now()) {
			ScheduleOutcome::Missing =>
				Ok(Reply::text(Intent::Schedule, replies.schedule_ask.as_str())),
			ScheduleOutcome::Past =>
				Ok(Reply::text(Intent::Schedule, replies.schedule_past.as_str())),
			ScheduleOutcome::Upcoming(starts_at) => {
				let contact = text::find_contact(message);
				let appointment = self
					.schedule_callback(Callback {
						session_id,
						starts_at,
						contact: contact.as_deref(),
						note: Some(message),
					})
					.await?;
				let text = replies
					.schedule_confirmed
					.replace("{when}", &appointments::display_when(starts_at));

				Ok(Reply { appointment: Some(appointment), ..Reply::text(Intent::Schedule, text) })
			},
		}
	}
}

/// Trimmed message, rejected when empty or longer than `max_chars` characters.
pub fn validate_message(raw: &str, max_chars: usize) -> Result<&str> {
	let message = raw.trim();

	if message.is_empty() {
		return Err(Error::InvalidRequest { message: "message must be non-empty.".to_string() });
	}
	if message.chars().count() > max_chars {
		return Err(Error::InvalidRequest {
			message: format!("message must be at most {max_chars} characters."),
		});
	}

	Ok(message)
}
