use sqlx::{Executor, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{Appointment, ChatMessageRow, ChatSession, NewChatMessage, ProductEmbedding},
};

pub async fn create_session_tx(
	tx: &mut Transaction<'_, Postgres>,
	session_id: Uuid,
	now: OffsetDateTime,
) -> Result<ChatSession> {
	let session = sqlx::query_as::<_, ChatSession>(
		"\
INSERT INTO chat_sessions (session_id, created_at, updated_at)
VALUES ($1, $2, $2)
RETURNING session_id, created_at, updated_at",
	)
	.bind(session_id)
	.bind(now)
	.fetch_one(&mut **tx)
	.await?;

	Ok(session)
}

pub async fn get_session(db: &Db, session_id: Uuid) -> Result<Option<ChatSession>> {
	let session = sqlx::query_as::<_, ChatSession>(
		"SELECT session_id, created_at, updated_at FROM chat_sessions WHERE session_id = $1",
	)
	.bind(session_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(session)
}

/// Row-locks the session so concurrent turns append messages one at a time.
pub async fn lock_session_tx(
	tx: &mut Transaction<'_, Postgres>,
	session_id: Uuid,
) -> Result<Option<ChatSession>> {
	let session = sqlx::query_as::<_, ChatSession>(
		"\
SELECT session_id, created_at, updated_at
FROM chat_sessions
WHERE session_id = $1
FOR UPDATE",
	)
	.bind(session_id)
	.fetch_optional(&mut **tx)
	.await?;

	Ok(session)
}

pub async fn touch_session_tx(
	tx: &mut Transaction<'_, Postgres>,
	session_id: Uuid,
	now: OffsetDateTime,
) -> Result<()> {
	let result = sqlx::query("UPDATE chat_sessions SET updated_at = $1 WHERE session_id = $2")
		.bind(now)
		.bind(session_id)
		.execute(&mut **tx)
		.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("chat session {session_id}")));
	}

	Ok(())
}

pub async fn append_message_tx(
	tx: &mut Transaction<'_, Postgres>,
	message: &NewChatMessage<'_>,
) -> Result<ChatMessageRow> {
	if message.content.trim().is_empty() {
		return Err(Error::InvalidArgument("message content must be non-empty".to_string()));
	}

	let row = sqlx::query_as::<_, ChatMessageRow>(
		"\
INSERT INTO chat_messages (message_id, session_id, seq, role, content, intent, created_at)
SELECT
	$1,
	$2,
	COALESCE(MAX(seq), 0) + 1,
	$3,
	$4,
	$5,
	$6
FROM chat_messages
WHERE session_id = $2
RETURNING message_id, session_id, seq, role, content, intent, created_at",
	)
	.bind(Uuid::new_v4())
	.bind(message.session_id)
	.bind(message.role)
	.bind(message.content)
	.bind(message.intent)
	.bind(message.created_at)
	.fetch_one(&mut **tx)
	.await?;

	Ok(row)
}

pub async fn list_messages(db: &Db, session_id: Uuid) -> Result<Vec<ChatMessageRow>> {
	list_messages_exec(&db.pool, session_id).await
}

pub async fn list_messages_tx(
	tx: &mut Transaction<'_, Postgres>,
	session_id: Uuid,
) -> Result<Vec<ChatMessageRow>> {
	list_messages_exec(&mut **tx, session_id).await
}

pub async fn insert_appointment(db: &Db, appointment: &Appointment) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO appointments (
	appointment_id,
	session_id,
	contact,
	note,
	starts_at,
	ends_at,
	calendar_event_id,
	calendar_link,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
	)
	.bind(appointment.appointment_id)
	.bind(appointment.session_id)
	.bind(appointment.contact.as_deref())
	.bind(appointment.note.as_deref())
	.bind(appointment.starts_at)
	.bind(appointment.ends_at)
	.bind(appointment.calendar_event_id.as_str())
	.bind(appointment.calendar_link.as_deref())
	.bind(appointment.created_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn list_appointments(db: &Db, session_id: Uuid) -> Result<Vec<Appointment>> {
	let rows = sqlx::query_as::<_, Appointment>(
		"\
SELECT
	appointment_id,
	session_id,
	contact,
	note,
	starts_at,
	ends_at,
	calendar_event_id,
	calendar_link,
	created_at
FROM appointments
WHERE session_id = $1
ORDER BY starts_at, appointment_id",
	)
	.bind(session_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn get_product_embeddings(
	db: &Db,
	content_hashes: &[String],
	embedding_version: &str,
) -> Result<Vec<ProductEmbedding>> {
	if content_hashes.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, ProductEmbedding>(
		"\
SELECT content_hash, embedding_version, embedding_dim, vec, created_at
FROM product_embeddings
WHERE content_hash = ANY($1) AND embedding_version = $2",
	)
	.bind(content_hashes)
	.bind(embedding_version)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn upsert_product_embedding(
	db: &Db,
	content_hash: &str,
	embedding_version: &str,
	vec: &[f32],
	now: OffsetDateTime,
) -> Result<()> {
	let dim = i32::try_from(vec.len())
		.map_err(|_| Error::InvalidArgument("embedding is too large".to_string()))?;

	if dim == 0 {
		return Err(Error::InvalidArgument("embedding must be non-empty".to_string()));
	}

	sqlx::query(
		"\
INSERT INTO product_embeddings (content_hash, embedding_version, embedding_dim, vec, created_at)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (content_hash, embedding_version) DO UPDATE
SET
	embedding_dim = EXCLUDED.embedding_dim,
	vec = EXCLUDED.vec,
	created_at = EXCLUDED.created_at",
	)
	.bind(content_hash)
	.bind(embedding_version)
	.bind(dim)
	.bind(vec)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}

async fn list_messages_exec<'e, E>(executor: E, session_id: Uuid) -> Result<Vec<ChatMessageRow>>
where
	E: Executor<'e, Database = Postgres>,
{
	let rows = sqlx::query_as::<_, ChatMessageRow>(
		"\
SELECT message_id, session_id, seq, role, content, intent, created_at
FROM chat_messages
WHERE session_id = $1
ORDER BY seq",
	)
	.bind(session_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
