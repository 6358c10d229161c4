use time::OffsetDateTime;
use uuid::Uuid;

use shopdesk_config::Postgres;
use shopdesk_storage::{
	db::Db,
	models::{Appointment, NewChatMessage},
	queries,
};
use shopdesk_testkit::TestDatabase;

async fn connect(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHOPDESK_PG_DSN to run."]
async fn schema_bootstrap_is_idempotent() {
	let Some(base_dsn) = shopdesk_testkit::env_dsn() else {
		eprintln!("Skipping schema_bootstrap_is_idempotent; set SHOPDESK_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;

	db.ensure_schema().await.expect("Second bootstrap must succeed.");

	let count: i64 = sqlx::query_scalar(
		"\
SELECT count(*)
FROM information_schema.tables
WHERE table_name IN ('chat_sessions', 'chat_messages', 'appointments', 'product_embeddings')",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema tables.");

	assert_eq!(count, 4);

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHOPDESK_PG_DSN to run."]
async fn messages_get_sequential_numbers() {
	let Some(base_dsn) = shopdesk_testkit::env_dsn() else {
		eprintln!(
			"Skipping messages_get_sequential_numbers; set SHOPDESK_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let session_id = Uuid::new_v4();
	let now = OffsetDateTime::now_utc();
	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");

	queries::create_session_tx(&mut tx, session_id, now).await.expect("Failed to create session.");

	for (role, content) in [("assistant", "hola"), ("user", "busco jabón"), ("assistant", "ok")] {
		let message = NewChatMessage {
			session_id,
			role,
			content,
			intent: (role == "user").then_some("products"),
			created_at: now,
		};

		queries::append_message_tx(&mut tx, &message).await.expect("Failed to append message.");
	}

	tx.commit().await.expect("Failed to commit.");

	let rows = queries::list_messages(&db, session_id).await.expect("Failed to list messages.");

	assert_eq!(rows.iter().map(|row| row.seq).collect::<Vec<_>>(), vec![1, 2, 3]);
	assert_eq!(rows[1].intent.as_deref(), Some("products"));
	assert!(queries::get_session(&db, Uuid::new_v4()).await.expect("query").is_none());

	test_db.cleanup().await.expect("Failed to clean up test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SHOPDESK_PG_DSN to run."]
async fn appointments_and_embeddings_round_trip() {
	let Some(base_dsn) = shopdesk_testkit::env_dsn() else {
		eprintln!(
			"Skipping appointments_and_embeddings_round_trip; set SHOPDESK_PG_DSN to run this test."
		);

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let session_id = Uuid::new_v4();
	let now = OffsetDateTime::now_utc();
	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");

	queries::create_session_tx(&mut tx, session_id, now).await.expect("Failed to create session.");
	tx.commit().await.expect("Failed to commit.");

	let appointment = Appointment {
		appointment_id: Uuid::new_v4(),
		session_id,
		contact: Some("+56 9 1234 5678".to_string()),
		note: None,
		starts_at: now + time::Duration::hours(1),
		ends_at: now + time::Duration::hours(2),
		calendar_event_id: "evt-1".to_string(),
		calendar_link: Some("https://cal/evt-1".to_string()),
		created_at: now,
	};

	queries::insert_appointment(&db, &appointment).await.expect("Failed to insert appointment.");

	let stored = queries::list_appointments(&db, session_id).await.expect("list");

	assert_eq!(stored.len(), 1);
	assert_eq!(stored[0].calendar_event_id, "evt-1");

	queries::upsert_product_embedding(&db, "hash-a", "openai:m:2", &[0.5, 0.25], now)
		.await
		.expect("Failed to store embedding.");
	queries::upsert_product_embedding(&db, "hash-a", "openai:m:2", &[1.0, 0.0], now)
		.await
		.expect("Failed to overwrite embedding.");

	let cached = queries::get_product_embeddings(
		&db,
		&["hash-a".to_string(), "hash-b".to_string()],
		"openai:m:2",
	)
	.await
	.expect("Failed to load embeddings.");

	assert_eq!(cached.len(), 1);
	assert_eq!(cached[0].vec, vec![1.0, 0.0]);
	assert!(queries::upsert_product_embedding(&db, "hash-c", "v", &[], now).await.is_err());

	test_db.cleanup().await.expect("Failed to clean up test database.");
}
