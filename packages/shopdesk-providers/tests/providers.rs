use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode},
	routing::{get, post},
};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use serde_json::{Map, Value};
use time::macros::datetime;
use tokio::net::TcpListener;

use shopdesk_config::{CalendarConfig, CompletionProviderConfig, StorefrontConfig};
use shopdesk_domain::conversation::{ChatMessage, Role};
use shopdesk_providers::calendar::CalendarEvent;

#[derive(Clone, Default)]
struct Recorder {
	requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}
impl Recorder {
	fn record(&self, route: &str, headers: &HeaderMap, body: Value) {
		let auth = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_string);

		self.requests.lock().expect("lock").push((route.to_string(), auth, body));
	}

	fn take(&self) -> Vec<(String, Option<String>, Value)> {
		std::mem::take(&mut *self.requests.lock().expect("lock"))
	}
}

async fn products(
	State(recorder): State<Recorder>,
	headers: HeaderMap,
	Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
	recorder.record("products", &headers, serde_json::to_value(&query).expect("query"));

	let page: u64 = query.get("page").and_then(|raw| raw.parse().ok()).unwrap_or(1);
	let items = match page {
		1 => vec![
			serde_json::json!({ "id": 1, "name": "Bolsa", "status": "publish" }),
			serde_json::json!({ "id": 2, "name": "Cepillo", "status": "publish" }),
		],
		2 => vec![serde_json::json!({ "id": 3, "name": "Jabón", "status": "publish" })],
		_ => vec![],
	};

	Json(Value::Array(items))
}

async fn completions(
	State(recorder): State<Recorder>,
	headers: HeaderMap,
	Json(body): Json<Value>,
) -> Json<Value> {
	recorder.record("completions", &headers, body);

	Json(serde_json::json!({
		"choices": [{ "message": { "role": "assistant", "content": " Claro, tenemos opciones. " } }]
	}))
}

async fn events(
	State(recorder): State<Recorder>,
	Path(calendar_id): Path<String>,
	headers: HeaderMap,
	Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
	recorder.record(&format!("events:{calendar_id}"), &headers, body);

	(StatusCode::OK, Json(serde_json::json!({ "id": "evt-1", "htmlLink": "https://cal/evt-1" })))
}

async fn spawn_mock() -> (String, Recorder) {
	let recorder = Recorder::default();
	let app = Router::new()
		.route("/wp-json/wc/v3/products", get(products))
		.route("/v1/chat/completions", post(completions))
		.route("/calendars/{calendar_id}/events", post(events))
		.with_state(recorder.clone());
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind mock server.");
	let addr = listener.local_addr().expect("Mock server address.");

	tokio::spawn(async move {
		let _ = axum::serve(listener, app).await;
	});

	(format!("http://{addr}"), recorder)
}

#[test]
fn builds_bearer_auth_header() {
	let headers =
		shopdesk_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
	assert_eq!(
		headers.get(USER_AGENT).expect("Missing user agent."),
		shopdesk_providers::USER_AGENT_VALUE
	);
}

#[test]
fn rejects_non_string_default_headers() {
	let mut extra = Map::new();

	extra.insert("x-org".to_string(), Value::Bool(true));

	assert!(shopdesk_providers::auth_headers("secret", &extra).is_err());
}

#[tokio::test]
async fn storefront_pages_until_short_page() {
	let (base, recorder) = spawn_mock().await;
	let cfg = StorefrontConfig {
		api_base: base,
		path: "/wp-json/wc/v3/products".to_string(),
		consumer_key: "ck".to_string(),
		consumer_secret: "cs".to_string(),
		per_page: 2,
		max_pages: 10,
		in_stock_only: false,
		timeout_ms: 5_000,
	};
	let products =
		shopdesk_providers::storefront::fetch_products(&cfg).await.expect("Fetch failed.");

	assert_eq!(products.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);

	let requests = recorder.take();

	assert_eq!(requests.len(), 2);
	// "ck:cs" in base64.
	assert_eq!(requests[0].1.as_deref(), Some("Basic Y2s6Y3M="));
	assert_eq!(requests[1].2["page"], "2");
	assert_eq!(requests[1].2["per_page"], "2");
	assert_eq!(requests[1].2["status"], "publish");
}

#[tokio::test]
async fn completion_sends_limits_and_trims_reply() {
	let (base, recorder) = spawn_mock().await;
	let cfg = CompletionProviderConfig {
		provider_id: "mock".to_string(),
		api_base: base,
		api_key: "sk-test".to_string(),
		path: "/v1/chat/completions".to_string(),
		model: "gpt-3.5-turbo".to_string(),
		temperature: 0.7,
		max_tokens: 150,
		timeout_ms: 5_000,
		default_headers: Map::new(),
	};
	let messages =
		vec![ChatMessage::new(Role::System, "prompt"), ChatMessage::new(Role::User, "hola")];
	let reply = shopdesk_providers::completion::complete(&cfg, &messages)
		.await
		.expect("Completion failed.");

	assert_eq!(reply, "Claro, tenemos opciones.");

	let requests = recorder.take();
	let body = &requests[0].2;

	assert_eq!(requests[0].1.as_deref(), Some("Bearer sk-test"));
	assert_eq!(body["max_tokens"], 150);
	assert_eq!(body["messages"][1], serde_json::json!({ "role": "user", "content": "hola" }));
}

#[tokio::test]
async fn calendar_posts_event_to_calendar() {
	let (base, recorder) = spawn_mock().await;
	let cfg = CalendarConfig {
		api_base: base,
		access_token: "ya29.token".to_string(),
		calendar_id: "primary".to_string(),
		time_zone: "America/Santiago".to_string(),
		timeout_ms: 5_000,
	};
	let event = CalendarEvent {
		summary: "Llamada con cliente".to_string(),
		description: "Contacto: ana@example.com".to_string(),
		start: datetime!(2025-03-13 15:30 -4),
		end: datetime!(2025-03-13 16:00 -4),
	};
	let created = shopdesk_providers::calendar::create_event(&cfg, &event)
		.await
		.expect("Event creation failed.");

	assert_eq!(created.id, "evt-1");

	let requests = recorder.take();

	assert_eq!(requests[0].0, "events:primary");
	assert_eq!(requests[0].1.as_deref(), Some("Bearer ya29.token"));
	assert_eq!(requests[0].2["summary"], "Llamada con cliente");
}

#[tokio::test]
async fn calendar_rejects_inverted_range_without_calling_out() {
	let cfg = CalendarConfig {
		api_base: "http://127.0.0.1:1".to_string(),
		access_token: "token".to_string(),
		calendar_id: "primary".to_string(),
		time_zone: "UTC".to_string(),
		timeout_ms: 100,
	};
	let event = CalendarEvent {
		summary: "x".to_string(),
		description: String::new(),
		start: datetime!(2025-03-13 16:00 UTC),
		end: datetime!(2025-03-13 15:00 UTC),
	};

	assert!(shopdesk_providers::calendar::create_event(&cfg, &event).await.is_err());
}
