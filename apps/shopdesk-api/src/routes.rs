use std::sync::Arc;

use axum::{
	Json, Router,
	body::Body,
	extract::{
		Path, State,
		rejection::{JsonRejection, PathRejection},
	},
	http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;
use shopdesk_service::{
	AppointmentRequest, AppointmentResponse, CatalogReport, CatalogStatus, ChatRequest,
	ChatResponse, Error as ServiceError, SessionResponse,
};

/// Bearer token a router requires; `None` leaves it open.
#[derive(Clone)]
struct RequiredToken(Option<Arc<str>>);

#[derive(Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			ServiceError::NotFound { message } =>
				Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			ServiceError::Provider { message } => {
				tracing::error!(error = %message, "Upstream provider failed.");

				Self::new(
					StatusCode::BAD_GATEWAY,
					"PROVIDER_ERROR",
					"Upstream service failed.",
					None,
				)
			},
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Storage failed.");

				Self::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"STORAGE_ERROR",
					"Internal storage error.",
					None,
				)
			},
		}
	}
}

impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", rejection.body_text(), None)
	}
}

impl From<PathRejection> for ApiError {
	fn from(rejection: PathRejection) -> Self {
		Self::new(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			rejection.body_text(),
			Some(vec!["$.session_id".to_string()]),
		)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	let token = RequiredToken(state.service.cfg.security.api_auth_token.as_deref().map(Arc::from));

	Router::new()
		.route("/v1/sessions", post(start_session))
		.route("/v1/sessions/{session_id}/messages", get(history))
		.route("/v1/chat", post(chat))
		.route("/v1/appointments", post(book_appointment))
		.route_layer(middleware::from_fn_with_state(token, require_token))
		.route("/health", get(health))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	let token =
		RequiredToken(state.service.cfg.security.admin_auth_token.as_deref().map(Arc::from));

	Router::new()
		.route("/v1/admin/catalog/refresh", post(refresh_catalog))
		.route("/v1/admin/catalog", get(catalog_status))
		.route_layer(middleware::from_fn_with_state(token, require_token))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn start_session(State(state): State<AppState>) -> Result<Json<SessionResponse>, ApiError> {
	Ok(Json(state.service.start_session().await?))
}

async fn history(
	State(state): State<AppState>,
	session_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SessionResponse>, ApiError> {
	let Path(session_id) = session_id?;

	Ok(Json(state.service.history(session_id).await?))
}

async fn chat(
	State(state): State<AppState>,
	payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
	let Json(req) = payload?;

	Ok(Json(state.service.chat(req).await?))
}

async fn book_appointment(
	State(state): State<AppState>,
	payload: Result<Json<AppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
	let Json(req) = payload?;
	let response = state.service.book_appointment(req).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn refresh_catalog(State(state): State<AppState>) -> Result<Json<CatalogReport>, ApiError> {
	Ok(Json(state.service.refresh_catalog().await?))
}

async fn catalog_status(State(state): State<AppState>) -> Json<CatalogStatus> {
	Json(state.service.catalog_status())
}

async fn require_token(
	State(required): State<RequiredToken>,
	req: Request<Body>,
	next: Next,
) -> Response {
	if let Some(expected) = required.0.as_deref()
		&& read_bearer_token(req.headers()) != Some(expected)
	{
		return ApiError::new(
			StatusCode::UNAUTHORIZED,
			"UNAUTHORIZED",
			"A valid Bearer token is required.",
			None,
		)
		.into_response();
	}

	next.run(req).await
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}
