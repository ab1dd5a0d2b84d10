//! HTTP endpoint handlers.
//!
//! `/events` decodes only the envelope, checks the token and hands the raw
//! body to exactly one [`EventProcessor`] method. `/users` serves the stored
//! directory behind a static API key.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};
use url::form_urlencoded;

use crate::models::{EventEnvelope, EventRoute};
use crate::store::UserStore;
use crate::web::error::ApiError;
use crate::web::processor::{DirectoryProcessor, EventProcessor};
use crate::web::signature::{verify_slack_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn UserStore>,
    pub processor: Arc<dyn EventProcessor>,
}

impl AppState {
    /// State whose events are written to `store`.
    pub fn new(config: Config, store: Arc<dyn UserStore>) -> Self {
        let config = Arc::new(config);
        let processor = Arc::new(DirectoryProcessor::new(config.clone(), store.clone()));
        Self {
            config,
            store,
            processor,
        }
    }

    /// State with a caller-supplied event processor.
    pub fn with_processor(
        config: Config,
        store: Arc<dyn UserStore>,
        processor: Arc<dyn EventProcessor>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            processor,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// User Listing
// =============================================================================

/// User listing endpoint.
///
/// Rejects a wrong API key before touching the store, then returns every user
/// as a JSON array.
pub async fn list_users(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let apikey = first_query_value(query.as_deref().unwrap_or_default(), "apikey")
        .unwrap_or_default();

    if apikey != state.config.api_key {
        warn!(apikey = %apikey, "list_users_invalid_apikey");
        return Err(ApiError::InvalidApiKey);
    }

    let users = state.store.fetch_all().await.map_err(|e| {
        error!(error = %e, "list_users_fetch_failed");
        ApiError::FetchUsers(e)
    })?;

    let body = serde_json::to_vec(&users).map_err(|e| {
        error!(error = %e, "list_users_marshal_failed");
        ApiError::Serialization(e)
    })?;

    info!(user_count = users.len(), "list_users_served");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}

// =============================================================================
// Slack Events
// =============================================================================

/// Slack Events API endpoint.
///
/// This endpoint:
/// 1. Verifies the request signature (if a signing secret is configured)
/// 2. Decodes the envelope and checks its token
/// 3. Dispatches to the verification or user-change processor
pub async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body.map_err(|e| {
        warn!(error = %e, "slack_event_body_read_failed");
        ApiError::MalformedBody
    })?;

    if let Some(secret) = &state.config.signing_secret {
        if !verify_slack_signature(
            secret,
            header_str(&headers, TIMESTAMP_HEADER),
            &body,
            header_str(&headers, SIGNATURE_HEADER),
            state.config.signature_max_age,
        ) {
            return Err(ApiError::InvalidSignature);
        }
    }

    let envelope: EventEnvelope = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "slack_event_decode_failed");
        ApiError::MalformedBody
    })?;

    if envelope.token != state.config.verification_token {
        warn!(token = %envelope.token, "slack_event_invalid_token");
        return Err(ApiError::InvalidToken);
    }

    info!(
        envelope_type = %envelope.kind,
        event_type = %envelope.event_type(),
        "slack_event_received"
    );

    match envelope.route() {
        EventRoute::UrlVerification => {
            let challenge = state.processor.url_verification(&body).await?;
            Ok((StatusCode::OK, challenge).into_response())
        }
        EventRoute::UserChange => {
            state.processor.user_change(&body).await?;
            Ok(StatusCode::OK.into_response())
        }
        EventRoute::Unsupported(event_type) => {
            warn!(event_type = %event_type, "slack_event_unsupported");
            Err(ApiError::UnsupportedEvent)
        }
    }
}

/// First value of `name` in a query string. Repeated keys keep the first.
fn first_query_value(query: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Header value as text, empty when missing or not valid UTF-8.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
