//! Credential extraction and the identity endpoints

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use crate::models::Platform;
use crate::server::AppState;
use crate::services::auth::{hash_token, AdminCredential};
use crate::services::HandleRecovery;
use crate::utils::errors::{GatherBuddyError, Result};

/// Cookie carrying the admin session after a magic link login
pub const SESSION_COOKIE: &str = "gb_admin";

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

/// Admin credential from `Authorization: Bearer` or the session cookie
pub fn credential_from_headers(headers: &HeaderMap) -> Option<AdminCredential> {
    bearer(headers)
        .or_else(|| cookie(headers, SESSION_COOKIE))
        .and_then(AdminCredential::from_raw)
}

/// Cron callers present the shared secret as a bearer token
pub fn is_cron_authorized(headers: &HeaderMap, secret: &str) -> bool {
    match bearer(headers) {
        Some(presented) if !secret.is_empty() => hash_token(presented) == hash_token(secret),
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session: String,
}

/// GET /auth/login?token=
pub async fn login(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Result<Response> {
    let session = state.services.identity_service.consume_login(&query.token).await?;
    let max_age = state.services.settings.auth.session_ttl_hours * 3600;
    let cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
        SESSION_COOKIE, session, max_age
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| GatherBuddyError::InvalidInput(format!("session cookie: {}", e)))?;

    let mut response = Json(SessionResponse { session }).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct RecoverRequest {
    pub handle: String,
    pub platform: Platform,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoverStatus {
    LinkSent,
    MessageBotFirst,
}

#[derive(Debug, Serialize)]
pub struct RecoverResponse {
    pub status: RecoverStatus,
}

/// POST /api/events/:slug/recover
pub async fn recover(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<RecoverRequest>,
) -> Result<Json<RecoverResponse>> {
    let outcome = state
        .services
        .identity_service
        .recover_by_handle(&slug, request.platform, &request.handle)
        .await?;

    let status = match outcome {
        HandleRecovery::LinkSent => RecoverStatus::LinkSent,
        HandleRecovery::MessageBotFirst => RecoverStatus::MessageBotFirst,
    };
    Ok(Json(RecoverResponse { status }))
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub link: String,
}

/// POST /api/events/:slug/recovery-token
pub async fn recovery_token(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Json<LinkResponse>> {
    let event = state.services.database.require_event(&slug).await?;
    let credential = credential_from_headers(&headers);
    state
        .services
        .auth_service
        .authorize_manager(&event, credential.as_ref())?;

    let link = state.services.identity_service.issue_short_recovery(&event).await?;
    Ok(Json(LinkResponse { link }))
}
