use super::{ApiError, AppState, AuthedUser};
use crate::accounts::{AccountService, SignupInput, UserView};
use crate::auth;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    username: String,
    password: String,
}

fn session_headers(state: &AppState, user_id: &str) -> Result<HeaderMap, ApiError> {
    let token = state.tokens.issue(user_id)?;
    let cookie = auth::session_cookie(&token, state.tokens.ttl_secs());
    let value = HeaderValue::from_str(&cookie)
        .map_err(|err| ApiError::Internal(anyhow::Error::new(err)))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

pub(crate) async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupInput>,
) -> Result<(StatusCode, HeaderMap, Json<UserView>), ApiError> {
    let service = AccountService::new(state.database.clone());
    let user = service.signup(payload)?;
    let headers = session_headers(&state, &user.id)?;
    Ok((StatusCode::CREATED, headers, Json(user)))
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<UserView>), ApiError> {
    let service = AccountService::new(state.database.clone());
    let user = service.verify_credentials(&payload.username, &payload.password)?;
    let headers = session_headers(&state, &user.id)?;
    tracing::info!(username = %user.username, "session opened");
    Ok((headers, Json(user)))
}

pub(crate) async fn logout() -> Result<(HeaderMap, Json<serde_json::Value>), ApiError> {
    let value = HeaderValue::from_str(&auth::clear_session_cookie())
        .map_err(|err| ApiError::Internal(anyhow::Error::new(err)))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok((headers, Json(serde_json::json!({ "message": "logged out" }))))
}

pub(crate) async fn me(AuthedUser(user): AuthedUser) -> Json<UserView> {
    Json(user)
}
