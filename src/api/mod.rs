mod auth_routes;
mod connections;
mod notifications;
mod posts;
mod users;

use crate::accounts::{AccountService, UserView};
use crate::auth::{self, SessionTokens};
use crate::config::RefugeConfig;
use crate::database::Database;
use crate::error::ServiceError;
use anyhow::Result;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: RefugeConfig,
    pub database: Database,
    pub tokens: SessionTokens,
}

pub(crate) type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn into_response_parts(self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse { message: msg }),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorResponse { message: msg })
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse { message: msg }),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse { message: msg }),
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        message: "internal server error".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_response_parts();
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => ApiError::BadRequest(msg),
            // Conflicts answer 400 to keep the wire contract the web client
            // already expects.
            ServiceError::Conflict(msg) => ApiError::BadRequest(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::Forbidden(msg) => ApiError::Forbidden(msg),
            ServiceError::Internal(err) => ApiError::Internal(err),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

/// The caller resolved from the session cookie. Handlers that take this
/// extractor reject unauthenticated requests with 401 before running.
pub struct AuthedUser(pub UserView);

#[async_trait]
impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let cookies = parts
            .headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(unauthorized)?;
        let token = auth::token_from_cookie_header(cookies).ok_or_else(unauthorized)?;
        let user_id = state.tokens.verify(token).ok_or_else(unauthorized)?;

        // A valid token for a since-deleted account is still a dead session.
        let user = AccountService::new(state.database.clone())
            .get(&user_id)
            .map_err(|_| unauthorized())?;
        Ok(AuthedUser(user))
    }
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("authentication required".into())
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    version: &'static str,
    api_port: u16,
}

pub(crate) async fn health_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        api_port: state.config.api_port,
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/signup", post(auth_routes::signup))
        .route("/auth/login", post(auth_routes::login))
        .route("/auth/logout", post(auth_routes::logout))
        .route("/auth/me", get(auth_routes::me))
        .route("/connections", get(connections::list_connections))
        .route("/connections/request/:user_id", post(connections::send_request))
        .route("/connections/accept/:request_id", put(connections::accept_request))
        .route("/connections/reject/:request_id", put(connections::reject_request))
        .route("/connections/requests", get(connections::list_incoming))
        .route("/connections/status/:user_id", get(connections::status))
        .route("/connections/:user_id", delete(connections::remove_connection))
        .route("/posts", get(posts::feed))
        .route("/posts/create", post(posts::create_post))
        .route("/posts/delete/:id", delete(posts::delete_post))
        .route("/posts/:id", get(posts::get_post))
        .route("/posts/:id/comment", post(posts::create_comment))
        .route("/posts/:id/comments", get(posts::list_comments))
        .route("/posts/:id/upvote", post(posts::upvote))
        .route("/posts/:id/downvote", post(posts::downvote))
        .route("/notifications", get(notifications::list))
        .route("/notifications/:id/seen", put(notifications::mark_seen))
        .route("/notifications/:id", delete(notifications::delete))
        .route("/users/suggestions", get(users::suggestions))
        .route("/users/profile", put(users::update_profile))
        .route("/users/:username", get(users::public_profile))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port + offset;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "Port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "Could not find available port in range {}-{}",
        start_port,
        start_port + MAX_PORT_ATTEMPTS - 1
    )
}

pub async fn serve_http(config: RefugeConfig, database: Database) -> Result<()> {
    let tokens = SessionTokens::new(&config.session);
    let state = AppState {
        config: config.clone(),
        database,
        tokens,
    };

    let router = router(state);

    let (listener, actual_port) = find_available_port(config.api_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != config.api_port {
        tracing::warn!(
            requested_port = config.api_port,
            actual_port = actual_port,
            "Configured port was in use, bound to next available port"
        );
    }

    tracing::info!(?addr, "HTTP server listening");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
