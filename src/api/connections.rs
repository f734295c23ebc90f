use super::{ApiResult, AppState, AuthedUser};
use crate::accounts::UserSummary;
use crate::connections::{ConnectionService, ConnectionStatus, RequestView};
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    message: &'static str,
}

pub(crate) async fn send_request(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(user_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let service = ConnectionService::new(state.database.clone());
    service.send_request(&user.id, &user_id)?;
    Ok(Json(MessageResponse {
        message: "connection request sent",
    }))
}

pub(crate) async fn accept_request(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(request_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let service = ConnectionService::new(state.database.clone());
    service.accept_request(&request_id, &user.id)?;
    Ok(Json(MessageResponse {
        message: "connection request accepted",
    }))
}

pub(crate) async fn reject_request(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(request_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let service = ConnectionService::new(state.database.clone());
    service.reject_request(&request_id, &user.id)?;
    Ok(Json(MessageResponse {
        message: "connection request rejected",
    }))
}

pub(crate) async fn remove_connection(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(user_id): Path<String>,
) -> ApiResult<MessageResponse> {
    let service = ConnectionService::new(state.database.clone());
    service.remove_connection(&user.id, &user_id)?;
    Ok(Json(MessageResponse {
        message: "connection removed",
    }))
}

pub(crate) async fn status(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(user_id): Path<String>,
) -> ApiResult<ConnectionStatus> {
    let service = ConnectionService::new(state.database.clone());
    Ok(Json(service.status(&user.id, &user_id)?))
}

pub(crate) async fn list_incoming(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
) -> ApiResult<Vec<RequestView>> {
    let service = ConnectionService::new(state.database.clone());
    Ok(Json(service.list_incoming(&user.id)?))
}

pub(crate) async fn list_connections(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
) -> ApiResult<Vec<UserSummary>> {
    let service = ConnectionService::new(state.database.clone());
    Ok(Json(service.list_connections(&user.id)?))
}
