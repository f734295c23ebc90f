use super::{ApiResult, AppState, AuthedUser};
use crate::notifications::{NotificationService, NotificationView};
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    message: &'static str,
}

pub(crate) async fn list(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
) -> ApiResult<Vec<NotificationView>> {
    let service = NotificationService::new(state.database.clone());
    Ok(Json(service.list(&user.id)?))
}

pub(crate) async fn mark_seen(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    let service = NotificationService::new(state.database.clone());
    service.mark_seen(&id, &user.id)?;
    Ok(Json(MessageResponse {
        message: "notification marked as seen",
    }))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    let service = NotificationService::new(state.database.clone());
    service.delete(&id, &user.id)?;
    Ok(Json(MessageResponse {
        message: "notification deleted",
    }))
}
