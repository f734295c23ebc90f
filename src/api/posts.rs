use super::{ApiResult, AppState, AuthedUser};
use crate::database::models::VoteKind;
use crate::posting::{CreatePostInput, PostDetails, PostService, PostView};
use crate::votes::{VoteOutcome, VoteService};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct FeedParams {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    message: &'static str,
}

pub(crate) async fn feed(
    State(state): State<AppState>,
    AuthedUser(_user): AuthedUser,
    Query(params): Query<FeedParams>,
) -> ApiResult<Vec<PostView>> {
    let service = PostService::new(state.database.clone());
    Ok(Json(service.feed(params.limit)?))
}

pub(crate) async fn get_post(
    State(state): State<AppState>,
    AuthedUser(_user): AuthedUser,
    Path(id): Path<String>,
) -> ApiResult<PostDetails> {
    let service = PostService::new(state.database.clone());
    Ok(Json(service.get_post(&id)?))
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Json(mut payload): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<PostView>), super::ApiError> {
    let service = PostService::new(state.database.clone());
    payload.author_id = user.id;
    let post = service.create_post(payload)?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub(crate) async fn create_comment(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(id): Path<String>,
    Json(mut payload): Json<CreatePostInput>,
) -> ApiResult<PostView> {
    let service = PostService::new(state.database.clone());
    payload.author_id = user.id;
    Ok(Json(service.create_comment(&id, payload)?))
}

pub(crate) async fn list_comments(
    State(state): State<AppState>,
    AuthedUser(_user): AuthedUser,
    Path(id): Path<String>,
) -> ApiResult<Vec<PostView>> {
    let service = PostService::new(state.database.clone());
    Ok(Json(service.list_comments(&id)?))
}

pub(crate) async fn delete_post(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    let service = PostService::new(state.database.clone());
    service.delete_post(&id, &user.id)?;
    Ok(Json(MessageResponse {
        message: "post deleted",
    }))
}

pub(crate) async fn upvote(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(id): Path<String>,
) -> ApiResult<VoteOutcome> {
    let service = VoteService::new(state.database.clone());
    Ok(Json(service.toggle(&id, &user.id, VoteKind::Up)?))
}

pub(crate) async fn downvote(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Path(id): Path<String>,
) -> ApiResult<VoteOutcome> {
    let service = VoteService::new(state.database.clone());
    Ok(Json(service.toggle(&id, &user.id, VoteKind::Down)?))
}
