use super::{ApiResult, AppState, AuthedUser};
use crate::accounts::{AccountService, UserSummary, UserView};
use crate::database::repositories::ProfilePatch;
use crate::posting::{PostService, PostView};
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct ProfileResponse {
    user: UserView,
    posts: Vec<PostView>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateProfileRequest {
    name: Option<String>,
    username: Option<String>,
    bio: Option<String>,
    profile_image_url: Option<String>,
}

pub(crate) async fn suggestions(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
) -> ApiResult<Vec<UserSummary>> {
    let service = AccountService::new(state.database.clone());
    Ok(Json(service.suggestions(&user.id)?))
}

pub(crate) async fn public_profile(
    State(state): State<AppState>,
    AuthedUser(_user): AuthedUser,
    Path(username): Path<String>,
) -> ApiResult<ProfileResponse> {
    let accounts = AccountService::new(state.database.clone());
    let posts = PostService::new(state.database.clone());
    let user = accounts.public_profile(&username)?;
    let posts = posts.list_for_author(&user.id)?;
    Ok(Json(ProfileResponse { user, posts }))
}

pub(crate) async fn update_profile(
    State(state): State<AppState>,
    AuthedUser(user): AuthedUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<UserView> {
    let service = AccountService::new(state.database.clone());
    let patch = ProfilePatch {
        name: payload.name,
        username: payload.username,
        bio: payload.bio,
        profile_image_url: payload.profile_image_url,
    };
    Ok(Json(service.update_profile(&user.id, patch)?))
}
