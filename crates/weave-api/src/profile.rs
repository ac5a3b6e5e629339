use axum::{
    Extension, Json,
    extract::State,
};

use weave_db::models::{ProfileChanges, ProfileUpdate};
use weave_types::api::{ApiResponse, Claims, ProfileResponse, UpdateProfileRequest, UpdatedProfile};

use crate::auth::{AppState, USERNAME_LENGTH};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::Viewer;

/// Latest posts shown on a profile to its owner and connections.
const RELEVANT_POSTS: u32 = 5;

pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    Extension(Viewer(viewer)): Extension<Viewer>,
) -> ApiResult<Json<ApiResponse<ProfileResponse>>> {
    let profile = state
        .hub
        .db(move |db| {
            let Some(user) = db.get_user_by_id(user_id)? else {
                return Ok(None);
            };

            let mut profile = ProfileResponse {
                id: user.id,
                username: user.username,
                name: user.full_name,
                profile_photo_path: user.profile_photo_path,
                work_history: user.work_history,
                skills: user.skills,
                connection_count: db.connection_count(user_id)?,
                relevant_posts: None,
                is_owner: None,
                is_connected: None,
                connection_status: None,
            };

            match viewer {
                None => {}
                Some(viewer) if viewer == user_id => {
                    profile.relevant_posts = Some(db.recent_post_contents(user_id, RELEVANT_POSTS)?);
                    profile.is_owner = Some(true);
                }
                Some(viewer) if db.are_connected(viewer, user_id)? => {
                    profile.relevant_posts = Some(db.recent_post_contents(user_id, RELEVANT_POSTS)?);
                    profile.is_connected = Some(true);
                }
                Some(viewer) => {
                    profile.is_connected = Some(false);
                    profile.connection_status = Some(db.request_status(viewer, user_id)?);
                }
            }
            Ok(Some(profile))
        })
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok("Profile fetched successfully", profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<ApiResponse<UpdatedProfile>>> {
    if claims.sub != user_id {
        return Err(ApiError::forbidden("You can only update your own profile"));
    }

    let changes = ProfileChanges {
        username: req.username,
        full_name: req.name,
        work_history: req.work_history,
        skills: req.skills,
    };

    let outcome = state
        .hub
        .db(move |db| db.update_profile(user_id, &changes))
        .await?;

    let row = match outcome {
        ProfileUpdate::Updated(row) => row,
        ProfileUpdate::NotFound => return Err(ApiError::not_found("User not found")),
        ProfileUpdate::EmptyUsername => return Err(ApiError::bad_request("Username cannot be empty")),
        ProfileUpdate::UsernameLength => return Err(ApiError::bad_request(USERNAME_LENGTH)),
        ProfileUpdate::EmptyName => return Err(ApiError::bad_request("Name cannot be empty")),
        ProfileUpdate::UsernameTaken => return Err(ApiError::conflict("Username already in use")),
    };

    Ok(Json(ApiResponse::ok(
        "Profile updated successfully",
        UpdatedProfile {
            user_id: row.id,
            username: row.username,
            full_name: row.full_name,
            profile_photo_path: row.profile_photo_path,
            work_history: row.work_history,
            skills: row.skills,
        },
    )))
}

