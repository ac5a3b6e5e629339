use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use weave_gateway::MessageError;
use weave_types::api::{ApiResponse, Claims, RecentChat, SendChatRequest};
use weave_types::models::ChatMessage;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};

/// Same path as the gateway's `SendMessage`: stored, emitted to the
/// recipient's room and pushed.
pub async fn send_chat(
    State(state): State<AppState>,
    ApiPath(to_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let chat = state
        .hub
        .send_direct_message(claims.sub, to_id, req.message)
        .await
        .map_err(|e| match e {
            MessageError::Empty => ApiError::bad_request(e.to_string()),
            MessageError::NotConnected => ApiError::forbidden(e.to_string()),
            MessageError::Internal(e) => ApiError::Internal(e),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Message sent successfully", chat)),
    ))
}

pub async fn history(
    State(state): State<AppState>,
    ApiPath(other_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<Vec<ChatMessage>>>> {
    let user_id = claims.sub;
    let chats = state
        .hub
        .db(move |db| {
            if !db.are_connected(user_id, other_id)? {
                return Ok(None);
            }
            db.chat_history(user_id, other_id).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::forbidden("You can only view chats with your connections"))?;

    Ok(Json(ApiResponse::ok("Chats fetched successfully", chats)))
}

pub async fn recent_chats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<Vec<RecentChat>>>> {
    let user_id = claims.sub;
    let recents = state
        .hub
        .db(move |db| db.recent_chats(user_id))
        .await?
        .into_iter()
        .map(|(partner, last_message)| RecentChat {
            user_id: partner,
            last_message,
        })
        .collect();

    Ok(Json(ApiResponse::ok("Recent chats fetched successfully", recents)))
}
