use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, warn};

use weave_db::models::FeedMutation;
use weave_types::api::{ApiResponse, Claims, Empty, FeedContentRequest, FeedPage, FeedQuery, UpdatedFeed};
use weave_types::models::{FeedPost, PushPayload};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};

const MAX_CONTENT_CHARS: usize = 280;
const DEFAULT_PAGE: u32 = 10;
const MAX_PAGE: u32 = 50;

/// Posts by the caller and their connections, newest first. Pass the
/// returned `cursor` back to fetch the next (older) page.
pub async fn list_feeds(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> ApiResult<Json<ApiResponse<FeedPage>>> {
    let user_id = claims.sub;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let before = query.cursor;

    let feeds = state
        .hub
        .db(move |db| db.list_feeds(user_id, before, limit))
        .await?;
    let cursor = feeds.last().map(|f| f.id);

    Ok(Json(ApiResponse::ok(
        "Feeds fetched successfully",
        FeedPage { feeds, cursor },
    )))
}

pub async fn get_feed(
    State(state): State<AppState>,
    ApiPath(feed_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<FeedPost>>> {
    let viewer = claims.sub;
    let post = state
        .hub
        .db(move |db| {
            let Some(post) = db.get_feed(feed_id)? else {
                return Ok(Err(ApiError::not_found("Feed not found")));
            };
            if post.author.id != viewer && !db.are_connected(viewer, post.author.id)? {
                return Ok(Err(ApiError::forbidden(
                    "You can only view posts from your connections",
                )));
            }
            Ok(Ok(post))
        })
        .await??;

    Ok(Json(ApiResponse::ok("Feed fetched successfully", post)))
}

pub async fn create_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<FeedContentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = validate_content(&req.content)?;
    let user_id = claims.sub;

    let post = state
        .hub
        .db(move |db| db.create_feed(user_id, &content))
        .await?;
    debug!("User {} posted feed {}", user_id, post.id);

    notify_connections(&state, &post).await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Feed created successfully", post)),
    ))
}

/// Push "New Feed Posted" to every connection of the author. Never fails
/// the request; problems are logged.
async fn notify_connections(state: &AppState, post: &FeedPost) {
    let author_id = post.author.id;
    let connections = match state.hub.db(move |db| db.connected_ids(author_id)).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Feed {} notification lookup failed: {}", post.id, e);
            return;
        }
    };
    if connections.is_empty() {
        return;
    }

    let payload = PushPayload::new(
        "New Feed Posted",
        format!("New post by user {}!", post.author.full_name),
    )
    .with_url(format!("/feed/{}", post.id));

    match state.hub.notify(connections, &payload).await {
        Ok(reports) => {
            let failed = reports.iter().filter(|r| !r.success).count();
            debug!(
                "Feed {} notified {} subscriptions ({} failed)",
                post.id,
                reports.len(),
                failed
            );
        }
        Err(e) => warn!("Feed {} notification failed: {}", post.id, e),
    }
}

pub async fn update_feed(
    State(state): State<AppState>,
    ApiPath(feed_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<FeedContentRequest>,
) -> ApiResult<Json<ApiResponse<UpdatedFeed>>> {
    let content = validate_content(&req.content)?;
    let user_id = claims.sub;

    let outcome = state
        .hub
        .db(move |db| db.update_feed(feed_id, user_id, &content))
        .await?;

    match outcome {
        FeedMutation::Done(updated) => Ok(Json(ApiResponse::ok("Feed updated successfully", updated))),
        FeedMutation::NotFound => Err(ApiError::not_found("Feed not found")),
        FeedMutation::NotOwner => Err(ApiError::forbidden("You can only edit your own posts")),
    }
}

pub async fn delete_feed(
    State(state): State<AppState>,
    ApiPath(feed_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<Empty>>> {
    let user_id = claims.sub;
    let outcome = state
        .hub
        .db(move |db| db.delete_feed(feed_id, user_id))
        .await?;

    match outcome {
        FeedMutation::Done(()) => Ok(Json(ApiResponse::ok("Feed deleted successfully", Empty {}))),
        FeedMutation::NotFound => Err(ApiError::not_found("Feed not found")),
        FeedMutation::NotOwner => Err(ApiError::forbidden("You can only delete your own posts")),
    }
}

/// Trimmed content, 1..=280 characters.
fn validate_content(raw: &str) -> ApiResult<String> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(ApiError::bad_request("Content cannot be empty"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::bad_request(format!(
            "Content cannot exceed {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(content.to_string())
}
