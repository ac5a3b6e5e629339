use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use weave_db::Database;
use weave_db::models::RequestOutcome;
use weave_types::api::{
    ApiResponse, Claims, DegreeResponse, Empty, RespondRequest, UserListEntry, UserListQuery,
};
use weave_types::models::{ConnectionRequest, Degree, PendingRequest, UserSummary};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::Viewer;

const DEFAULT_RECOMMENDATIONS: u32 = 5;

/// Search by name, or recommend `take` users when `take` is given.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<UserListEntry>>>> {
    let users = state
        .hub
        .db(move |db| {
            let users = match query.take {
                Some(take) => recommend(db, viewer, query.target_id, take)?,
                None => db.search_users(query.search.as_deref().unwrap_or_default())?,
            };
            annotate(db, users, viewer)
        })
        .await?;

    Ok(Json(ApiResponse::ok("Users fetched successfully", users)))
}

pub async fn recommendations(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<UserListEntry>>>> {
    let take = query.take.unwrap_or(DEFAULT_RECOMMENDATIONS);
    let users = state
        .hub
        .db(move |db| {
            let users = recommend(db, viewer, query.target_id, take)?;
            annotate(db, users, viewer)
        })
        .await?;

    Ok(Json(ApiResponse::ok("Recommendations fetched successfully", users)))
}

fn recommend(
    db: &Database,
    viewer: Option<i64>,
    target: Option<i64>,
    take: u32,
) -> anyhow::Result<Vec<UserSummary>> {
    let exclude: Vec<i64> = viewer.into_iter().chain(target).collect();
    db.users_excluding(&exclude, take)
}

/// Tag each user with its degree relative to `viewer`. Anonymous callers
/// only get `is_connected: false`.
fn annotate(
    db: &Database,
    users: Vec<UserSummary>,
    viewer: Option<i64>,
) -> anyhow::Result<Vec<UserListEntry>> {
    let Some(viewer) = viewer else {
        return Ok(users
            .into_iter()
            .map(|user| UserListEntry {
                user,
                is_connected: false,
                is_second_degree: None,
                is_third_degree: None,
                is_owner: None,
            })
            .collect());
    };

    let network = db.network(viewer)?;
    Ok(users
        .into_iter()
        .map(|user| {
            let degree = network.degree_of(user.id);
            let is_owner = user.id == viewer;
            UserListEntry {
                user,
                is_connected: degree == Degree::First,
                is_second_degree: Some(degree == Degree::Second),
                is_third_degree: Some(degree == Degree::Third),
                is_owner: Some(is_owner),
            }
        })
        .collect())
}

pub async fn send_request(
    State(state): State<AppState>,
    ApiPath(to_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let from_id = claims.sub;
    let outcome = state
        .hub
        .db(move |db| db.create_connection_request(from_id, to_id))
        .await?;

    let request: ConnectionRequest = match outcome {
        RequestOutcome::Created(request) => request,
        RequestOutcome::SelfRequest => {
            return Err(ApiError::bad_request("Cannot send a connection request to yourself"));
        }
        RequestOutcome::UserMissing => return Err(ApiError::not_found("User not found")),
        RequestOutcome::AlreadyRequested => {
            return Err(ApiError::conflict("Connection request already sent"));
        }
        RequestOutcome::AlreadyConnected => {
            return Err(ApiError::conflict("Connection already exists"));
        }
    };

    info!("User {} sent a connection request to {}", from_id, to_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Connection request sent", request)),
    ))
}

pub async fn pending_requests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<Vec<PendingRequest>>>> {
    let user_id = claims.sub;
    let requests = state
        .hub
        .db(move |db| db.pending_requests(user_id))
        .await?;

    Ok(Json(ApiResponse::ok("Connection requests fetched successfully", requests)))
}

/// Accept or reject the pending request `from_id -> caller`.
pub async fn respond(
    State(state): State<AppState>,
    ApiPath(from_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<RespondRequest>,
) -> ApiResult<Json<ApiResponse<Empty>>> {
    let accept = match req.action.as_str() {
        "accept" => true,
        "reject" => false,
        _ => return Err(ApiError::bad_request("Action must be 'accept' or 'reject'")),
    };

    let to_id = claims.sub;
    let found = state
        .hub
        .db(move |db| db.respond_to_request(from_id, to_id, accept))
        .await?;
    if !found {
        return Err(ApiError::not_found("Connection request not found"));
    }

    let message = if accept {
        "Connection request accepted"
    } else {
        "Connection request rejected"
    };
    Ok(Json(ApiResponse::ok(message, Empty {})))
}

pub async fn connections(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    Extension(Viewer(viewer)): Extension<Viewer>,
) -> ApiResult<Json<ApiResponse<Vec<UserListEntry>>>> {
    let users = state
        .hub
        .db(move |db| {
            if db.get_user_by_id(user_id)?.is_none() {
                return Ok(None);
            }
            let users = db.connections_of(user_id)?;
            annotate(db, users, viewer).map(Some)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ApiResponse::ok("Connections fetched successfully", users)))
}

/// Drops the connection and every chat message between the two users.
pub async fn remove_connection(
    State(state): State<AppState>,
    ApiPath(target_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApiResponse<Empty>>> {
    let user_id = claims.sub;
    let removed = state
        .hub
        .db(move |db| db.remove_connection(user_id, target_id))
        .await?;
    if !removed {
        return Err(ApiError::not_found("Connection not found"));
    }

    info!("User {} removed connection with {}", user_id, target_id);
    Ok(Json(ApiResponse::ok("Connection removed", Empty {})))
}

pub async fn degree(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    Extension(Viewer(viewer)): Extension<Viewer>,
) -> ApiResult<Json<ApiResponse<DegreeResponse>>> {
    let degree = state
        .hub
        .db(move |db| db.degree(user_id, viewer))
        .await?;

    Ok(Json(ApiResponse::ok(
        "Connection degree fetched successfully",
        DegreeResponse { degree },
    )))
}
