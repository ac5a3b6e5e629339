use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use weave_push::send_to_all;
use weave_types::api::{
    ApiResponse, Claims, DeleteSubscriptionRequest, Empty, SaveSubscriptionRequest,
    SendNotificationRequest, SendNotificationToUsersRequest,
};
use weave_types::models::DeliveryReport;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;

/// Registers the caller's browser endpoint. Re-saving an endpoint moves it
/// to the caller and replaces its keys.
pub async fn save_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SaveSubscriptionRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.endpoint.trim().is_empty() {
        return Err(ApiError::bad_request("Endpoint is required"));
    }
    if !req.keys.is_object() {
        return Err(ApiError::bad_request("Keys must be an object"));
    }

    let user_id = claims.sub;
    let subscription = state
        .hub
        .db(move |db| db.save_subscription(&req.endpoint, user_id, &req.keys))
        .await?;
    info!("User {} subscribed {}", user_id, subscription.endpoint);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Subscription saved successfully", subscription)),
    ))
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<DeleteSubscriptionRequest>,
) -> ApiResult<Json<ApiResponse<Empty>>> {
    let user_id = claims.sub;
    let removed = state
        .hub
        .db(move |db| db.delete_subscription(&req.endpoint, user_id))
        .await?;
    if !removed {
        return Err(ApiError::not_found("Subscription not found"));
    }

    Ok(Json(ApiResponse::ok("Subscription deleted successfully", Empty {})))
}

pub async fn send_notification(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendNotificationRequest>,
) -> ApiResult<Json<ApiResponse<DeliveryReport>>> {
    let endpoint = req.endpoint.clone();
    let subscription = state
        .hub
        .db(move |db| db.subscription_by_endpoint(&endpoint))
        .await?
        .ok_or_else(|| ApiError::not_found("Subscription not found"))?;

    let report = send_to_all(state.hub.push.as_ref(), &[subscription], &req.data)
        .await
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no delivery report for {}", req.endpoint))?;

    let message = if report.success {
        "Notification sent successfully"
    } else {
        "Notification delivery failed"
    };
    Ok(Json(ApiResponse::ok(message, report)))
}

/// Fan-out to every subscription of every listed user. Each subscription
/// gets its own report; one failure does not stop the rest.
pub async fn send_notification_to_users(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendNotificationToUsersRequest>,
) -> ApiResult<Json<ApiResponse<Vec<DeliveryReport>>>> {
    if req.user_ids.is_empty() {
        return Err(ApiError::bad_request("user_ids cannot be empty"));
    }

    let reports = state.hub.notify(req.user_ids, &req.data).await?;
    Ok(Json(ApiResponse::ok("Notifications processed", reports)))
}
