use axum::Json;

use weave_types::api::{ApiResponse, Empty};

pub async fn health() -> Json<ApiResponse<Empty>> {
    Json(ApiResponse::ok("Health check success", Empty {}))
}
