use crate::{
    domain::ResourceEntity,
    middleware::SimpleValidatedJson,
    routing::{ResourceType, RoutingTable},
};
use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use shared::{
    domain::{requests::TransitionOrderRequest, responses::ApiResponse},
    errors::HttpError,
};
use std::sync::Arc;
use utoipa_axum::router::OpenApiRouter;

#[utoipa::path(
    post,
    path = "/api/orders/{id}/transition",
    tag = "Order",
    params(("id" = i32, Path, description = "Order ID")),
    request_body = TransitionOrderRequest,
    responses(
        (status = 200, description = "Order moved to its next status", body = ApiResponse<ResourceEntity>),
        (status = 400, description = "Unknown event"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed from the current status"),
        (status = 503, description = "Order service or one of its peers unavailable")
    )
)]
pub async fn transition_order(
    Extension(routing): Extension<Arc<RoutingTable>>,
    Path(id): Path<i32>,
    SimpleValidatedJson(body): SimpleValidatedJson<TransitionOrderRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let handle = routing.resolve(ResourceType::Orders)?;

    let response = handle.transition(id, body).await?;
    Ok((StatusCode::OK, Json(response)))
}

pub fn order_routes(routing: Arc<RoutingTable>) -> OpenApiRouter {
    OpenApiRouter::new()
        .route("/api/orders/{id}/transition", post(transition_order))
        .layer(Extension(routing))
}
