use crate::{
    domain::{
        CreateResourceRequest, DeleteResponse, EntityResponse, ResourceEntity,
        UpdateResourceRequest,
    },
    middleware::JsonBody,
    routing::RoutingTable,
};
use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use shared::{
    domain::{
        requests::FindAllRequest,
        responses::{ApiResponse, ApiResponsePagination},
    },
    errors::{HttpError, ServiceError},
};
use std::sync::Arc;
use utoipa_axum::router::OpenApiRouter;
use validator::Validate;

#[utoipa::path(
    get,
    path = "/api/{resource}",
    tag = "Resource",
    params(
        ("resource" = String, Path, description = "users, products or orders"),
        FindAllRequest
    ),
    responses(
        (status = 200, description = "Page of entities", body = ApiResponsePagination<Vec<ResourceEntity>>),
        (status = 400, description = "Invalid pagination"),
        (status = 404, description = "Unknown resource"),
        (status = 503, description = "Owning service unavailable")
    )
)]
pub async fn list_resources(
    Extension(routing): Extension<Arc<RoutingTable>>,
    Path(resource): Path<String>,
    Query(params): Query<FindAllRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let handle = routing.route(&resource)?;
    params.validate().map_err(ServiceError::from)?;

    let response = handle.find_all(&params).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/{resource}/{id}",
    tag = "Resource",
    params(
        ("resource" = String, Path, description = "users, products or orders"),
        ("id" = i32, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Entity, possibly a stale copy", body = EntityResponse),
        (status = 404, description = "Unknown resource or entity not found"),
        (status = 503, description = "Owning service unavailable and nothing cached"),
        (status = 504, description = "Owning service timed out and nothing cached")
    )
)]
pub async fn get_resource(
    Extension(routing): Extension<Arc<RoutingTable>>,
    Path((resource, id)): Path<(String, i32)>,
) -> Result<impl IntoResponse, HttpError> {
    let handle = routing.route(&resource)?;

    let response = handle.find_by_id(id).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/{resource}",
    tag = "Resource",
    params(("resource" = String, Path, description = "users, products or orders")),
    request_body = CreateResourceRequest,
    responses(
        (status = 201, description = "Entity created", body = ApiResponse<ResourceEntity>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Unknown resource"),
        (status = 503, description = "Owning service unavailable")
    )
)]
pub async fn create_resource(
    Extension(routing): Extension<Arc<RoutingTable>>,
    Path(resource): Path<String>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, HttpError> {
    let handle = routing.route(&resource)?;

    let response = handle.create(body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    put,
    path = "/api/{resource}/{id}",
    tag = "Resource",
    params(
        ("resource" = String, Path, description = "users, products or orders"),
        ("id" = i32, Path, description = "Entity ID")
    ),
    request_body = UpdateResourceRequest,
    responses(
        (status = 200, description = "Entity updated", body = ApiResponse<ResourceEntity>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Unknown resource or entity not found"),
        (status = 409, description = "Conflicting update or state")
    )
)]
pub async fn update_resource(
    Extension(routing): Extension<Arc<RoutingTable>>,
    Path((resource, id)): Path<(String, i32)>,
    JsonBody(body): JsonBody,
) -> Result<impl IntoResponse, HttpError> {
    let handle = routing.route(&resource)?;

    let response = handle.update(id, body).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    delete,
    path = "/api/{resource}/{id}",
    tag = "Resource",
    params(
        ("resource" = String, Path, description = "users, products or orders"),
        ("id" = i32, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Entity deleted", body = DeleteResponse),
        (status = 404, description = "Unknown resource or entity not found"),
        (status = 409, description = "Entity cannot be deleted in its current state")
    )
)]
pub async fn delete_resource(
    Extension(routing): Extension<Arc<RoutingTable>>,
    Path((resource, id)): Path<(String, i32)>,
) -> Result<impl IntoResponse, HttpError> {
    let handle = routing.route(&resource)?;

    let response = handle.delete(id).await?;
    Ok((StatusCode::OK, Json(response)))
}

pub fn resource_routes(routing: Arc<RoutingTable>) -> OpenApiRouter {
    OpenApiRouter::new()
        .route(
            "/api/{resource}",
            get(list_resources).post(create_resource),
        )
        .route(
            "/api/{resource}/{id}",
            get(get_resource)
                .put(update_resource)
                .delete(delete_resource),
        )
        .layer(Extension(routing))
}
