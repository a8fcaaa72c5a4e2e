use crate::{
    abstract_trait::{
        DynProductCommandRepository, DynProductQueryRepository, DynStockRepository,
        ProductCommandServiceTrait,
    },
    model::ReserveOutcome,
};
use async_trait::async_trait;
use opentelemetry::KeyValue;
use prometheus_client::registry::Registry;
use shared::{
    domain::{
        requests::{CreateProductRequest, ReserveStockRequest, UpdateProductRequest},
        responses::{ApiResponse, ProductResponse, ReservationResponse},
    },
    errors::ServiceError,
    utils::{Method, OperationTracer, retry_on_conflict},
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct ProductCommandService {
    query: DynProductQueryRepository,
    command: DynProductCommandRepository,
    stock: DynStockRepository,
    tracer: OperationTracer,
}

pub struct ProductCommandServiceDeps {
    pub query: DynProductQueryRepository,
    pub command: DynProductCommandRepository,
    pub stock: DynStockRepository,
}

impl ProductCommandService {
    pub fn new(deps: ProductCommandServiceDeps, registry: &mut Registry) -> Self {
        let ProductCommandServiceDeps {
            query,
            command,
            stock,
        } = deps;

        let tracer = OperationTracer::new("product-command-service");
        tracer.register(registry);

        Self {
            query,
            command,
            stock,
            tracer,
        }
    }
}

#[async_trait]
impl ProductCommandServiceTrait for ProductCommandService {
    async fn create_product(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError> {
        req.validate()?;

        info!("🏗️ Creating product {}", req.name);

        let tracing_ctx = self.tracer.start_tracing(
            "create_product",
            vec![
                KeyValue::new("component", "product"),
                KeyValue::new("operation", "create"),
            ],
        );

        let result = self
            .command
            .create_product(req)
            .await
            .map_err(ServiceError::from);
        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Product created");

        Ok(ApiResponse::success(
            "Product created successfully",
            ProductResponse::from(result?),
        ))
    }

    async fn update_product(
        &self,
        req: &UpdateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError> {
        req.validate()?;

        let product_id = req
            .product_id
            .ok_or_else(|| ServiceError::validation("product_id: is required"))?;

        let tracing_ctx = self.tracer.start_tracing(
            "update_product",
            vec![
                KeyValue::new("component", "product"),
                KeyValue::new("operation", "update"),
                KeyValue::new("product.id", product_id.to_string()),
            ],
        );

        let query = &self.query;
        let command = &self.command;

        let result = retry_on_conflict("update_product", |_| async move {
            let current = query
                .find_by_id(product_id)
                .await?
                .ok_or_else(ServiceError::not_found)?;

            command
                .update_product(product_id, current.version, req)
                .await
                .map_err(ServiceError::from)
        })
        .await;

        self.tracer
            .complete(&tracing_ctx, Method::Put, &result, "Product updated");

        Ok(ApiResponse::success(
            "Product updated successfully",
            ProductResponse::from(result?),
        ))
    }

    async fn delete_product(&self, id: i32) -> Result<ApiResponse<()>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "delete_product",
            vec![
                KeyValue::new("component", "product"),
                KeyValue::new("operation", "delete"),
                KeyValue::new("product.id", id.to_string()),
            ],
        );

        let result = self
            .command
            .delete_product(id)
            .await
            .map_err(ServiceError::from);
        self.tracer
            .complete(&tracing_ctx, Method::Delete, &result, "Product deleted");
        result?;

        Ok(ApiResponse::success("Product deleted successfully", ()))
    }

    async fn reserve_stock(
        &self,
        req: &ReserveStockRequest,
    ) -> Result<ApiResponse<ReservationResponse>, ServiceError> {
        req.validate()?;

        let tracing_ctx = self.tracer.start_tracing(
            "reserve_stock",
            vec![
                KeyValue::new("component", "product"),
                KeyValue::new("operation", "reserve_stock"),
                KeyValue::new("reservation.id", req.reservation_id.to_string()),
            ],
        );

        let result = match self.stock.reserve_stock(req).await {
            Ok(ReserveOutcome::Reserved(reservation)) => {
                Ok(("Stock reserved successfully", reservation))
            }
            Ok(ReserveOutcome::AlreadyReserved(reservation)) if reservation.released => {
                Err(ServiceError::InvalidTransition(format!(
                    "reservation {} was already released",
                    req.reservation_id
                )))
            }
            Ok(ReserveOutcome::AlreadyReserved(reservation)) => {
                Ok(("Stock already reserved", reservation))
            }
            Ok(ReserveOutcome::Insufficient {
                product_id,
                requested,
                available,
            }) => Err(ServiceError::validation(format!(
                "lines: insufficient stock for product {product_id}: requested={requested}, available={available}"
            ))),
            Ok(ReserveOutcome::UnknownProduct(product_id)) => Err(ServiceError::validation(
                format!("lines: product {product_id} does not exist"),
            )),
            Err(e) => Err(ServiceError::from(e)),
        };

        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Stock reserved");

        let (message, reservation) = result?;
        Ok(ApiResponse::success(
            message,
            ReservationResponse::from(reservation),
        ))
    }

    async fn release_stock(&self, reservation_id: Uuid) -> Result<ApiResponse<()>, ServiceError> {
        let tracing_ctx = self.tracer.start_tracing(
            "release_stock",
            vec![
                KeyValue::new("component", "product"),
                KeyValue::new("operation", "release_stock"),
                KeyValue::new("reservation.id", reservation_id.to_string()),
            ],
        );

        let result = self
            .stock
            .release_stock(reservation_id)
            .await
            .map_err(ServiceError::from);
        self.tracer
            .complete(&tracing_ctx, Method::Post, &result, "Stock released");

        let message = if result? {
            "Stock released successfully"
        } else {
            warn!("Nothing to release for reservation {reservation_id}");
            "Nothing to release"
        };

        Ok(ApiResponse::success(message, ()))
    }
}
