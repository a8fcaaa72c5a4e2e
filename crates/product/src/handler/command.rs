use crate::abstract_trait::DynProductCommandService;
use genproto::{
    common::{ApiResponseDelete, FindByIdRequest},
    product::{
        ApiResponseProduct, ApiResponseReservation,
        CreateProductRequest as CreateProductRequestProto, ReleaseStockRequest,
        ReserveStockRequest as ReserveStockRequestProto,
        UpdateProductRequest as UpdateProductRequestProto,
        product_command_service_server::ProductCommandService,
    },
};
use shared::{
    domain::requests::{CreateProductRequest, ReserveStockRequest, UpdateProductRequest},
    errors::{AppErrorGrpc, ServiceError},
};
use std::fmt;
use tonic::{Request, Response, Status};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProductCommandGrpcServiceImpl {
    pub product_command_service: DynProductCommandService,
}

impl fmt::Debug for ProductCommandGrpcServiceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductCommandGrpcServiceImpl")
            .field("product_command_service", &"DynProductCommandService")
            .finish()
    }
}

impl ProductCommandGrpcServiceImpl {
    pub fn new(product_command_service: DynProductCommandService) -> Self {
        Self {
            product_command_service,
        }
    }
}

#[tonic::async_trait]
impl ProductCommandService for ProductCommandGrpcServiceImpl {
    async fn create(
        &self,
        request: Request<CreateProductRequestProto>,
    ) -> Result<Response<ApiResponseProduct>, Status> {
        info!("Handling gRPC request: Create Product");

        let domain_req = CreateProductRequest::from(request.into_inner());

        let api_response = self
            .product_command_service
            .create_product(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseProduct {
            status: api_response.status,
            message: api_response.message,
            data: Some(api_response.data.into()),
        }))
    }

    async fn update(
        &self,
        request: Request<UpdateProductRequestProto>,
    ) -> Result<Response<ApiResponseProduct>, Status> {
        let domain_req = UpdateProductRequest::from(request.into_inner());
        info!("Handling gRPC request: Update Product {:?}", domain_req.product_id);

        let api_response = self
            .product_command_service
            .update_product(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseProduct {
            status: api_response.status,
            message: api_response.message,
            data: Some(api_response.data.into()),
        }))
    }

    async fn delete(
        &self,
        request: Request<FindByIdRequest>,
    ) -> Result<Response<ApiResponseDelete>, Status> {
        let req = request.into_inner();
        info!("Handling gRPC request: Delete Product {}", req.id);

        let api_response = self
            .product_command_service
            .delete_product(req.id)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseDelete {
            status: api_response.status,
            message: api_response.message,
        }))
    }

    async fn reserve_stock(
        &self,
        request: Request<ReserveStockRequestProto>,
    ) -> Result<Response<ApiResponseReservation>, Status> {
        let domain_req = ReserveStockRequest::try_from(request.into_inner())
            .map_err(AppErrorGrpc::from)?;
        info!(
            "Handling gRPC request: Reserve stock {}",
            domain_req.reservation_id
        );

        let api_response = self
            .product_command_service
            .reserve_stock(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseReservation {
            status: api_response.status,
            message: api_response.message,
            data: Some(api_response.data.into()),
        }))
    }

    async fn release_stock(
        &self,
        request: Request<ReleaseStockRequest>,
    ) -> Result<Response<ApiResponseDelete>, Status> {
        let req = request.into_inner();
        info!("Handling gRPC request: Release stock {}", req.reservation_id);

        let reservation_id = Uuid::parse_str(&req.reservation_id).map_err(|e| {
            AppErrorGrpc::from(ServiceError::validation(format!("reservation_id: {e}")))
        })?;

        let api_response = self
            .product_command_service
            .release_stock(reservation_id)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseDelete {
            status: api_response.status,
            message: api_response.message,
        }))
    }
}
