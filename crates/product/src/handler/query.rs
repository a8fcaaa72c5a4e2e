use crate::abstract_trait::DynProductQueryService;
use genproto::{
    common::{FindAllRequest as FindAllRequestProto, FindByIdRequest},
    product::{
        ApiResponsePaginationProduct, ApiResponseProduct, ProductResponse,
        product_query_service_server::ProductQueryService,
    },
};
use shared::{domain::requests::FindAllRequest, errors::AppErrorGrpc};
use std::fmt;
use tonic::{Request, Response, Status};
use tracing::info;

#[derive(Clone)]
pub struct ProductQueryGrpcServiceImpl {
    pub product_query_service: DynProductQueryService,
}

impl fmt::Debug for ProductQueryGrpcServiceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductQueryGrpcServiceImpl")
            .field("product_query_service", &"DynProductQueryService")
            .finish()
    }
}

impl ProductQueryGrpcServiceImpl {
    pub fn new(product: DynProductQueryService) -> Self {
        Self {
            product_query_service: product,
        }
    }
}

#[tonic::async_trait]
impl ProductQueryService for ProductQueryGrpcServiceImpl {
    async fn find_all(
        &self,
        request: Request<FindAllRequestProto>,
    ) -> Result<Response<ApiResponsePaginationProduct>, Status> {
        info!("Handling gRPC request: FindAll Products");

        let domain_req = FindAllRequest::from(request.into_inner());

        let api_response = self
            .product_query_service
            .find_all(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        let data: Vec<ProductResponse> = api_response.data.into_iter().map(Into::into).collect();

        let reply = ApiResponsePaginationProduct {
            status: api_response.status,
            message: api_response.message,
            data,
            pagination: Some(api_response.pagination.into()),
        };

        Ok(Response::new(reply))
    }

    async fn find_by_id(
        &self,
        request: Request<FindByIdRequest>,
    ) -> Result<Response<ApiResponseProduct>, Status> {
        let req = request.into_inner();
        info!("Handling gRPC request: Find Product by ID {}", req.id);

        let api_response = self
            .product_query_service
            .find_by_id(req.id)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseProduct {
            status: api_response.status,
            message: api_response.message,
            data: Some(api_response.data.into()),
        }))
    }
}
