use crate::abstract_trait::DynOrderQueryService;
use genproto::{
    common::{FindAllRequest as FindAllRequestProto, FindByIdRequest},
    order::{
        ApiResponsePaginationOrder, ApiResponseOrder, OrderResponse,
        order_query_service_server::OrderQueryService,
    },
};
use shared::{domain::requests::FindAllRequest, errors::AppErrorGrpc};
use std::fmt;
use tonic::{Request, Response, Status};
use tracing::info;

#[derive(Clone)]
pub struct OrderQueryGrpcServiceImpl {
    pub order_query_service: DynOrderQueryService,
}

impl fmt::Debug for OrderQueryGrpcServiceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderQueryGrpcServiceImpl")
            .field("order_query_service", &"DynOrderQueryService")
            .finish()
    }
}

impl OrderQueryGrpcServiceImpl {
    pub fn new(order: DynOrderQueryService) -> Self {
        Self {
            order_query_service: order,
        }
    }
}

#[tonic::async_trait]
impl OrderQueryService for OrderQueryGrpcServiceImpl {
    async fn find_all(
        &self,
        request: Request<FindAllRequestProto>,
    ) -> Result<Response<ApiResponsePaginationOrder>, Status> {
        info!("Handling gRPC request: FindAll Orders");

        let domain_req = FindAllRequest::from(request.into_inner());

        let api_response = self
            .order_query_service
            .find_all(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        let data: Vec<OrderResponse> = api_response.data.into_iter().map(Into::into).collect();

        let reply = ApiResponsePaginationOrder {
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
    ) -> Result<Response<ApiResponseOrder>, Status> {
        let req = request.into_inner();
        info!("Handling gRPC request: Find Order by ID {}", req.id);

        let api_response = self
            .order_query_service
            .find_by_id(req.id)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseOrder {
            status: api_response.status,
            message: api_response.message,
            data: Some(api_response.data.into()),
        }))
    }
}
