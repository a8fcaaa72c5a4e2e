use crate::abstract_trait::DynOrderCommandService;
use genproto::{
    common::{ApiResponseDelete, FindByIdRequest},
    order::{
        ApiResponseOrder, CreateOrderRequest as CreateOrderRequestProto,
        TransitionOrderRequest as TransitionOrderRequestProto,
        UpdateOrderRequest as UpdateOrderRequestProto,
        order_command_service_server::OrderCommandService,
    },
};
use shared::{
    domain::{
        requests::{CreateOrderRequest, TransitionOrderRequest, UpdateOrderRequest},
        responses::{ApiResponse, OrderResponse},
    },
    errors::AppErrorGrpc,
};
use std::fmt;
use tonic::{Request, Response, Status};
use tracing::info;

#[derive(Clone)]
pub struct OrderCommandGrpcServiceImpl {
    pub order_command_service: DynOrderCommandService,
}

impl fmt::Debug for OrderCommandGrpcServiceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderCommandGrpcServiceImpl")
            .field("order_command_service", &"DynOrderCommandService")
            .finish()
    }
}

impl OrderCommandGrpcServiceImpl {
    pub fn new(order_command_service: DynOrderCommandService) -> Self {
        Self {
            order_command_service,
        }
    }
}

fn order_reply(api_response: ApiResponse<OrderResponse>) -> Response<ApiResponseOrder> {
    Response::new(ApiResponseOrder {
        status: api_response.status,
        message: api_response.message,
        data: Some(api_response.data.into()),
    })
}

#[tonic::async_trait]
impl OrderCommandService for OrderCommandGrpcServiceImpl {
    async fn create(
        &self,
        request: Request<CreateOrderRequestProto>,
    ) -> Result<Response<ApiResponseOrder>, Status> {
        info!("Handling gRPC request: Create Order");

        let domain_req = CreateOrderRequest::from(request.into_inner());

        let api_response = self
            .order_command_service
            .create_order(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(order_reply(api_response))
    }

    async fn update(
        &self,
        request: Request<UpdateOrderRequestProto>,
    ) -> Result<Response<ApiResponseOrder>, Status> {
        let domain_req = UpdateOrderRequest::from(request.into_inner());
        info!("Handling gRPC request: Update Order {:?}", domain_req.order_id);

        let api_response = self
            .order_command_service
            .update_order(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(order_reply(api_response))
    }

    async fn delete(
        &self,
        request: Request<FindByIdRequest>,
    ) -> Result<Response<ApiResponseDelete>, Status> {
        let req = request.into_inner();
        info!("Handling gRPC request: Delete Order {}", req.id);

        let api_response = self
            .order_command_service
            .delete_order(req.id)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseDelete {
            status: api_response.status,
            message: api_response.message,
        }))
    }

    async fn transition(
        &self,
        request: Request<TransitionOrderRequestProto>,
    ) -> Result<Response<ApiResponseOrder>, Status> {
        let domain_req = TransitionOrderRequest::from(request.into_inner());
        info!(
            "Handling gRPC request: Transition Order {:?} with {}",
            domain_req.order_id, domain_req.event
        );

        let api_response = self
            .order_command_service
            .transition(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(order_reply(api_response))
    }
}
