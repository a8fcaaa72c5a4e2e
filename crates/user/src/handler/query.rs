use crate::abstract_trait::DynUserQueryService;
use genproto::{
    common::{FindAllRequest as FindAllRequestProto, FindByIdRequest},
    user::{
        ApiResponsePaginationUser, ApiResponseUser, UserResponse,
        user_query_service_server::UserQueryService,
    },
};
use shared::{domain::requests::FindAllRequest, errors::AppErrorGrpc};
use std::fmt;
use tonic::{Request, Response, Status};
use tracing::info;

#[derive(Clone)]
pub struct UserQueryGrpcServiceImpl {
    pub user_query_service: DynUserQueryService,
}

impl fmt::Debug for UserQueryGrpcServiceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserQueryGrpcServiceImpl")
            .field("user_query_service", &"DynUserQueryService")
            .finish()
    }
}

impl UserQueryGrpcServiceImpl {
    pub fn new(user: DynUserQueryService) -> Self {
        Self {
            user_query_service: user,
        }
    }
}

#[tonic::async_trait]
impl UserQueryService for UserQueryGrpcServiceImpl {
    async fn find_all(
        &self,
        request: Request<FindAllRequestProto>,
    ) -> Result<Response<ApiResponsePaginationUser>, Status> {
        info!("Handling gRPC request: FindAll Users");

        let domain_req = FindAllRequest::from(request.into_inner());

        let api_response = self
            .user_query_service
            .find_all(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        let data: Vec<UserResponse> = api_response.data.into_iter().map(Into::into).collect();

        let reply = ApiResponsePaginationUser {
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
    ) -> Result<Response<ApiResponseUser>, Status> {
        let req = request.into_inner();
        info!("Handling gRPC request: Find User by ID {}", req.id);

        let api_response = self
            .user_query_service
            .find_by_id(req.id)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseUser {
            status: api_response.status,
            message: api_response.message,
            data: Some(api_response.data.into()),
        }))
    }
}
