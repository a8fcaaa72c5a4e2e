use crate::abstract_trait::DynUserCommandService;
use genproto::{
    common::{ApiResponseDelete, FindByIdRequest},
    user::{
        ApiResponseUser, CreateUserRequest as CreateUserRequestProto,
        UpdateUserRequest as UpdateUserRequestProto,
        user_command_service_server::UserCommandService,
    },
};
use shared::{
    domain::requests::{CreateUserRequest, UpdateUserRequest},
    errors::AppErrorGrpc,
};
use std::fmt;
use tonic::{Request, Response, Status};
use tracing::info;

#[derive(Clone)]
pub struct UserCommandGrpcServiceImpl {
    pub user_command_service: DynUserCommandService,
}

impl fmt::Debug for UserCommandGrpcServiceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCommandGrpcServiceImpl")
            .field("user_command_service", &"DynUserCommandService")
            .finish()
    }
}

impl UserCommandGrpcServiceImpl {
    pub fn new(user_command_service: DynUserCommandService) -> Self {
        Self {
            user_command_service,
        }
    }
}

#[tonic::async_trait]
impl UserCommandService for UserCommandGrpcServiceImpl {
    async fn create(
        &self,
        request: Request<CreateUserRequestProto>,
    ) -> Result<Response<ApiResponseUser>, Status> {
        info!("Handling gRPC request: Create User");

        let domain_req = CreateUserRequest::from(request.into_inner());

        let api_response = self
            .user_command_service
            .create_user(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseUser {
            status: api_response.status,
            message: api_response.message,
            data: Some(api_response.data.into()),
        }))
    }

    async fn update(
        &self,
        request: Request<UpdateUserRequestProto>,
    ) -> Result<Response<ApiResponseUser>, Status> {
        let domain_req = UpdateUserRequest::from(request.into_inner());
        info!("Handling gRPC request: Update User {:?}", domain_req.user_id);

        let api_response = self
            .user_command_service
            .update_user(&domain_req)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseUser {
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
        info!("Handling gRPC request: Delete User {}", req.id);

        let api_response = self
            .user_command_service
            .delete_user(req.id)
            .await
            .map_err(AppErrorGrpc::from)?;

        Ok(Response::new(ApiResponseDelete {
            status: api_response.status,
            message: api_response.message,
        }))
    }
}
