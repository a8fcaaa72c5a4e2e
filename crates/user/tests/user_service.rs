use genproto::{common::FindByIdRequest, user::user_query_service_server::UserQueryService};
use prometheus_client::registry::Registry;
use shared::{
    domain::requests::{Address, CreateUserRequest, FindAllRequest, UpdateUserRequest},
    errors::ServiceError,
};
use std::sync::Arc;
use tonic::{Code, Request};
use user::{
    di::DependenciesInject, handler::UserQueryGrpcServiceImpl,
    repository::InMemoryUserRepository,
};

fn container() -> DependenciesInject {
    let repo = Arc::new(InMemoryUserRepository::new());
    let mut registry = Registry::default();
    DependenciesInject::from_repositories(repo.clone(), repo, &mut registry)
}

fn new_user(email: &str) -> CreateUserRequest {
    CreateUserRequest {
        name: "Sari".into(),
        email: email.into(),
        phone: Some("+62-811".into()),
        addresses: vec![Address {
            label: "office".into(),
            line1: "Jl. Asia Afrika 8".into(),
            line2: None,
            city: "Bandung".into(),
            postal_code: "40111".into(),
            country: "ID".into(),
        }],
    }
}

#[tokio::test]
async fn create_get_update_delete() {
    let deps = container();

    let created = deps
        .user_command
        .create_user(&new_user("sari@example.com"))
        .await
        .unwrap()
        .data;
    assert_eq!(created.version, 1);
    assert_eq!(created.addresses.len(), 1);

    let fetched = deps.user_query.find_by_id(created.id).await.unwrap().data;
    assert_eq!(fetched.email, "sari@example.com");

    let updated = deps
        .user_command
        .update_user(&UpdateUserRequest {
            user_id: Some(created.id),
            name: "Sari W".into(),
            email: "sari@example.com".into(),
            phone: None,
            addresses: vec![],
        })
        .await
        .unwrap()
        .data;
    assert_eq!(updated.name, "Sari W");
    assert_eq!(updated.version, 2);

    deps.user_command.delete_user(created.id).await.unwrap();

    let err = deps.user_query.find_by_id(created.id).await.unwrap_err();
    assert!(err.is_not_found());

    let err = deps.user_command.delete_user(created.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn invalid_input_is_rejected_before_the_store() {
    let deps = container();

    let mut bad = new_user("not-an-email");
    bad.name.clear();

    let err = deps.user_command.create_user(&bad).await.unwrap_err();
    let ServiceError::Validation(messages) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(messages.iter().any(|m| m.starts_with("email")));
    assert!(messages.iter().any(|m| m.starts_with("name")));

    let page = deps
        .user_query
        .find_all(&FindAllRequest::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 0);
}

#[tokio::test]
async fn update_of_missing_user_is_not_found() {
    let deps = container();

    let err = deps
        .user_command
        .update_user(&UpdateUserRequest {
            user_id: Some(404),
            name: "Nobody".into(),
            email: "nobody@example.com".into(),
            phone: None,
            addresses: vec![],
        })
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn grpc_handler_maps_not_found() {
    let deps = container();
    let handler = UserQueryGrpcServiceImpl::new(deps.user_query.clone());

    let status = handler
        .find_by_id(Request::new(FindByIdRequest { id: 99 }))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::NotFound);
}
