use genproto::product::{
    ReleaseStockRequest, ReserveStockRequest as ReserveStockRequestProto,
    StockLine as StockLineProto, product_command_service_server::ProductCommandService,
};
use product::{
    di::{DependenciesInject, ProductRepositories},
    handler::ProductCommandGrpcServiceImpl,
};
use prometheus_client::registry::Registry;
use shared::{
    domain::requests::{
        CreateProductRequest, FindAllRequest, ReserveStockRequest, StockLine, UpdateProductRequest,
    },
    errors::ServiceError,
};
use tonic::{Code, Request};
use uuid::Uuid;

fn container() -> DependenciesInject {
    let mut registry = Registry::default();
    DependenciesInject::from_repositories(ProductRepositories::in_memory(), &mut registry)
}

async fn seed(deps: &DependenciesInject, name: &str, stock: i32) -> i32 {
    deps.product_command
        .create_product(&CreateProductRequest {
            name: name.into(),
            description: format!("{name} for testing"),
            price: 12_500,
            stock,
        })
        .await
        .unwrap()
        .data
        .id
}

async fn stock_of(deps: &DependenciesInject, id: i32) -> i32 {
    deps.product_query.find_by_id(id).await.unwrap().data.stock
}

fn reservation(id: Uuid, lines: &[(i32, i32)]) -> ReserveStockRequest {
    ReserveStockRequest {
        reservation_id: id,
        lines: lines
            .iter()
            .map(|&(product_id, quantity)| StockLine {
                product_id,
                quantity,
            })
            .collect(),
    }
}

fn update(product_id: i32, name: &str, price: i64) -> UpdateProductRequest {
    UpdateProductRequest {
        product_id: Some(product_id),
        name: name.into(),
        description: String::new(),
        price,
        stock: 6,
    }
}

#[tokio::test]
async fn create_get_update_delete() {
    let deps = container();

    let id = seed(&deps, "monitor", 4).await;

    let fetched = deps.product_query.find_by_id(id).await.unwrap().data;
    assert_eq!(fetched.name, "monitor");
    assert_eq!(fetched.price, 12_500);
    assert_eq!(fetched.version, 1);

    let updated = deps
        .product_command
        .update_product(&update(id, "monitor 27in", 14_000))
        .await
        .unwrap()
        .data;
    assert_eq!(updated.name, "monitor 27in");
    assert_eq!(updated.price, 14_000);
    assert_eq!(updated.stock, 6);
    assert_eq!(updated.version, 2);

    deps.product_command.delete_product(id).await.unwrap();

    let err = deps.product_query.find_by_id(id).await.unwrap_err();
    assert!(err.is_not_found());

    let err = deps.product_command.delete_product(id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn update_of_missing_product_is_not_found() {
    let deps = container();

    let err = deps
        .product_command
        .update_product(&update(404, "ghost", 1_000))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn invalid_product_input_is_rejected_before_the_store() {
    let deps = container();

    let err = deps
        .product_command
        .create_product(&CreateProductRequest {
            name: String::new(),
            description: String::new(),
            price: -1,
            stock: 3,
        })
        .await
        .unwrap_err();
    let ServiceError::Validation(messages) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(messages.iter().any(|m| m.starts_with("name")));
    assert!(messages.iter().any(|m| m.starts_with("price")));

    let page = deps
        .product_query
        .find_all(&FindAllRequest::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 0);

    let id = seed(&deps, "speaker", 2).await;
    let err = deps
        .product_command
        .update_product(&UpdateProductRequest {
            stock: -5,
            ..update(id, "speaker", 9_000)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref m) if m[0].starts_with("stock")));

    let err = deps
        .product_command
        .update_product(&UpdateProductRequest {
            product_id: None,
            ..update(id, "speaker", 9_000)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref m) if m[0].starts_with("product_id")));

    let unchanged = deps.product_query.find_by_id(id).await.unwrap().data;
    assert_eq!(unchanged.version, 1);
    assert_eq!(unchanged.stock, 2);
}

#[tokio::test]
async fn repeated_reservation_debits_once() {
    let deps = container();
    let keyboard = seed(&deps, "keyboard", 10).await;
    let id = Uuid::new_v4();

    let first = deps
        .product_command
        .reserve_stock(&reservation(id, &[(keyboard, 3)]))
        .await
        .unwrap();
    let second = deps
        .product_command
        .reserve_stock(&reservation(id, &[(keyboard, 3)]))
        .await
        .unwrap();

    assert_eq!(first.data.reservation_id, id.to_string());
    assert_eq!(second.data.reservation_id, id.to_string());
    assert!(!second.data.released);
    assert_eq!(stock_of(&deps, keyboard).await, 7);
}

#[tokio::test]
async fn insufficient_stock_is_a_validation_error_and_debits_nothing() {
    let deps = container();
    let mouse = seed(&deps, "mouse", 4).await;
    let cable = seed(&deps, "cable", 1).await;

    let err = deps
        .product_command
        .reserve_stock(&reservation(Uuid::new_v4(), &[(mouse, 2), (cable, 2)]))
        .await
        .unwrap_err();

    let ServiceError::Validation(messages) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(messages[0].contains("insufficient stock"));
    assert_eq!(stock_of(&deps, mouse).await, 4);
    assert_eq!(stock_of(&deps, cable).await, 1);
}

#[tokio::test]
async fn duplicate_lines_are_checked_against_their_sum() {
    let deps = container();
    let lamp = seed(&deps, "lamp", 3).await;

    let err = deps
        .product_command
        .reserve_stock(&reservation(Uuid::new_v4(), &[(lamp, 2), (lamp, 2)]))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(stock_of(&deps, lamp).await, 3);
}

#[tokio::test]
async fn release_restores_stock_and_is_idempotent() {
    let deps = container();
    let desk = seed(&deps, "desk", 2).await;
    let id = Uuid::new_v4();

    deps.product_command
        .reserve_stock(&reservation(id, &[(desk, 2)]))
        .await
        .unwrap();
    assert_eq!(stock_of(&deps, desk).await, 0);

    deps.product_command.release_stock(id).await.unwrap();
    let again = deps.product_command.release_stock(id).await.unwrap();

    assert_eq!(again.message, "Nothing to release");
    assert_eq!(stock_of(&deps, desk).await, 2);

    let err = deps
        .product_command
        .reserve_stock(&reservation(id, &[(desk, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidTransition(_)));
    assert_eq!(stock_of(&deps, desk).await, 2);
}

#[tokio::test]
async fn grpc_reserve_rejects_malformed_reservation_id() {
    let deps = container();
    let chair = seed(&deps, "chair", 5).await;
    let handler = ProductCommandGrpcServiceImpl::new(deps.product_command.clone());

    let status = handler
        .reserve_stock(Request::new(ReserveStockRequestProto {
            reservation_id: "not-a-uuid".into(),
            lines: vec![StockLineProto {
                product_id: chair,
                quantity: 1,
            }],
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let status = handler
        .release_stock(Request::new(ReleaseStockRequest {
            reservation_id: "also-bad".into(),
        }))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(stock_of(&deps, chair).await, 5);
}
