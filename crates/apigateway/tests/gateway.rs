use apigateway::{
    abstract_trait::{OrderGrpcClientTrait, ProductGrpcClientTrait, UserGrpcClientTrait},
    domain::{DeleteResponse, Fetched},
    handler::{
        create_resource, delete_resource, get_resource, list_resources, transition_order,
        update_resource,
    },
    middleware::{JsonBody, SimpleValidatedJson},
    routing::{ResourceType, RoutingTable, ServiceEndpoint, ServiceHandle},
};
use async_trait::async_trait;
use axum::{
    body::to_bytes,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use shared::{
    domain::{
        requests::{
            CreateOrderRequest, CreateProductRequest, CreateUserRequest, FindAllRequest,
            TransitionOrderRequest, UpdateOrderRequest, UpdateProductRequest, UpdateUserRequest,
        },
        responses::{
            ApiResponse, ApiResponsePagination, OrderResponse, Pagination, ProductResponse,
            UserResponse,
        },
    },
    errors::ServiceError,
};
use std::sync::Arc;

#[derive(Default)]
struct Calls(Mutex<Vec<String>>);

impl Calls {
    fn push(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    fn all(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

fn user(id: i32) -> UserResponse {
    UserResponse {
        id,
        name: "Dina".into(),
        email: "dina@example.com".into(),
        phone: None,
        addresses: vec![],
        version: 1,
        created_at: "2025-01-01T00:00:00Z".into(),
        updated_at: "2025-01-01T00:00:00Z".into(),
    }
}

fn product(id: i32) -> ProductResponse {
    ProductResponse {
        id,
        name: "Keyboard".into(),
        description: String::new(),
        price: 15000,
        stock: 10,
        version: 1,
        created_at: "2025-01-01T00:00:00Z".into(),
        updated_at: "2025-01-01T00:00:00Z".into(),
    }
}

fn order(id: i32, status: &str) -> OrderResponse {
    OrderResponse {
        id,
        user_id: 7,
        lines: vec![],
        total_price: 0,
        status: status.into(),
        reservation_id: "00000000-0000-0000-0000-000000000001".into(),
        payment_id: None,
        pending_event: None,
        version: 1,
        created_at: "2025-01-01T00:00:00Z".into(),
        updated_at: "2025-01-01T00:00:00Z".into(),
    }
}

fn deleted() -> DeleteResponse {
    DeleteResponse {
        status: "success".into(),
        message: "Deleted".into(),
    }
}

#[derive(Default)]
struct FakeUsers {
    calls: Calls,
    unavailable: bool,
}

#[async_trait]
impl UserGrpcClientTrait for FakeUsers {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<UserResponse>>, ServiceError> {
        self.calls.push(format!("find_all:{}", req.page));
        Ok(ApiResponsePagination::success(
            "Users fetched",
            vec![user(1), user(2)],
            Pagination::new(req.page, req.page_size, 2),
        ))
    }

    async fn find_by_id(&self, id: i32) -> Result<Fetched<UserResponse>, ServiceError> {
        self.calls.push(format!("find_by_id:{id}"));
        if self.unavailable {
            return Err(ServiceError::CircuitOpen("user-service".into()));
        }
        Ok(Fetched::fresh(ApiResponse::success("User fetched", user(id))))
    }

    async fn create(
        &self,
        req: &CreateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError> {
        self.calls.push(format!("create:{}", req.email));
        Ok(ApiResponse::success("User created", user(1)))
    }

    async fn update(
        &self,
        req: &UpdateUserRequest,
    ) -> Result<ApiResponse<UserResponse>, ServiceError> {
        self.calls.push(format!("update:{:?}", req.user_id));
        Ok(ApiResponse::success(
            "User updated",
            user(req.user_id.unwrap_or_default()),
        ))
    }

    async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError> {
        self.calls.push(format!("delete:{id}"));
        Err(ServiceError::not_found())
    }
}

#[derive(Default)]
struct FakeProducts {
    calls: Calls,
}

#[async_trait]
impl ProductGrpcClientTrait for FakeProducts {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<ProductResponse>>, ServiceError> {
        self.calls.push(format!("find_all:{}", req.search));
        Ok(ApiResponsePagination::success(
            "Products fetched",
            vec![product(1)],
            Pagination::new(req.page, req.page_size, 1),
        ))
    }

    async fn find_by_id(&self, id: i32) -> Result<Fetched<ProductResponse>, ServiceError> {
        self.calls.push(format!("find_by_id:{id}"));
        Ok(Fetched::stale(ApiResponse::success(
            "Product fetched",
            product(id),
        )))
    }

    async fn create(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError> {
        self.calls.push(format!("create:{}", req.name));
        Ok(ApiResponse::success("Product created", product(1)))
    }

    async fn update(
        &self,
        req: &UpdateProductRequest,
    ) -> Result<ApiResponse<ProductResponse>, ServiceError> {
        self.calls.push(format!("update:{:?}", req.product_id));
        Ok(ApiResponse::success(
            "Product updated",
            product(req.product_id.unwrap_or_default()),
        ))
    }

    async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError> {
        self.calls.push(format!("delete:{id}"));
        Ok(deleted())
    }
}

#[derive(Default)]
struct FakeOrders {
    calls: Calls,
}

#[async_trait]
impl OrderGrpcClientTrait for FakeOrders {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<OrderResponse>>, ServiceError> {
        self.calls.push(format!("find_all:{}", req.page));
        Ok(ApiResponsePagination::success(
            "Orders fetched",
            vec![],
            Pagination::new(req.page, req.page_size, 0),
        ))
    }

    async fn find_by_id(&self, id: i32) -> Result<Fetched<OrderResponse>, ServiceError> {
        self.calls.push(format!("find_by_id:{id}"));
        Ok(Fetched::fresh(ApiResponse::success(
            "Order fetched",
            order(id, "created"),
        )))
    }

    async fn create(
        &self,
        req: &CreateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        self.calls.push(format!("create:{}", req.user_id));
        Ok(ApiResponse::success("Order created", order(1, "created")))
    }

    async fn update(
        &self,
        req: &UpdateOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        self.calls.push(format!("update:{:?}", req.order_id));
        Ok(ApiResponse::success(
            "Order updated",
            order(req.order_id.unwrap_or_default(), "created"),
        ))
    }

    async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError> {
        self.calls.push(format!("delete:{id}"));
        Ok(deleted())
    }

    async fn transition(
        &self,
        req: &TransitionOrderRequest,
    ) -> Result<ApiResponse<OrderResponse>, ServiceError> {
        self.calls
            .push(format!("transition:{:?}:{}", req.order_id, req.event));
        match req.event.as_str() {
            "pay" => Ok(ApiResponse::success(
                "Order is now paid",
                order(req.order_id.unwrap_or_default(), "paid"),
            )),
            "fulfill" => Err(ServiceError::InvalidTransition(
                "cannot fulfill an order that is created".into(),
            )),
            other => Err(ServiceError::validation(format!(
                "event: expected pay, fulfill or cancel, got {other}"
            ))),
        }
    }
}

struct Gateway {
    routing: Arc<RoutingTable>,
    users: Arc<FakeUsers>,
    products: Arc<FakeProducts>,
    orders: Arc<FakeOrders>,
}

impl Gateway {
    fn new() -> Self {
        Self::with_users(FakeUsers::default())
    }

    fn with_users(users: FakeUsers) -> Self {
        let users = Arc::new(users);
        let products = Arc::new(FakeProducts::default());
        let orders = Arc::new(FakeOrders::default());

        let routing = RoutingTable::new()
            .with_route(
                ServiceEndpoint::new(ResourceType::Users, "http://user:50051"),
                ServiceHandle::Users(users.clone()),
            )
            .with_route(
                ServiceEndpoint::new(ResourceType::Products, "http://product:50052"),
                ServiceHandle::Products(products.clone()),
            )
            .with_route(
                ServiceEndpoint::new(ResourceType::Orders, "http://order:50053"),
                ServiceHandle::Orders(orders.clone()),
            );

        Self {
            routing: Arc::new(routing),
            users,
            products,
            orders,
        }
    }

    fn routing(&self) -> Extension<Arc<RoutingTable>> {
        Extension(self.routing.clone())
    }
}

async fn read(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn path(resource: &str) -> Path<String> {
    Path(resource.to_string())
}

fn path_id(resource: &str, id: i32) -> Path<(String, i32)> {
    Path((resource.to_string(), id))
}

#[tokio::test]
async fn each_resource_reaches_its_owning_service() {
    let gw = Gateway::new();

    for (resource, id) in [("users", 1), ("products", 2), ("orders", 3)] {
        let response = get_resource(gw.routing(), path_id(resource, id))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(gw.users.calls.all(), vec!["find_by_id:1"]);
    assert_eq!(gw.products.calls.all(), vec!["find_by_id:2"]);
    assert_eq!(gw.orders.calls.all(), vec!["find_by_id:3"]);
}

#[tokio::test]
async fn unknown_resource_is_404_and_reaches_nobody() {
    let gw = Gateway::new();

    let response = list_resources(
        gw.routing(),
        path("invoices"),
        Query(FindAllRequest::default()),
    )
    .await
    .into_response();
    let (status, body) = read(response).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Unknown resource: invoices");

    let response = delete_resource(gw.routing(), path_id("invoices", 1))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(gw.users.calls.all().is_empty());
    assert!(gw.products.calls.all().is_empty());
    assert!(gw.orders.calls.all().is_empty());
}

#[tokio::test]
async fn list_returns_entities_with_pagination() {
    let gw = Gateway::new();

    let response = list_resources(
        gw.routing(),
        path("users"),
        Query(FindAllRequest::default()),
    )
    .await
    .into_response();
    let (status, body) = read(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["email"], "dina@example.com");
    assert_eq!(body["pagination"]["total_items"], 2);
}

#[tokio::test]
async fn invalid_pagination_is_rejected_before_dispatch() {
    let gw = Gateway::new();

    let response = list_resources(
        gw.routing(),
        path("products"),
        Query(FindAllRequest {
            page: 1,
            page_size: 0,
            search: String::new(),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(gw.products.calls.all().is_empty());
}

#[tokio::test]
async fn invalid_body_is_400_and_never_sent() {
    let gw = Gateway::new();

    let response = create_resource(
        gw.routing(),
        path("users"),
        JsonBody(json!({ "name": "Dina", "email": "not-an-email" })),
    )
    .await
    .into_response();
    let (status, body) = read(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("email"));

    let response = create_resource(
        gw.routing(),
        path("orders"),
        JsonBody(json!({
            "user_id": 7,
            "lines": [
                { "product_id": 1, "quantity": 1 },
                { "product_id": 1, "quantity": 2 }
            ]
        })),
    )
    .await
    .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(gw.users.calls.all().is_empty());
    assert!(gw.orders.calls.all().is_empty());
}

#[tokio::test]
async fn valid_create_is_201() {
    let gw = Gateway::new();

    let response = create_resource(
        gw.routing(),
        path("products"),
        JsonBody(json!({ "name": "Keyboard", "price": 15000, "stock": 10 })),
    )
    .await
    .into_response();
    let (status, body) = read(response).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "Keyboard");
    assert_eq!(gw.products.calls.all(), vec!["create:Keyboard"]);
}

#[tokio::test]
async fn update_takes_the_id_from_the_path() {
    let gw = Gateway::new();

    let response = update_resource(
        gw.routing(),
        path_id("products", 5),
        JsonBody(json!({
            "product_id": 99,
            "name": "Keyboard",
            "price": 15000,
            "stock": 10
        })),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(gw.products.calls.all(), vec!["update:Some(5)"]);
}

#[tokio::test]
async fn downstream_not_found_maps_to_404() {
    let gw = Gateway::new();

    let response = delete_resource(gw.routing(), path_id("users", 42))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(gw.users.calls.all(), vec!["delete:42"]);
}

#[tokio::test]
async fn stale_copies_are_flagged() {
    let gw = Gateway::new();

    let (_, fresh) = read(
        get_resource(gw.routing(), path_id("orders", 3))
            .await
            .into_response(),
    )
    .await;
    assert_eq!(fresh["stale"], false);
    assert!(fresh["data"].get("stale").is_none());

    let (status, stale) = read(
        get_resource(gw.routing(), path_id("products", 2))
            .await
            .into_response(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stale["stale"], true);
    assert_eq!(stale["data"]["id"], 2);
}

#[tokio::test]
async fn open_circuit_without_a_copy_is_503() {
    let gw = Gateway::with_users(FakeUsers {
        unavailable: true,
        ..FakeUsers::default()
    });

    let response = get_resource(gw.routing(), path_id("users", 1))
        .await
        .into_response();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn transition_is_forwarded_with_the_path_id() {
    let gw = Gateway::new();

    let response = transition_order(
        gw.routing(),
        Path(3),
        SimpleValidatedJson(TransitionOrderRequest {
            order_id: None,
            event: "pay".into(),
        }),
    )
    .await
    .into_response();
    let (status, body) = read(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "paid");
    assert_eq!(gw.orders.calls.all(), vec!["transition:Some(3):pay"]);
}

#[tokio::test]
async fn rejected_transitions_map_to_409_and_400() {
    let gw = Gateway::new();

    let conflict = transition_order(
        gw.routing(),
        Path(3),
        SimpleValidatedJson(TransitionOrderRequest {
            order_id: None,
            event: "fulfill".into(),
        }),
    )
    .await
    .into_response();
    assert_eq!(conflict.status(), StatusCode::CONFLICT);

    let unknown = transition_order(
        gw.routing(),
        Path(3),
        SimpleValidatedJson(TransitionOrderRequest {
            order_id: None,
            event: "ship".into(),
        }),
    )
    .await
    .into_response();
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_orders_have_transitions() {
    let gw = Gateway::new();
    let users = gw.routing.route("users").unwrap();

    let err = users
        .transition(
            1,
            TransitionOrderRequest {
                order_id: None,
                event: "pay".into(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::UnknownResource(_)));
    assert!(gw.users.calls.all().is_empty());
}

#[test]
fn endpoints_are_listed_in_resource_order() {
    let gw = Gateway::new();

    let services: Vec<_> = gw.routing.endpoints().map(|e| e.service).collect();
    assert_eq!(
        services,
        vec!["user-service", "product-service", "order-service"]
    );
}
