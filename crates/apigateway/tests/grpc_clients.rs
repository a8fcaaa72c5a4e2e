use apigateway::{abstract_trait::ProductGrpcClientTrait, service::ProductGrpcClientService};
use genproto::product::{
    product_command_service_client::ProductCommandServiceClient,
    product_query_service_client::ProductQueryServiceClient,
};
use prometheus_client::registry::Registry;
use shared::{
    config::{CircuitBreakerConfig, RetryConfig},
    domain::requests::{CreateProductRequest, FindAllRequest},
    errors::ServiceError,
    resilience::{CircuitBreaker, Resilience},
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tonic::transport::Endpoint;

/// Accepts connections and never answers on them.
async fn silent_peer() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("http://{addr}")
}

fn client(addr: String, breaker: Arc<CircuitBreaker>) -> ProductGrpcClientService {
    let channel = Endpoint::from_shared(addr).unwrap().connect_lazy();
    let policy = Resilience::new("product-service")
        .with_timeout(Duration::from_millis(100))
        .with_retry(RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(20),
            multiplier: 2.0,
            jitter: false,
        })
        .with_circuit_breaker(breaker);

    ProductGrpcClientService::new(
        ProductQueryServiceClient::new(channel.clone()),
        ProductCommandServiceClient::new(channel),
        policy,
        16,
        &mut Registry::default(),
    )
}

#[tokio::test]
async fn timed_out_create_is_sent_once_while_reads_retry() {
    let breaker = Arc::new(CircuitBreaker::new(
        "product-service",
        CircuitBreakerConfig {
            failure_threshold: 10,
            ..CircuitBreakerConfig::default()
        },
    ));
    let products = client(silent_peer().await, breaker.clone());

    let err = products
        .create(&CreateProductRequest {
            name: "Keyboard".into(),
            description: String::new(),
            price: 15_000,
            stock: 10,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Timeout(_)), "{err}");
    assert_eq!(breaker.stats().calls_in_window, 1);

    let err = products
        .find_all(&FindAllRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Timeout(_)), "{err}");
    assert_eq!(breaker.stats().calls_in_window, 4);
}
