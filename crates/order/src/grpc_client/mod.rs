mod payment;
mod product;
mod user;

pub use self::payment::PaymentGrpcClientService;
pub use self::product::ProductGrpcClientService;
pub use self::user::UserGrpcClientService;

use crate::di::OrderClients;
use anyhow::{Context, Result};
use genproto::{
    payment::payment_service_client::PaymentServiceClient,
    product::{
        product_command_service_client::ProductCommandServiceClient,
        product_query_service_client::ProductQueryServiceClient,
    },
    user::user_query_service_client::UserQueryServiceClient,
};
use prometheus_client::registry::Registry;
use shared::{
    config::{ResilienceConfig, grpc_addr_from_env},
    resilience::Resilience,
};
use std::{sync::Arc, time::Duration};
use tonic::transport::{Channel, Endpoint};

#[derive(Debug, Clone)]
pub struct GrpcClientConfig {
    pub user: String,
    pub product: String,
    pub payment: String,
}

impl GrpcClientConfig {
    pub fn init() -> Result<Self> {
        Ok(Self {
            user: grpc_addr_from_env("GRPC_USER_ADDR")?,
            product: grpc_addr_from_env("GRPC_PRODUCT_ADDR")?,
            payment: grpc_addr_from_env("GRPC_PAYMENT_ADDR")?,
        })
    }
}

pub struct GrpcClients;

impl GrpcClients {
    /// Builds one resilient client per peer. Channels connect on first use so
    /// the order service starts even while a peer is down.
    pub fn init(
        config: &GrpcClientConfig,
        resilience: &ResilienceConfig,
        registry: &mut Registry,
    ) -> Result<OrderClients> {
        let user_channel = Self::connect(&config.user, "user-service")?;
        let product_channel = Self::connect(&config.product, "product-service")?;
        let payment_channel = Self::connect(&config.payment, "payment-service")?;

        let user_policy = Self::policy("user-service", resilience, registry);
        let product_policy = Self::policy("product-service", resilience, registry);
        let payment_policy = Self::policy("payment-service", resilience, registry);

        Ok(OrderClients {
            users: Arc::new(UserGrpcClientService::new(
                UserQueryServiceClient::new(user_channel),
                user_policy,
                registry,
            )),
            products: Arc::new(ProductGrpcClientService::new(
                ProductQueryServiceClient::new(product_channel.clone()),
                ProductCommandServiceClient::new(product_channel),
                product_policy,
                registry,
            )),
            payments: Arc::new(PaymentGrpcClientService::new(
                PaymentServiceClient::new(payment_channel),
                payment_policy,
                registry,
            )),
        })
    }

    fn policy(target: &str, config: &ResilienceConfig, registry: &mut Registry) -> Resilience {
        let policy = Resilience::from_config(target, config);
        if let Some(breaker) = policy.breaker() {
            breaker.register(registry);
        }
        policy
    }

    fn connect(addr: &str, service: &str) -> Result<Channel> {
        let endpoint = Endpoint::from_shared(addr.to_string())
            .with_context(|| format!("Invalid gRPC address for {service}: {addr}"))?;

        Ok(endpoint
            .connect_timeout(Duration::from_secs(3))
            .http2_keep_alive_interval(Duration::from_secs(30))
            .keep_alive_timeout(Duration::from_secs(5))
            .initial_connection_window_size(1_048_576)
            .initial_stream_window_size(1_048_576)
            .connect_lazy())
    }
}
