mod order;
mod product;
mod user;

pub use self::order::OrderGrpcClientService;
pub use self::product::ProductGrpcClientService;
pub use self::user::UserGrpcClientService;

use crate::{
    config::Config,
    routing::{ResourceType, RoutingTable, ServiceEndpoint, ServiceHandle},
};
use anyhow::{Context, Result};
use genproto::{
    order::{
        order_command_service_client::OrderCommandServiceClient,
        order_query_service_client::OrderQueryServiceClient,
    },
    product::{
        product_command_service_client::ProductCommandServiceClient,
        product_query_service_client::ProductQueryServiceClient,
    },
    user::{
        user_command_service_client::UserCommandServiceClient,
        user_query_service_client::UserQueryServiceClient,
    },
};
use prometheus_client::registry::Registry;
use shared::{config::ResilienceConfig, resilience::Resilience};
use std::{sync::Arc, time::Duration};
use tonic::transport::{Channel, Endpoint};

pub struct GrpcClients;

impl GrpcClients {
    /// Builds the routing table with one resilient client per owning service.
    /// Channels connect lazily, so the gateway starts while services are down.
    pub fn init(config: &Config, registry: &mut Registry) -> Result<RoutingTable> {
        let peers = &config.grpc_clients;

        let user = ServiceEndpoint::new(ResourceType::Users, &peers.user);
        let product = ServiceEndpoint::new(ResourceType::Products, &peers.product);
        let order = ServiceEndpoint::new(ResourceType::Orders, &peers.order);

        let user_channel = Self::connect(&user)?;
        let product_channel = Self::connect(&product)?;
        let order_channel = Self::connect(&order)?;

        let users = UserGrpcClientService::new(
            UserQueryServiceClient::new(user_channel.clone()),
            UserCommandServiceClient::new(user_channel),
            Self::policy(&user, &config.resilience, registry),
            config.cache_capacity,
            registry,
        );
        let products = ProductGrpcClientService::new(
            ProductQueryServiceClient::new(product_channel.clone()),
            ProductCommandServiceClient::new(product_channel),
            Self::policy(&product, &config.resilience, registry),
            config.cache_capacity,
            registry,
        );
        let orders = OrderGrpcClientService::new(
            OrderQueryServiceClient::new(order_channel.clone()),
            OrderCommandServiceClient::new(order_channel),
            Self::policy(&order, &config.resilience, registry),
            config.cache_capacity,
            registry,
        );

        Ok(RoutingTable::new()
            .with_route(user, ServiceHandle::Users(Arc::new(users)))
            .with_route(product, ServiceHandle::Products(Arc::new(products)))
            .with_route(order, ServiceHandle::Orders(Arc::new(orders))))
    }

    fn policy(
        endpoint: &ServiceEndpoint,
        config: &ResilienceConfig,
        registry: &mut Registry,
    ) -> Resilience {
        let policy = Resilience::from_config(endpoint.service, config);
        if let Some(breaker) = policy.breaker() {
            breaker.register(registry);
        }
        policy
    }

    fn connect(endpoint: &ServiceEndpoint) -> Result<Channel> {
        let channel = Endpoint::from_shared(endpoint.addr.clone()).with_context(|| {
            format!(
                "Invalid gRPC address for {}: {}",
                endpoint.service, endpoint.addr
            )
        })?;

        Ok(channel
            .connect_timeout(Duration::from_secs(3))
            .http2_keep_alive_interval(Duration::from_secs(30))
            .keep_alive_timeout(Duration::from_secs(5))
            .initial_connection_window_size(1_048_576)
            .initial_stream_window_size(1_048_576)
            .connect_lazy())
    }
}
