use crate::{
    abstract_trait::{
        DynOrderCommandRepository, DynOrderCommandService, DynOrderQueryRepository,
        DynOrderQueryService, DynPaymentClient, DynProductClient, DynUserClient,
    },
    repository::{InMemoryOrderRepository, OrderCommandRepository, OrderQueryRepository},
    service::{OrderCommandService, OrderCommandServiceDeps, OrderQueryService},
};
use prometheus_client::registry::Registry;
use shared::config::StoreBackend;
use std::{fmt, sync::Arc, time::Duration};

/// Peer services the order saga talks to.
#[derive(Clone)]
pub struct OrderClients {
    pub users: DynUserClient,
    pub products: DynProductClient,
    pub payments: DynPaymentClient,
}

pub struct OrderRepositories {
    pub query: DynOrderQueryRepository,
    pub command: DynOrderCommandRepository,
}

impl OrderRepositories {
    pub fn in_memory() -> Self {
        let repo = Arc::new(InMemoryOrderRepository::new());
        Self {
            query: repo.clone(),
            command: repo,
        }
    }
}

#[derive(Clone)]
pub struct DependenciesInject {
    pub order_query: DynOrderQueryService,
    pub order_command: DynOrderCommandService,
}

impl fmt::Debug for DependenciesInject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependenciesInject")
            .field("order_query", &"OrderQueryService")
            .field("order_command", &"OrderCommandService")
            .finish()
    }
}

impl DependenciesInject {
    pub fn new(
        store: &StoreBackend,
        clients: OrderClients,
        claim_lease: Duration,
        registry: &mut Registry,
    ) -> Self {
        let repositories = match store {
            StoreBackend::Postgres(pool) => OrderRepositories {
                query: Arc::new(OrderQueryRepository::new(pool.clone())),
                command: Arc::new(OrderCommandRepository::new(pool.clone())),
            },
            StoreBackend::Memory => OrderRepositories::in_memory(),
        };

        Self::from_parts(repositories, clients, claim_lease, registry)
    }

    pub fn from_parts(
        repositories: OrderRepositories,
        clients: OrderClients,
        claim_lease: Duration,
        registry: &mut Registry,
    ) -> Self {
        let OrderRepositories { query, command } = repositories;

        let order_query = Arc::new(OrderQueryService::new(query.clone(), registry));

        let order_command = Arc::new(OrderCommandService::new(
            OrderCommandServiceDeps {
                query,
                command,
                clients,
                claim_lease,
            },
            registry,
        ));

        Self {
            order_query,
            order_command,
        }
    }
}
