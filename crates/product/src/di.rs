use crate::{
    abstract_trait::{
        DynProductCommandRepository, DynProductCommandService, DynProductQueryRepository,
        DynProductQueryService, DynStockRepository,
    },
    repository::{
        InMemoryProductRepository, ProductCommandRepository, ProductQueryRepository,
        StockRepository,
    },
    service::{ProductCommandService, ProductCommandServiceDeps, ProductQueryService},
};
use prometheus_client::registry::Registry;
use shared::config::StoreBackend;
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct DependenciesInject {
    pub product_query: DynProductQueryService,
    pub product_command: DynProductCommandService,
}

impl fmt::Debug for DependenciesInject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependenciesInject")
            .field("product_query", &"ProductQueryService")
            .field("product_command", &"ProductCommandService")
            .finish()
    }
}

pub struct ProductRepositories {
    pub query: DynProductQueryRepository,
    pub command: DynProductCommandRepository,
    pub stock: DynStockRepository,
}

impl ProductRepositories {
    pub fn in_memory() -> Self {
        let repo = Arc::new(InMemoryProductRepository::new());
        Self {
            query: repo.clone(),
            command: repo.clone(),
            stock: repo,
        }
    }
}

impl DependenciesInject {
    pub fn new(store: &StoreBackend, registry: &mut Registry) -> Self {
        let repositories = match store {
            StoreBackend::Postgres(pool) => ProductRepositories {
                query: Arc::new(ProductQueryRepository::new(pool.clone())),
                command: Arc::new(ProductCommandRepository::new(pool.clone())),
                stock: Arc::new(StockRepository::new(pool.clone())),
            },
            StoreBackend::Memory => ProductRepositories::in_memory(),
        };

        Self::from_repositories(repositories, registry)
    }

    pub fn from_repositories(repositories: ProductRepositories, registry: &mut Registry) -> Self {
        let ProductRepositories {
            query,
            command,
            stock,
        } = repositories;

        let product_query = Arc::new(ProductQueryService::new(query.clone(), registry));

        let product_command = Arc::new(ProductCommandService::new(
            ProductCommandServiceDeps {
                query,
                command,
                stock,
            },
            registry,
        ));

        Self {
            product_query,
            product_command,
        }
    }
}
