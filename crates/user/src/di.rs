use crate::{
    abstract_trait::{
        DynUserCommandRepository, DynUserCommandService, DynUserQueryRepository,
        DynUserQueryService,
    },
    repository::{InMemoryUserRepository, UserCommandRepository, UserQueryRepository},
    service::{UserCommandService, UserCommandServiceDeps, UserQueryService},
};
use prometheus_client::registry::Registry;
use shared::config::StoreBackend;
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct DependenciesInject {
    pub user_query: DynUserQueryService,
    pub user_command: DynUserCommandService,
}

impl fmt::Debug for DependenciesInject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependenciesInject")
            .field("user_query", &"UserQueryService")
            .field("user_command", &"UserCommandService")
            .finish()
    }
}

impl DependenciesInject {
    pub fn new(store: &StoreBackend, registry: &mut Registry) -> Self {
        let (query, command): (DynUserQueryRepository, DynUserCommandRepository) = match store {
            StoreBackend::Postgres(pool) => (
                Arc::new(UserQueryRepository::new(pool.clone())),
                Arc::new(UserCommandRepository::new(pool.clone())),
            ),
            StoreBackend::Memory => {
                let repo = Arc::new(InMemoryUserRepository::new());
                (repo.clone(), repo)
            }
        };

        Self::from_repositories(query, command, registry)
    }

    pub fn from_repositories(
        query: DynUserQueryRepository,
        command: DynUserCommandRepository,
        registry: &mut Registry,
    ) -> Self {
        let user_query = Arc::new(UserQueryService::new(query.clone(), registry));

        let user_command = Arc::new(UserCommandService::new(
            UserCommandServiceDeps { query, command },
            registry,
        ));

        Self {
            user_query,
            user_command,
        }
    }
}
