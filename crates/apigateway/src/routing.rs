//! Static map from a resource segment (`/api/{resource}`) to the service that
//! owns it. Resolution never retries; resilience lives in the clients.

use crate::{
    abstract_trait::{DynOrderGrpcClient, DynProductGrpcClient, DynUserGrpcClient},
    domain::{DeleteResponse, EntityResponse, ResourceEntity},
    middleware::parse_validated,
};
use serde_json::Value;
use shared::{
    domain::{
        requests::{
            CreateOrderRequest, CreateProductRequest, CreateUserRequest, FindAllRequest,
            TransitionOrderRequest, UpdateOrderRequest, UpdateProductRequest, UpdateUserRequest,
        },
        responses::{ApiResponse, ApiResponsePagination},
    },
    errors::ServiceError,
};
use std::{collections::HashMap, fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Users,
    Products,
    Orders,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [
        ResourceType::Users,
        ResourceType::Products,
        ResourceType::Orders,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Users => "users",
            ResourceType::Products => "products",
            ResourceType::Orders => "orders",
        }
    }

    pub fn service_name(&self) -> &'static str {
        match self {
            ResourceType::Users => "user-service",
            ResourceType::Products => "product-service",
            ResourceType::Orders => "order-service",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ServiceError;

    fn from_str(segment: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|resource| resource.as_str() == segment)
            .ok_or_else(|| ServiceError::UnknownResource(segment.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub resource: ResourceType,
    pub service: &'static str,
    pub addr: String,
}

impl ServiceEndpoint {
    pub fn new(resource: ResourceType, addr: impl Into<String>) -> Self {
        Self {
            resource,
            service: resource.service_name(),
            addr: addr.into(),
        }
    }
}

/// The typed, resilient client of the service owning a resource.
#[derive(Clone)]
pub enum ServiceHandle {
    Users(DynUserGrpcClient),
    Products(DynProductGrpcClient),
    Orders(DynOrderGrpcClient),
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceHandle")
            .field(&self.resource())
            .finish()
    }
}

fn into_entity<T: Into<ResourceEntity>>(response: ApiResponse<T>) -> ApiResponse<ResourceEntity> {
    ApiResponse {
        status: response.status,
        message: response.message,
        data: response.data.into(),
    }
}

fn into_entities<T: Into<ResourceEntity>>(
    response: ApiResponsePagination<Vec<T>>,
) -> ApiResponsePagination<Vec<ResourceEntity>> {
    ApiResponsePagination {
        status: response.status,
        message: response.message,
        data: response.data.into_iter().map(Into::into).collect(),
        pagination: response.pagination,
    }
}

impl ServiceHandle {
    pub fn resource(&self) -> ResourceType {
        match self {
            ServiceHandle::Users(_) => ResourceType::Users,
            ServiceHandle::Products(_) => ResourceType::Products,
            ServiceHandle::Orders(_) => ResourceType::Orders,
        }
    }

    pub async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<ApiResponsePagination<Vec<ResourceEntity>>, ServiceError> {
        match self {
            ServiceHandle::Users(client) => client.find_all(req).await.map(into_entities),
            ServiceHandle::Products(client) => client.find_all(req).await.map(into_entities),
            ServiceHandle::Orders(client) => client.find_all(req).await.map(into_entities),
        }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<EntityResponse, ServiceError> {
        match self {
            ServiceHandle::Users(client) => client.find_by_id(id).await.map(Into::into),
            ServiceHandle::Products(client) => client.find_by_id(id).await.map(Into::into),
            ServiceHandle::Orders(client) => client.find_by_id(id).await.map(Into::into),
        }
    }

    /// Parses `body` into the owning service's create request and validates
    /// it before anything is sent.
    pub async fn create(&self, body: Value) -> Result<ApiResponse<ResourceEntity>, ServiceError> {
        match self {
            ServiceHandle::Users(client) => {
                let req: CreateUserRequest = parse_validated(body)?;
                client.create(&req).await.map(into_entity)
            }
            ServiceHandle::Products(client) => {
                let req: CreateProductRequest = parse_validated(body)?;
                client.create(&req).await.map(into_entity)
            }
            ServiceHandle::Orders(client) => {
                let req: CreateOrderRequest = parse_validated(body)?;
                client.create(&req).await.map(into_entity)
            }
        }
    }

    /// Like [`ServiceHandle::create`]; the id from the path always wins over
    /// one in the body.
    pub async fn update(
        &self,
        id: i32,
        body: Value,
    ) -> Result<ApiResponse<ResourceEntity>, ServiceError> {
        match self {
            ServiceHandle::Users(client) => {
                let mut req: UpdateUserRequest = parse_validated(body)?;
                req.user_id = Some(id);
                client.update(&req).await.map(into_entity)
            }
            ServiceHandle::Products(client) => {
                let mut req: UpdateProductRequest = parse_validated(body)?;
                req.product_id = Some(id);
                client.update(&req).await.map(into_entity)
            }
            ServiceHandle::Orders(client) => {
                let mut req: UpdateOrderRequest = parse_validated(body)?;
                req.order_id = Some(id);
                client.update(&req).await.map(into_entity)
            }
        }
    }

    pub async fn delete(&self, id: i32) -> Result<DeleteResponse, ServiceError> {
        match self {
            ServiceHandle::Users(client) => client.delete(id).await,
            ServiceHandle::Products(client) => client.delete(id).await,
            ServiceHandle::Orders(client) => client.delete(id).await,
        }
    }

    /// Only orders have a lifecycle.
    pub async fn transition(
        &self,
        id: i32,
        mut req: TransitionOrderRequest,
    ) -> Result<ApiResponse<ResourceEntity>, ServiceError> {
        match self {
            ServiceHandle::Orders(client) => {
                req.order_id = Some(id);
                client.transition(&req).await.map(into_entity)
            }
            other => Err(ServiceError::UnknownResource(format!(
                "{}/{id}/transition",
                other.resource()
            ))),
        }
    }
}

struct Route {
    endpoint: ServiceEndpoint,
    handle: ServiceHandle,
}

/// Built once at startup and read-only afterwards.
#[derive(Default)]
pub struct RoutingTable {
    routes: HashMap<ResourceType, Route>,
}

impl fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.endpoints().map(|e| (e.resource, &e.addr)))
            .finish()
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, endpoint: ServiceEndpoint, handle: ServiceHandle) -> Self {
        self.routes
            .insert(endpoint.resource, Route { endpoint, handle });
        self
    }

    /// Resolves the `{resource}` path segment to the owning service's client.
    pub fn route(&self, segment: &str) -> Result<ServiceHandle, ServiceError> {
        let resource = segment.parse::<ResourceType>()?;
        self.resolve(resource)
    }

    pub fn resolve(&self, resource: ResourceType) -> Result<ServiceHandle, ServiceError> {
        self.routes
            .get(&resource)
            .map(|route| route.handle.clone())
            .ok_or_else(|| ServiceError::UnknownResource(resource.to_string()))
    }

    pub fn endpoint(&self, resource: ResourceType) -> Option<&ServiceEndpoint> {
        self.routes.get(&resource).map(|route| &route.endpoint)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &ServiceEndpoint> {
        let mut endpoints: Vec<_> = self.routes.values().map(|route| &route.endpoint).collect();
        endpoints.sort_by_key(|endpoint| endpoint.resource);
        endpoints.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_segments_only() {
        assert_eq!("users".parse::<ResourceType>().unwrap(), ResourceType::Users);
        assert_eq!("orders".parse::<ResourceType>().unwrap(), ResourceType::Orders);

        for segment in ["invoices", "Users", "user", ""] {
            let err = segment.parse::<ResourceType>().unwrap_err();
            assert!(matches!(err, ServiceError::UnknownResource(s) if s == segment));
        }
    }

    #[test]
    fn unregistered_resource_is_unknown() {
        let table = RoutingTable::new();

        let err = table.route("products").unwrap_err();
        assert!(matches!(err, ServiceError::UnknownResource(s) if s == "products"));
        assert!(table.endpoint(ResourceType::Products).is_none());
    }

    #[test]
    fn endpoint_names_the_owning_service() {
        let endpoint = ServiceEndpoint::new(ResourceType::Products, "http://product:50052");
        assert_eq!(endpoint.service, "product-service");
        assert_eq!(endpoint.addr, "http://product:50052");
    }
}
