use crate::{
    abstract_trait::{OrderCommandRepositoryTrait, OrderQueryRepositoryTrait},
    model::{NewOrder, Order as OrderModel, OrderLine, OrderStatusUpdate},
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use shared::{domain::requests::FindAllRequest, errors::RepositoryError};
use sqlx::types::Json;
use std::collections::BTreeMap;

#[derive(Default)]
struct OrderTable {
    last_id: i32,
    orders: BTreeMap<i32, OrderModel>,
}

impl OrderTable {
    fn versioned(
        &mut self,
        order_id: i32,
        expected_version: i64,
    ) -> Result<&mut OrderModel, RepositoryError> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(RepositoryError::NotFound)?;

        if order.version != expected_version {
            return Err(RepositoryError::Conflict(format!(
                "order {order_id} changed since version {expected_version}"
            )));
        }

        Ok(order)
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    table: RwLock<OrderTable>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderQueryRepositoryTrait for InMemoryOrderRepository {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<(Vec<OrderModel>, i64), RepositoryError> {
        let table = self.table.read();
        let needle = req.search.trim().to_lowercase();

        let matching: Vec<&OrderModel> = table
            .orders
            .values()
            .rev()
            .filter(|o| needle.is_empty() || o.status.contains(&needle))
            .collect();

        let total = matching.len() as i64;
        let offset = ((req.page - 1).max(0) * req.page_size) as usize;

        let page = matching
            .into_iter()
            .skip(offset)
            .take(req.page_size.max(0) as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<OrderModel>, RepositoryError> {
        Ok(self.table.read().orders.get(&id).cloned())
    }
}

#[async_trait]
impl OrderCommandRepositoryTrait for InMemoryOrderRepository {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderModel, RepositoryError> {
        let mut table = self.table.write();

        if table
            .orders
            .values()
            .any(|o| o.reservation_id == order.reservation_id)
        {
            return Err(RepositoryError::AlreadyExists(format!(
                "reservation {} already belongs to an order",
                order.reservation_id
            )));
        }

        table.last_id += 1;
        let now = Utc::now();
        let created = OrderModel {
            order_id: table.last_id,
            user_id: order.user_id,
            lines: Json(order.lines.clone()),
            status: "created".to_string(),
            reservation_id: order.reservation_id,
            payment_key: order.payment_key,
            payment_id: None,
            pending_event: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        table.orders.insert(created.order_id, created.clone());
        Ok(created)
    }

    async fn update_lines(
        &self,
        order_id: i32,
        expected_version: i64,
        lines: &[OrderLine],
    ) -> Result<OrderModel, RepositoryError> {
        let mut table = self.table.write();
        let order = table.versioned(order_id, expected_version)?;

        order.lines = Json(lines.to_vec());
        order.version += 1;
        order.updated_at = Utc::now();

        Ok(order.clone())
    }

    async fn update_status(
        &self,
        order_id: i32,
        expected_version: i64,
        update: &OrderStatusUpdate,
    ) -> Result<OrderModel, RepositoryError> {
        let mut table = self.table.write();
        let order = table.versioned(order_id, expected_version)?;

        order.status = update.status.as_str().to_string();
        order.reservation_id = update.reservation_id;
        order.payment_key = update.payment_key;
        order.payment_id = update.payment_id.clone();
        order.pending_event = update.pending.map(|event| event.as_str().to_string());
        order.version += 1;
        order.updated_at = Utc::now();

        Ok(order.clone())
    }

    async fn delete_order(
        &self,
        order_id: i32,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let mut table = self.table.write();
        table.versioned(order_id, expected_version)?;
        table.orders.remove(&order_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;
    use uuid::Uuid;

    fn new_order(user_id: i32) -> NewOrder {
        NewOrder {
            user_id,
            lines: vec![OrderLine {
                product_id: 1,
                quantity: 2,
                unit_price: 500,
            }],
            reservation_id: Uuid::new_v4(),
            payment_key: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let repo = InMemoryOrderRepository::new();
        let order = repo.create_order(&new_order(3)).await.unwrap();

        let update = OrderStatusUpdate {
            status: OrderStatus::Cancelled,
            reservation_id: order.reservation_id,
            payment_key: order.payment_key,
            payment_id: None,
            pending: None,
        };

        let cancelled = repo
            .update_status(order.order_id, order.version, &update)
            .await
            .unwrap();
        assert_eq!(cancelled.version, 2);
        assert_eq!(cancelled.status, "cancelled");

        let err = repo
            .update_status(order.order_id, order.version, &update)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err = repo.delete_order(order.order_id, 1).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        repo.delete_order(order.order_id, 2).await.unwrap();
        let err = repo.delete_order(order.order_id, 2).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn lists_newest_first_and_filters_by_status() {
        let repo = InMemoryOrderRepository::new();
        for user_id in 1..=3 {
            repo.create_order(&new_order(user_id)).await.unwrap();
        }

        let first = repo.find_by_id(1).await.unwrap().unwrap();
        repo.update_status(
            1,
            first.version,
            &OrderStatusUpdate {
                status: OrderStatus::Cancelled,
                reservation_id: first.reservation_id,
                payment_key: first.payment_key,
                payment_id: None,
                pending: None,
            },
        )
        .await
        .unwrap();

        let (all, total) = repo.find_all(&FindAllRequest::default()).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(
            all.iter().map(|o| o.order_id).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );

        let (cancelled, total) = repo
            .find_all(&FindAllRequest {
                search: "cancel".into(),
                ..FindAllRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(cancelled[0].order_id, 1);
    }
}
