use crate::{
    abstract_trait::{OrderCommandRepositoryTrait, OrderQueryRepositoryTrait},
    model::{NewOrder, Order as OrderModel, OrderLine, OrderStatusUpdate},
};
use async_trait::async_trait;
use shared::{config::ConnectionPool, domain::requests::FindAllRequest, errors::RepositoryError};
use sqlx::{FromRow, types::Json};
use tracing::{error, info};

const ORDER_COLUMNS: &str = "order_id, user_id, lines, status, reservation_id, payment_key, \
                             payment_id, pending_event, version, created_at, updated_at";

#[derive(FromRow)]
struct OrderPageRow {
    #[sqlx(flatten)]
    order: OrderModel,
    total_count: i64,
}

#[derive(Clone)]
pub struct OrderQueryRepository {
    db: ConnectionPool,
}

impl OrderQueryRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderQueryRepositoryTrait for OrderQueryRepository {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<(Vec<OrderModel>, i64), RepositoryError> {
        info!("🔍 Fetching orders with search: {:?}", req.search);

        let limit = req.page_size as i64;
        let offset = ((req.page - 1).max(0) * req.page_size) as i64;

        let search_pattern = if req.search.trim().is_empty() {
            None
        } else {
            Some(req.search.trim())
        };

        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}, COUNT(*) OVER() AS total_count
            FROM orders
            WHERE ($1::TEXT IS NULL OR status ILIKE '%' || $1 || '%')
            ORDER BY order_id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query_as::<_, OrderPageRow>(&sql)
            .bind(search_pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch orders: {:?}", e);
                RepositoryError::from_sqlx(e)
            })?;

        let total = rows.first().map(|r| r.total_count).unwrap_or(0);
        let orders = rows.into_iter().map(|r| r.order).collect();

        Ok((orders, total))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<OrderModel>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1");

        sqlx::query_as::<_, OrderModel>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch order {id}: {:?}", e);
                RepositoryError::from_sqlx(e)
            })
    }
}

#[derive(Clone)]
pub struct OrderCommandRepository {
    db: ConnectionPool,
}

impl OrderCommandRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }

    /// Tells a lost version race apart from a missing row.
    async fn missing_or_conflict(
        &self,
        order_id: i32,
        expected_version: i64,
    ) -> RepositoryError {
        let exists = sqlx::query_scalar::<_, i32>("SELECT order_id FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.db)
            .await;

        match exists {
            Ok(Some(_)) => RepositoryError::Conflict(format!(
                "order {order_id} changed since version {expected_version}"
            )),
            Ok(None) => RepositoryError::NotFound,
            Err(e) => RepositoryError::from_sqlx(e),
        }
    }
}

#[async_trait]
impl OrderCommandRepositoryTrait for OrderCommandRepository {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderModel, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO orders (user_id, lines, status, reservation_id, payment_key)
            VALUES ($1, $2, 'created', $3, $4)
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, OrderModel>(&sql)
            .bind(order.user_id)
            .bind(Json(&order.lines))
            .bind(order.reservation_id)
            .bind(order.payment_key)
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to create order for user {}: {:?}", order.user_id, e);
                RepositoryError::from_sqlx(e)
            })?;

        info!("✅ Created order id={}", created.order_id);
        Ok(created)
    }

    async fn update_lines(
        &self,
        order_id: i32,
        expected_version: i64,
        lines: &[OrderLine],
    ) -> Result<OrderModel, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE orders
            SET lines = $3, version = version + 1, updated_at = now()
            WHERE order_id = $1 AND version = $2
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, OrderModel>(&sql)
            .bind(order_id)
            .bind(expected_version)
            .bind(Json(lines))
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to update order {order_id}: {:?}", e);
                RepositoryError::from_sqlx(e)
            })?;

        match updated {
            Some(order) => Ok(order),
            None => Err(self.missing_or_conflict(order_id, expected_version).await),
        }
    }

    async fn update_status(
        &self,
        order_id: i32,
        expected_version: i64,
        update: &OrderStatusUpdate,
    ) -> Result<OrderModel, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE orders
            SET status = $3, reservation_id = $4, payment_key = $5, payment_id = $6,
                pending_event = $7, version = version + 1, updated_at = now()
            WHERE order_id = $1 AND version = $2
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, OrderModel>(&sql)
            .bind(order_id)
            .bind(expected_version)
            .bind(update.status.as_str())
            .bind(update.reservation_id)
            .bind(update.payment_key)
            .bind(update.payment_id.as_deref())
            .bind(update.pending.map(|event| event.as_str()))
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to move order {order_id} to {}: {:?}", update.status, e);
                RepositoryError::from_sqlx(e)
            })?;

        match updated {
            Some(order) => {
                info!("🔄 Order {order_id} is now {}", update.status);
                Ok(order)
            }
            None => Err(self.missing_or_conflict(order_id, expected_version).await),
        }
    }

    async fn delete_order(
        &self,
        order_id: i32,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1 AND version = $2")
            .bind(order_id)
            .bind(expected_version)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to delete order {order_id}: {:?}", e);
                RepositoryError::from_sqlx(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_conflict(order_id, expected_version).await);
        }

        info!("🗑️ Deleted order id={order_id}");
        Ok(())
    }
}
