use crate::{
    abstract_trait::StockRepositoryTrait,
    model::{ReserveOutcome, StockReservation},
};
use async_trait::async_trait;
use shared::{
    config::ConnectionPool,
    domain::requests::{ReserveStockRequest, StockLine},
    errors::RepositoryError,
};
use sqlx::types::Json;
use tracing::{error, info, warn};
use uuid::Uuid;

const RESERVATION_COLUMNS: &str = "reservation_id, lines, released, created_at";

#[derive(Clone)]
pub struct StockRepository {
    db: ConnectionPool,
}

impl StockRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }

    async fn find_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<StockReservation>, RepositoryError> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM stock_reservations WHERE reservation_id = $1"
        );

        sqlx::query_as::<_, StockReservation>(&sql)
            .bind(reservation_id)
            .fetch_optional(&self.db)
            .await
            .map_err(RepositoryError::from_sqlx)
    }
}

#[async_trait]
impl StockRepositoryTrait for StockRepository {
    async fn reserve_stock(
        &self,
        req: &ReserveStockRequest,
    ) -> Result<ReserveOutcome, RepositoryError> {
        if let Some(existing) = self.find_reservation(req.reservation_id).await? {
            info!("🔁 Reservation {} already recorded", req.reservation_id);
            return Ok(ReserveOutcome::AlreadyReserved(existing));
        }

        // rows are locked in product id order so concurrent reservations cannot deadlock
        let mut lines: Vec<StockLine> = req.lines.clone();
        lines.sort_by_key(|line| line.product_id);

        let mut tx = self.db.begin().await.map_err(RepositoryError::from_sqlx)?;

        for line in &lines {
            let debited: Option<i32> = sqlx::query_scalar(
                r#"
                UPDATE products
                SET stock = stock - $2, version = version + 1, updated_at = now()
                WHERE product_id = $1 AND stock >= $2
                RETURNING product_id
                "#,
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                error!("❌ Failed to debit product {}: {:?}", line.product_id, e);
                RepositoryError::from_sqlx(e)
            })?;

            if debited.is_some() {
                continue;
            }

            let available: Option<i32> =
                sqlx::query_scalar("SELECT stock FROM products WHERE product_id = $1")
                    .bind(line.product_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(RepositoryError::from_sqlx)?;

            tx.rollback().await.map_err(RepositoryError::from_sqlx)?;

            return Ok(match available {
                Some(available) => ReserveOutcome::Insufficient {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available,
                },
                None => ReserveOutcome::UnknownProduct(line.product_id),
            });
        }

        let sql = format!(
            r#"
            INSERT INTO stock_reservations (reservation_id, lines, released)
            VALUES ($1, $2, FALSE)
            ON CONFLICT (reservation_id) DO NOTHING
            RETURNING {RESERVATION_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, StockReservation>(&sql)
            .bind(req.reservation_id)
            .bind(Json(&req.lines))
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        match inserted {
            Some(reservation) => {
                tx.commit().await.map_err(RepositoryError::from_sqlx)?;
                info!("📦 Reserved stock for {}", req.reservation_id);
                Ok(ReserveOutcome::Reserved(reservation))
            }
            None => {
                warn!(
                    "Reservation {} was recorded concurrently, undoing this debit",
                    req.reservation_id
                );
                tx.rollback().await.map_err(RepositoryError::from_sqlx)?;

                self.find_reservation(req.reservation_id)
                    .await?
                    .map(ReserveOutcome::AlreadyReserved)
                    .ok_or_else(|| {
                        RepositoryError::Custom(format!(
                            "reservation {} vanished during insert",
                            req.reservation_id
                        ))
                    })
            }
        }
    }

    async fn release_stock(&self, reservation_id: Uuid) -> Result<bool, RepositoryError> {
        let mut tx = self.db.begin().await.map_err(RepositoryError::from_sqlx)?;

        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM stock_reservations WHERE reservation_id = $1 FOR UPDATE"
        );

        let reservation = sqlx::query_as::<_, StockReservation>(&sql)
            .bind(reservation_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        let Some(reservation) = reservation.filter(|r| !r.released) else {
            tx.rollback().await.map_err(RepositoryError::from_sqlx)?;
            return Ok(false);
        };

        let mut lines = reservation.lines.0.clone();
        lines.sort_by_key(|line| line.product_id);

        for line in &lines {
            // a product deleted since the reservation has nothing to restock
            sqlx::query(
                r#"
                UPDATE products
                SET stock = stock + $2, version = version + 1, updated_at = now()
                WHERE product_id = $1
                "#,
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        }

        sqlx::query("UPDATE stock_reservations SET released = TRUE WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from_sqlx)?;

        tx.commit().await.map_err(RepositoryError::from_sqlx)?;

        info!("↩️ Released stock for {reservation_id}");
        Ok(true)
    }
}
