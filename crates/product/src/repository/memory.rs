use crate::{
    abstract_trait::{
        ProductCommandRepositoryTrait, ProductQueryRepositoryTrait, StockRepositoryTrait,
    },
    model::{Product as ProductModel, ReserveOutcome, StockReservation},
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use shared::{
    domain::requests::{
        CreateProductRequest, FindAllRequest, ReserveStockRequest, UpdateProductRequest,
    },
    errors::RepositoryError,
};
use sqlx::types::Json;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Default)]
struct ProductTable {
    last_id: i32,
    products: BTreeMap<i32, ProductModel>,
    reservations: HashMap<Uuid, StockReservation>,
}

/// Process-local product and reservation store. One lock covers both tables
/// so a reservation debits all of its lines or none.
#[derive(Default)]
pub struct InMemoryProductRepository {
    table: RwLock<ProductTable>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductQueryRepositoryTrait for InMemoryProductRepository {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<(Vec<ProductModel>, i64), RepositoryError> {
        let table = self.table.read();
        let needle = req.search.trim().to_lowercase();

        let matching: Vec<&ProductModel> = table
            .products
            .values()
            .rev()
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
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

    async fn find_by_id(&self, id: i32) -> Result<Option<ProductModel>, RepositoryError> {
        Ok(self.table.read().products.get(&id).cloned())
    }
}

#[async_trait]
impl ProductCommandRepositoryTrait for InMemoryProductRepository {
    async fn create_product(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ProductModel, RepositoryError> {
        let mut table = self.table.write();

        table.last_id += 1;
        let now = Utc::now();
        let product = ProductModel {
            product_id: table.last_id,
            name: req.name.clone(),
            description: req.description.clone(),
            price: req.price,
            stock: req.stock,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        table.products.insert(product.product_id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: i32,
        expected_version: i64,
        req: &UpdateProductRequest,
    ) -> Result<ProductModel, RepositoryError> {
        let mut table = self.table.write();

        let product = table
            .products
            .get_mut(&product_id)
            .ok_or(RepositoryError::NotFound)?;

        if product.version != expected_version {
            return Err(RepositoryError::Conflict(format!(
                "product {product_id} changed since version {expected_version}"
            )));
        }

        product.name = req.name.clone();
        product.description = req.description.clone();
        product.price = req.price;
        product.stock = req.stock;
        product.version += 1;
        product.updated_at = Utc::now();

        Ok(product.clone())
    }

    async fn delete_product(&self, product_id: i32) -> Result<(), RepositoryError> {
        self.table
            .write()
            .products
            .remove(&product_id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl StockRepositoryTrait for InMemoryProductRepository {
    async fn reserve_stock(
        &self,
        req: &ReserveStockRequest,
    ) -> Result<ReserveOutcome, RepositoryError> {
        let mut table = self.table.write();

        if let Some(existing) = table.reservations.get(&req.reservation_id) {
            return Ok(ReserveOutcome::AlreadyReserved(existing.clone()));
        }

        let mut requested: HashMap<i32, i32> = HashMap::new();
        for line in &req.lines {
            let total = requested.entry(line.product_id).or_default();
            *total += line.quantity;

            match table.products.get(&line.product_id) {
                None => return Ok(ReserveOutcome::UnknownProduct(line.product_id)),
                Some(product) if product.stock < *total => {
                    return Ok(ReserveOutcome::Insufficient {
                        product_id: line.product_id,
                        requested: *total,
                        available: product.stock,
                    });
                }
                Some(_) => {}
            }
        }

        let now = Utc::now();
        for line in &req.lines {
            if let Some(product) = table.products.get_mut(&line.product_id) {
                product.stock -= line.quantity;
                product.version += 1;
                product.updated_at = now;
            }
        }

        let reservation = StockReservation {
            reservation_id: req.reservation_id,
            lines: Json(req.lines.clone()),
            released: false,
            created_at: now,
        };
        table
            .reservations
            .insert(req.reservation_id, reservation.clone());

        Ok(ReserveOutcome::Reserved(reservation))
    }

    async fn release_stock(&self, reservation_id: Uuid) -> Result<bool, RepositoryError> {
        let mut table = self.table.write();
        let ProductTable {
            products,
            reservations,
            ..
        } = &mut *table;

        let Some(reservation) = reservations
            .get_mut(&reservation_id)
            .filter(|r| !r.released)
        else {
            return Ok(false);
        };

        let now = Utc::now();
        for line in reservation.lines.iter() {
            if let Some(product) = products.get_mut(&line.product_id) {
                product.stock += line.quantity;
                product.version += 1;
                product.updated_at = now;
            }
        }
        reservation.released = true;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::requests::StockLine;

    async fn seeded(stocks: &[i32]) -> InMemoryProductRepository {
        let repo = InMemoryProductRepository::new();
        for (i, stock) in stocks.iter().enumerate() {
            repo.create_product(&CreateProductRequest {
                name: format!("item-{i}"),
                description: String::new(),
                price: 1_000,
                stock: *stock,
            })
            .await
            .unwrap();
        }
        repo
    }

    fn reserve(id: Uuid, lines: &[(i32, i32)]) -> ReserveStockRequest {
        ReserveStockRequest {
            reservation_id: id,
            lines: lines
                .iter()
                .map(|&(product_id, quantity)| StockLine {
                    product_id,
                    quantity,
                })
                .collect(),
        }
    }

    async fn stock_of(repo: &InMemoryProductRepository, id: i32) -> i32 {
        repo.find_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn shortfall_on_one_line_debits_nothing() {
        let repo = seeded(&[5, 1]).await;

        let outcome = repo
            .reserve_stock(&reserve(Uuid::new_v4(), &[(1, 2), (2, 3)]))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ReserveOutcome::Insufficient {
                product_id: 2,
                requested: 3,
                available: 1
            }
        ));
        assert_eq!(stock_of(&repo, 1).await, 5);
        assert_eq!(stock_of(&repo, 2).await, 1);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let repo = seeded(&[5]).await;
        let id = Uuid::new_v4();

        repo.reserve_stock(&reserve(id, &[(1, 4)])).await.unwrap();
        assert_eq!(stock_of(&repo, 1).await, 1);

        assert!(repo.release_stock(id).await.unwrap());
        assert!(!repo.release_stock(id).await.unwrap());
        assert!(!repo.release_stock(Uuid::new_v4()).await.unwrap());
        assert_eq!(stock_of(&repo, 1).await, 5);
    }
}
