use crate::{
    abstract_trait::{ProductCommandRepositoryTrait, ProductQueryRepositoryTrait},
    model::Product as ProductModel,
};
use async_trait::async_trait;
use shared::{
    config::ConnectionPool,
    domain::requests::{CreateProductRequest, FindAllRequest, UpdateProductRequest},
    errors::RepositoryError,
};
use sqlx::FromRow;
use tracing::{error, info};

pub(crate) const PRODUCT_COLUMNS: &str =
    "product_id, name, description, price, stock, version, created_at, updated_at";

#[derive(FromRow)]
struct ProductPageRow {
    #[sqlx(flatten)]
    product: ProductModel,
    total_count: i64,
}

#[derive(Clone)]
pub struct ProductQueryRepository {
    db: ConnectionPool,
}

impl ProductQueryRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductQueryRepositoryTrait for ProductQueryRepository {
    async fn find_all(
        &self,
        req: &FindAllRequest,
    ) -> Result<(Vec<ProductModel>, i64), RepositoryError> {
        info!("🔍 Fetching products with search: {:?}", req.search);

        let limit = req.page_size as i64;
        let offset = ((req.page - 1).max(0) * req.page_size) as i64;

        let search_pattern = if req.search.trim().is_empty() {
            None
        } else {
            Some(req.search.trim())
        };

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}, COUNT(*) OVER() AS total_count
            FROM products
            WHERE ($1::TEXT IS NULL OR name ILIKE '%' || $1 || '%')
            ORDER BY product_id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query_as::<_, ProductPageRow>(&sql)
            .bind(search_pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch products: {:?}", e);
                RepositoryError::from_sqlx(e)
            })?;

        let total = rows.first().map(|r| r.total_count).unwrap_or(0);
        let products = rows.into_iter().map(|r| r.product).collect();

        Ok((products, total))
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<ProductModel>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1");

        sqlx::query_as::<_, ProductModel>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to fetch product {id}: {:?}", e);
                RepositoryError::from_sqlx(e)
            })
    }
}

#[derive(Clone)]
pub struct ProductCommandRepository {
    db: ConnectionPool,
}

impl ProductCommandRepository {
    pub fn new(db: ConnectionPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductCommandRepositoryTrait for ProductCommandRepository {
    async fn create_product(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ProductModel, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO products (name, description, price, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let product = sqlx::query_as::<_, ProductModel>(&sql)
            .bind(&req.name)
            .bind(&req.description)
            .bind(req.price)
            .bind(req.stock)
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to create product {}: {:?}", req.name, e);
                RepositoryError::from_sqlx(e)
            })?;

        info!("✅ Created product id={}", product.product_id);
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: i32,
        expected_version: i64,
        req: &UpdateProductRequest,
    ) -> Result<ProductModel, RepositoryError> {
        let sql = format!(
            r#"
            UPDATE products
            SET name = $3, description = $4, price = $5, stock = $6,
                version = version + 1, updated_at = now()
            WHERE product_id = $1 AND version = $2
            RETURNING {PRODUCT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, ProductModel>(&sql)
            .bind(product_id)
            .bind(expected_version)
            .bind(&req.name)
            .bind(&req.description)
            .bind(req.price)
            .bind(req.stock)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to update product {product_id}: {:?}", e);
                RepositoryError::from_sqlx(e)
            })?;

        if let Some(product) = updated {
            return Ok(product);
        }

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT product_id FROM products WHERE product_id = $1")
                .bind(product_id)
                .fetch_optional(&self.db)
                .await
                .map_err(RepositoryError::from_sqlx)?;

        match exists {
            Some(_) => Err(RepositoryError::Conflict(format!(
                "product {product_id} changed since version {expected_version}"
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete_product(&self, product_id: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!("❌ Failed to delete product {product_id}: {:?}", e);
                RepositoryError::from_sqlx(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        info!("🗑️ Deleted product id={product_id}");
        Ok(())
    }
}
