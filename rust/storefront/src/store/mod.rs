//! Storage boundary. Services hold these as trait objects so tests can swap in an in-memory
//! implementation.

mod postgres;

pub use postgres::PgStore;

use crate::{
    models::{
        CustomOrder, NewCustomOrder, NewProduct, PriceRecord, Product, ProductId, ProductRow,
    },
    query::BindValue,
};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Runs a rendered product select. `$n` placeholders in `sql` bind `binds[n - 1]`.
    async fn query_products(&self, sql: &str, binds: &[BindValue]) -> Result<Vec<Product>>;

    /// Runs a rendered count statement returning a single `total_count` column.
    async fn query_count(&self, sql: &str, binds: &[BindValue]) -> Result<i64>;

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>>;

    /// Prices for the given ids. Each stored id appears at most once regardless of how often it
    /// was requested.
    async fn prices_for(&self, ids: &[ProductId]) -> Result<Vec<PriceRecord>>;

    async fn brand_id_by_name(&self, name: &str) -> Result<Option<i64>>;

    async fn category_id_by_name(&self, name: &str) -> Result<Option<i64>>;

    /// Inserts the product and its `add` action-log row in one transaction.
    async fn insert_product(&self, product: NewProduct, user_id: i64) -> Result<ProductRow>;

    async fn update_product(&self, id: ProductId, product: NewProduct)
        -> Result<Option<ProductRow>>;

    /// Deletes the product and writes its `remove` action-log row in one transaction. A missing
    /// product logs nothing.
    async fn delete_product(&self, id: ProductId, user_id: i64) -> Result<Option<ProductRow>>;
}

#[async_trait]
pub trait CustomOrderStore: Send + Sync {
    async fn insert_custom_order(&self, order: NewCustomOrder) -> Result<CustomOrder>;

    async fn custom_orders_for_user(&self, user_id: i64) -> Result<Vec<CustomOrder>>;

    async fn update_custom_status(&self, id: i64, status: &str) -> Result<Option<CustomOrder>>;
}
