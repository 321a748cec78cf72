use super::{CustomOrderStore, ProductStore};
use crate::{
    db::{self, PgPool},
    models::{
        CountRow, CustomOrder, LogAction, NewActionLog, NewCustomOrder, NewProduct, PriceRecord,
        Product, ProductId, ProductRow,
    },
    query::{self, BindValue},
    schema::{action_log, brand, category, custom_order, product},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::Int8;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

/// PostgreSQL-backed store. Every call checks out its own pooled connection, so independent
/// calls can run concurrently.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bound_query(
    sql: &str,
    binds: &[BindValue],
) -> diesel::query_builder::BoxedSqlQuery<'static, Pg, diesel::query_builder::SqlQuery> {
    let mut query = sql_query(sql).into_boxed::<Pg>();
    for bind in binds {
        query = bind.apply(query);
    }
    query
}

#[async_trait]
impl ProductStore for PgStore {
    async fn query_products(&self, sql: &str, binds: &[BindValue]) -> Result<Vec<Product>> {
        let mut conn = db::checkout(&self.pool).await?;
        let rows: Vec<Product> = bound_query(sql, binds)
            .load(&mut *conn)
            .await
            .context("product query failed")?;
        Ok(rows)
    }

    async fn query_count(&self, sql: &str, binds: &[BindValue]) -> Result<i64> {
        let mut conn = db::checkout(&self.pool).await?;
        let row: CountRow = bound_query(sql, binds)
            .get_result(&mut *conn)
            .await
            .context("product count query failed")?;
        Ok(row.total_count)
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        let mut conn = db::checkout(&self.pool).await?;
        let row: Option<Product> = sql_query(query::product_by_id_sql())
            .bind::<Int8, _>(id.0)
            .get_result(&mut *conn)
            .await
            .optional()
            .with_context(|| format!("failed to load product {id}"))?;
        Ok(row)
    }

    async fn prices_for(&self, ids: &[ProductId]) -> Result<Vec<PriceRecord>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let mut conn = db::checkout(&self.pool).await?;
        let rows: Vec<(i64, f64)> = product::table
            .filter(product::id.eq_any(raw))
            .select((product::id, product::price))
            .load(&mut *conn)
            .await
            .context("failed to load product prices")?;

        Ok(rows
            .into_iter()
            .map(|(id, price)| PriceRecord {
                id: ProductId(id),
                price,
            })
            .collect())
    }

    async fn brand_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let mut conn = db::checkout(&self.pool).await?;
        let id: Option<i64> = brand::table
            .filter(brand::name.eq(name))
            .select(brand::id)
            .first(&mut *conn)
            .await
            .optional()
            .with_context(|| format!("failed to resolve brand '{name}'"))?;
        Ok(id)
    }

    async fn category_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let mut conn = db::checkout(&self.pool).await?;
        let id: Option<i64> = category::table
            .filter(category::name.eq(name))
            .select(category::id)
            .first(&mut *conn)
            .await
            .optional()
            .with_context(|| format!("failed to resolve category '{name}'"))?;
        Ok(id)
    }

    async fn insert_product(&self, new: NewProduct, user_id: i64) -> Result<ProductRow> {
        let mut conn = db::checkout(&self.pool).await?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let row: ProductRow = diesel::insert_into(product::table)
                    .values(&new)
                    .returning(ProductRow::as_returning())
                    .get_result(conn)
                    .await?;
                diesel::insert_into(action_log::table)
                    .values(&NewActionLog::new(LogAction::Add, user_id, row.title.clone()))
                    .execute(conn)
                    .await?;
                Ok(row)
            }
            .scope_boxed()
        })
        .await
        .context("failed to insert product")
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: NewProduct,
    ) -> Result<Option<ProductRow>> {
        let mut conn = db::checkout(&self.pool).await?;
        diesel::update(product::table.find(id.0))
            .set(&changes)
            .returning(ProductRow::as_returning())
            .get_result(&mut *conn)
            .await
            .optional()
            .with_context(|| format!("failed to update product {id}"))
    }

    async fn delete_product(&self, id: ProductId, user_id: i64) -> Result<Option<ProductRow>> {
        let mut conn = db::checkout(&self.pool).await?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let removed: Option<ProductRow> = diesel::delete(product::table.find(id.0))
                    .returning(ProductRow::as_returning())
                    .get_result(conn)
                    .await
                    .optional()?;
                if let Some(row) = &removed {
                    diesel::insert_into(action_log::table)
                        .values(&NewActionLog::new(LogAction::Remove, user_id, row.title.clone()))
                        .execute(conn)
                        .await?;
                }
                Ok(removed)
            }
            .scope_boxed()
        })
        .await
        .with_context(|| format!("failed to delete product {id}"))
    }
}

#[async_trait]
impl CustomOrderStore for PgStore {
    async fn insert_custom_order(&self, order: NewCustomOrder) -> Result<CustomOrder> {
        let mut conn = db::checkout(&self.pool).await?;
        diesel::insert_into(custom_order::table)
            .values(&order)
            .returning(CustomOrder::as_returning())
            .get_result(&mut *conn)
            .await
            .context("failed to insert custom order")
    }

    async fn custom_orders_for_user(&self, user_id: i64) -> Result<Vec<CustomOrder>> {
        let mut conn = db::checkout(&self.pool).await?;
        custom_order::table
            .filter(custom_order::user_id.eq(user_id))
            .order((custom_order::created_at.desc(), custom_order::id.desc()))
            .select(CustomOrder::as_select())
            .load(&mut *conn)
            .await
            .with_context(|| format!("failed to list custom orders for user {user_id}"))
    }

    async fn update_custom_status(&self, id: i64, status: &str) -> Result<Option<CustomOrder>> {
        let mut conn = db::checkout(&self.pool).await?;
        diesel::update(custom_order::table.find(id))
            .set(custom_order::status.eq(status))
            .returning(CustomOrder::as_returning())
            .get_result(&mut *conn)
            .await
            .optional()
            .with_context(|| format!("failed to update custom order {id}"))
    }
}
