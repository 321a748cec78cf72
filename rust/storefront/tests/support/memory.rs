use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};
use storefront::{
    models::{
        CustomOrder, LogAction, NewActionLog, NewCustomOrder, NewProduct, PriceRecord, Product,
        ProductId, ProductRow,
    },
    query::BindValue,
    store::{CustomOrderStore, ProductStore},
};
use tokio::sync::Barrier;

/// Statement handed to the store, as rendered by the planner.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

#[derive(Default)]
struct Inner {
    brands: Vec<(i64, String)>,
    categories: Vec<(i64, String)>,
    products: Vec<ProductRow>,
    orders: Vec<CustomOrder>,
    actions: Vec<NewActionLog>,
    data_queries: Vec<RecordedQuery>,
    count_queries: Vec<RecordedQuery>,
    price_requests: Vec<Vec<ProductId>>,
}

/// In-memory stand-in for the Postgres store. Search statements are recorded rather than
/// executed: `query_products` returns every stored product and `query_count` returns the
/// configured total.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    search_total: Arc<Mutex<i64>>,
    fail_count_query: bool,
    fail_action_log: bool,
    rendezvous: Option<Arc<Barrier>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes both search statements wait for each other, so a sequential caller deadlocks.
    pub fn with_rendezvous(mut self) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(2)));
        self
    }

    pub fn failing_count_query(mut self) -> Self {
        self.fail_count_query = true;
        self
    }

    /// Makes every action-log write fail, rolling back the product change it accompanies.
    pub fn failing_action_log(mut self) -> Self {
        self.fail_action_log = true;
        self
    }

    pub fn with_brand(self, id: i64, name: &str) -> Self {
        self.lock().brands.push((id, name.to_string()));
        self
    }

    pub fn with_category(self, id: i64, name: &str) -> Self {
        self.lock().categories.push((id, name.to_string()));
        self
    }

    pub fn with_product(
        self,
        id: i64,
        title: &str,
        price: f64,
        brand_id: i64,
        category_id: i64,
    ) -> Self {
        self.lock().products.push(ProductRow {
            id,
            title: title.to_string(),
            images: serde_json::json!([]),
            rating: 4.0,
            price,
            brand_id,
            category_id,
        });
        self
    }

    pub fn set_search_total(&self, total: i64) {
        *self.search_total.lock().expect("total lock") = total;
    }

    pub fn data_queries(&self) -> Vec<RecordedQuery> {
        self.lock().data_queries.clone()
    }

    pub fn count_queries(&self) -> Vec<RecordedQuery> {
        self.lock().count_queries.clone()
    }

    pub fn price_requests(&self) -> Vec<Vec<ProductId>> {
        self.lock().price_requests.clone()
    }

    pub fn actions(&self) -> Vec<NewActionLog> {
        self.lock().actions.clone()
    }

    pub fn orders(&self) -> Vec<CustomOrder> {
        self.lock().orders.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }

    async fn meet(&self) {
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
    }
}

impl Inner {
    fn name_of(entries: &[(i64, String)], id: i64) -> String {
        entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, name)| name.clone())
            .unwrap_or_default()
    }

    fn hydrate(&self, row: &ProductRow) -> Product {
        row.clone().with_names(
            Self::name_of(&self.brands, row.brand_id),
            Self::name_of(&self.categories, row.category_id),
        )
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn query_products(&self, sql: &str, binds: &[BindValue]) -> Result<Vec<Product>> {
        self.lock().data_queries.push(RecordedQuery {
            sql: sql.to_string(),
            binds: binds.to_vec(),
        });
        self.meet().await;
        let inner = self.lock();
        Ok(inner.products.iter().map(|row| inner.hydrate(row)).collect())
    }

    async fn query_count(&self, sql: &str, binds: &[BindValue]) -> Result<i64> {
        self.lock().count_queries.push(RecordedQuery {
            sql: sql.to_string(),
            binds: binds.to_vec(),
        });
        self.meet().await;
        if self.fail_count_query {
            return Err(anyhow!("relation \"product\" does not exist"));
        }
        Ok(*self.search_total.lock().expect("total lock"))
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>> {
        let inner = self.lock();
        Ok(inner
            .products
            .iter()
            .find(|row| row.id == id.0)
            .map(|row| inner.hydrate(row)))
    }

    async fn prices_for(&self, ids: &[ProductId]) -> Result<Vec<PriceRecord>> {
        let mut inner = self.lock();
        inner.price_requests.push(ids.to_vec());
        Ok(inner
            .products
            .iter()
            .filter(|row| ids.contains(&ProductId(row.id)))
            .map(|row| PriceRecord {
                id: ProductId(row.id),
                price: row.price,
            })
            .collect())
    }

    async fn brand_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .lock()
            .brands
            .iter()
            .find(|(_, brand)| brand == name)
            .map(|(id, _)| *id))
    }

    async fn category_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .lock()
            .categories
            .iter()
            .find(|(_, category)| category == name)
            .map(|(id, _)| *id))
    }

    async fn insert_product(&self, new: NewProduct, user_id: i64) -> Result<ProductRow> {
        if self.fail_action_log {
            return Err(anyhow!("relation \"action_log\" does not exist"));
        }
        let mut inner = self.lock();
        let id = inner.products.iter().map(|row| row.id).max().unwrap_or(0) + 1;
        let row = ProductRow {
            id,
            title: new.title,
            images: new.images,
            rating: new.rating,
            price: new.price,
            brand_id: new.brand_id,
            category_id: new.category_id,
        };
        inner.products.push(row.clone());
        inner
            .actions
            .push(NewActionLog::new(LogAction::Add, user_id, row.title.clone()));
        Ok(row)
    }

    async fn update_product(
        &self,
        id: ProductId,
        changes: NewProduct,
    ) -> Result<Option<ProductRow>> {
        let mut inner = self.lock();
        let Some(row) = inner.products.iter_mut().find(|row| row.id == id.0) else {
            return Ok(None);
        };
        row.title = changes.title;
        row.images = changes.images;
        row.rating = changes.rating;
        row.price = changes.price;
        row.brand_id = changes.brand_id;
        row.category_id = changes.category_id;
        Ok(Some(row.clone()))
    }

    async fn delete_product(&self, id: ProductId, user_id: i64) -> Result<Option<ProductRow>> {
        let mut inner = self.lock();
        let Some(index) = inner.products.iter().position(|row| row.id == id.0) else {
            return Ok(None);
        };
        if self.fail_action_log {
            return Err(anyhow!("relation \"action_log\" does not exist"));
        }
        let row = inner.products.remove(index);
        inner
            .actions
            .push(NewActionLog::new(LogAction::Remove, user_id, row.title.clone()));
        Ok(Some(row))
    }
}

#[async_trait]
impl CustomOrderStore for MemoryStore {
    async fn insert_custom_order(&self, order: NewCustomOrder) -> Result<CustomOrder> {
        let mut inner = self.lock();
        let id = inner.orders.len() as i64 + 1;
        let created = CustomOrder {
            id,
            user_id: order.user_id,
            product_ids: order.product_ids,
            address: order.address,
            city: order.city,
            status: order.status,
            total_price: order.total_price,
            created_at: Utc
                .timestamp_opt(1_700_000_000 + id, 0)
                .single()
                .expect("valid fixture timestamp"),
        };
        inner.orders.push(created.clone());
        Ok(created)
    }

    async fn custom_orders_for_user(&self, user_id: i64) -> Result<Vec<CustomOrder>> {
        let mut orders: Vec<CustomOrder> = self
            .lock()
            .orders
            .iter()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_custom_status(&self, id: i64, status: &str) -> Result<Option<CustomOrder>> {
        let mut inner = self.lock();
        Ok(inner.orders.iter_mut().find(|order| order.id == id).map(|order| {
            order.status = status.to_string();
            order.clone()
        }))
    }
}
