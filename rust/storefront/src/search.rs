use crate::{
    error::{Result, ServiceError},
    models::Product,
    query::{build_query_plan, FilterParams},
    store::ProductStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub rows: Vec<Product>,
    /// Size of the full matching set, independent of the page window.
    pub total_count: i64,
}

#[derive(Clone)]
pub struct ProductSearchService {
    store: Arc<dyn ProductStore>,
}

impl ProductSearchService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    pub async fn search(&self, params: &FilterParams) -> Result<ProductPage> {
        let plan = build_query_plan(params);
        let data_sql = plan.data_sql();
        let count_sql = plan.count_sql();
        debug!(sql = %data_sql, binds = plan.binds.len(), "running product search");

        let (rows, total_count) = tokio::try_join!(
            self.store.query_products(&data_sql, &plan.binds),
            self.store.query_count(&count_sql, &plan.binds),
        )
        .map_err(|err| ServiceError::internal("product search failed", err))?;

        Ok(ProductPage { rows, total_count })
    }
}
