use crate::{
    catalog::CatalogService,
    config::AppConfig,
    customs::CustomOrderService,
    search::ProductSearchService,
    store::{CustomOrderStore, ProductStore},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub search: ProductSearchService,
    pub catalog: CatalogService,
    pub customs: CustomOrderService,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        products: Arc<dyn ProductStore>,
        orders: Arc<dyn CustomOrderStore>,
    ) -> Self {
        Self {
            config,
            search: ProductSearchService::new(Arc::clone(&products)),
            catalog: CatalogService::new(Arc::clone(&products)),
            customs: CustomOrderService::new(products, orders),
        }
    }
}
