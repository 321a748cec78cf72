use crate::{
    error::{Result, ServiceError},
    models::{CustomOrder, NewCustomOrder, ProductId},
    pricing::total_price,
    store::{CustomOrderStore, ProductStore},
};
use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::sync::Arc;
use tracing::info;

pub const INITIAL_STATUS: &str = "created";

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomOrderRequest {
    #[serde_as(as = "Vec<PickFirst<(_, DisplayFromStr)>>")]
    pub product_ids: Vec<ProductId>,
    pub address: String,
    pub city: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Clone)]
pub struct CustomOrderService {
    products: Arc<dyn ProductStore>,
    orders: Arc<dyn CustomOrderStore>,
}

impl CustomOrderService {
    pub fn new(products: Arc<dyn ProductStore>, orders: Arc<dyn CustomOrderStore>) -> Self {
        Self { products, orders }
    }

    pub async fn create(
        &self,
        user_id: i64,
        request: NewCustomOrderRequest,
    ) -> Result<CustomOrder> {
        let records = if request.product_ids.is_empty() {
            Vec::new()
        } else {
            self.products
                .prices_for(&request.product_ids)
                .await
                .map_err(|err| ServiceError::internal("price lookup failed", err))?
        };
        let total = total_price(&request.product_ids, &records);

        let order = self
            .orders
            .insert_custom_order(NewCustomOrder {
                user_id,
                product_ids: request.product_ids.iter().map(|id| id.0).collect(),
                address: request.address,
                city: request.city,
                status: INITIAL_STATUS.to_string(),
                total_price: total,
            })
            .await
            .map_err(|err| ServiceError::internal("custom order insert failed", err))?;

        info!(order_id = order.id, user_id, total_price = total, "custom order created");
        Ok(order)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<CustomOrder>> {
        self.orders
            .custom_orders_for_user(user_id)
            .await
            .map_err(|err| ServiceError::internal("custom order listing failed", err))
    }

    /// Status is free-form; no transition rules are enforced.
    pub async fn update_status(&self, id: i64, status: &str) -> Result<CustomOrder> {
        self.orders
            .update_custom_status(id, status)
            .await
            .map_err(|err| ServiceError::internal("custom order status update failed", err))?
            .ok_or_else(|| ServiceError::NotFound(format!("custom order {id}")))
    }
}
