//! Product detail and write path: brand/category names are resolved to ids before writing, and
//! the store records creations and deletions in the action log alongside the write.

use crate::{
    error::{Result, ServiceError},
    models::{NewProduct, Product, ProductId, ProductInput},
    store::ProductStore,
};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ProductStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    pub async fn product(&self, id: ProductId) -> Result<Product> {
        self.store
            .product_by_id(id)
            .await
            .map_err(|err| ServiceError::internal("product lookup failed", err))?
            .ok_or_else(|| ServiceError::NotFound(format!("product {id}")))
    }

    pub async fn create(&self, user_id: i64, input: ProductInput) -> Result<Product> {
        let (new, brand, category) = self.resolve(input).await?;
        let row = self
            .store
            .insert_product(new, user_id)
            .await
            .map_err(|err| ServiceError::internal("product insert failed", err))?;

        info!(product_id = row.id, user_id, "product created");
        Ok(row.with_names(brand, category))
    }

    pub async fn update(&self, id: ProductId, input: ProductInput) -> Result<Product> {
        let (changes, brand, category) = self.resolve(input).await?;
        let row = self
            .store
            .update_product(id, changes)
            .await
            .map_err(|err| ServiceError::internal("product update failed", err))?
            .ok_or_else(|| ServiceError::NotFound(format!("product {id}")))?;

        Ok(row.with_names(brand, category))
    }

    /// Deletes the product and returns the removed row with brand and category names.
    pub async fn delete(&self, id: ProductId, user_id: i64) -> Result<Product> {
        let existing = self.product(id).await?;
        let row = self
            .store
            .delete_product(id, user_id)
            .await
            .map_err(|err| ServiceError::internal("product delete failed", err))?
            .ok_or_else(|| ServiceError::NotFound(format!("product {id}")))?;

        info!(product_id = row.id, user_id, "product deleted");
        Ok(row.with_names(existing.brand, existing.category))
    }

    async fn resolve(&self, input: ProductInput) -> Result<(NewProduct, String, String)> {
        let brand_id = self
            .store
            .brand_id_by_name(&input.brand)
            .await
            .map_err(|err| ServiceError::internal("brand lookup failed", err))?
            .ok_or_else(|| {
                ServiceError::InvalidRequest(format!("unknown brand '{}'", input.brand))
            })?;
        let category_id = self
            .store
            .category_id_by_name(&input.category)
            .await
            .map_err(|err| ServiceError::internal("category lookup failed", err))?
            .ok_or_else(|| {
                ServiceError::InvalidRequest(format!("unknown category '{}'", input.category))
            })?;

        let new = NewProduct {
            title: input.title,
            images: serde_json::json!(input.images),
            rating: input.rating,
            price: input.price,
            brand_id,
            category_id,
        };
        Ok((new, input.brand, input.category))
    }
}
