//! Row and payload models for the catalog tables.

use chrono::{DateTime, Utc};
use diesel::deserialize::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Float8, Int8, Jsonb, Text};
use serde::{Deserialize, Serialize};
use std::{fmt, num::ParseIntError, str::FromStr};

/// Product identifier. Parses from either a JSON number or a numeric string so that `"3"` and
/// `3` name the same product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl FromStr for ProductId {
    type Err = ParseIntError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.trim().parse::<i64>().map(ProductId)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        ProductId(value)
    }
}

/// Catalog row as returned by search and detail lookups, with brand and category resolved to
/// their names.
#[derive(Debug, Clone, PartialEq, QueryableByName, Serialize, Deserialize)]
pub struct Product {
    #[diesel(sql_type = Int8)]
    pub id: i64,
    #[diesel(sql_type = Text)]
    pub title: String,
    #[diesel(sql_type = Jsonb)]
    pub images: serde_json::Value,
    #[diesel(sql_type = Float8)]
    pub rating: f64,
    #[diesel(sql_type = Float8)]
    pub price: f64,
    #[diesel(sql_type = Text)]
    pub brand: String,
    #[diesel(sql_type = Text)]
    pub category: String,
}

#[derive(Debug, QueryableByName)]
pub struct CountRow {
    #[diesel(sql_type = Int8)]
    pub total_count: i64,
}

/// Raw `product` table row.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = crate::schema::product)]
pub struct ProductRow {
    pub id: i64,
    pub title: String,
    pub images: serde_json::Value,
    pub rating: f64,
    pub price: f64,
    pub brand_id: i64,
    pub category_id: i64,
}

impl ProductRow {
    pub fn with_names(self, brand: String, category: String) -> Product {
        Product {
            id: self.id,
            title: self.title,
            images: self.images,
            rating: self.rating,
            price: self.price,
            brand,
            category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::product)]
pub struct NewProduct {
    pub title: String,
    pub images: serde_json::Value,
    pub rating: f64,
    pub price: f64,
    pub brand_id: i64,
    pub category_id: i64,
}

/// Create/update payload. Brand and category arrive by name and are resolved to ids before
/// the row is written.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProductInput {
    pub title: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    pub price: f64,
    pub brand: String,
    pub category: String,
}

/// Price of a single product as fetched for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRecord {
    pub id: ProductId,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::custom_order)]
#[serde(rename_all = "camelCase")]
pub struct CustomOrder {
    pub id: i64,
    pub user_id: i64,
    pub product_ids: Vec<i64>,
    pub address: String,
    pub city: String,
    pub status: String,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = crate::schema::custom_order)]
pub struct NewCustomOrder {
    pub user_id: i64,
    pub product_ids: Vec<i64>,
    pub address: String,
    pub city: String,
    pub status: String,
    pub total_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogAction {
    Add,
    Remove,
}

impl LogAction {
    pub fn as_str(self) -> &'static str {
        match self {
            LogAction::Add => "add",
            LogAction::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = crate::schema::action_log)]
pub struct NewActionLog {
    pub action: String,
    pub user_id: i64,
    pub product_title: String,
}

impl NewActionLog {
    pub fn new(action: LogAction, user_id: i64, product_title: impl Into<String>) -> Self {
        Self {
            action: action.as_str().to_string(),
            user_id,
            product_title: product_title.into(),
        }
    }
}
