use crate::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use serde_with::{formats::PreferOne, serde_as, OneOrMany};

/// Optional search criteria. Every field is independent; an empty value set means "match all".
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterParams {
    pub q: Option<String>,
    #[serde_as(as = "Option<OneOrMany<_, PreferOne>>")]
    pub brand: Option<Vec<String>>,
    #[serde_as(as = "Option<OneOrMany<_, PreferOne>>")]
    pub category: Option<Vec<String>>,
    pub price_gte: Option<f64>,
    pub price_lte: Option<f64>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl FilterParams {
    /// Folds decoded query-string pairs into params. Repeated `brand`/`category` keys (with or
    /// without a `[]` suffix) accumulate; other repeated keys keep the last value. Empty values
    /// and unknown keys are skipped.
    pub fn from_query_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = FilterParams::default();

        for (key, value) in pairs {
            let value = value.as_ref();
            if value.is_empty() {
                continue;
            }

            match key.as_ref().trim_end_matches("[]") {
                "q" => params.q = Some(value.to_string()),
                "brand" => params
                    .brand
                    .get_or_insert_with(Vec::new)
                    .push(value.to_string()),
                "category" => params
                    .category
                    .get_or_insert_with(Vec::new)
                    .push(value.to_string()),
                "price_gte" => params.price_gte = Some(parse_price("price_gte", value)?),
                "price_lte" => params.price_lte = Some(parse_price("price_lte", value)?),
                "page" => params.page = Some(parse_count("page", value)?),
                "limit" => params.limit = Some(parse_count("limit", value)?),
                _ => {}
            }
        }

        Ok(params)
    }

    /// Trimmed, lowercased text query. Only an empty `q` counts as absent; whitespace-only
    /// text normalizes to `""` and still filters.
    pub fn normalized_text(&self) -> Option<String> {
        self.q
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(|q| q.trim().to_lowercase())
    }
}

fn parse_price(field: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ServiceError::InvalidRequest(format!("{field} must be a number")))
}

fn parse_count(field: &str, raw: &str) -> Result<u32> {
    raw.trim().parse::<u32>().map_err(|_| {
        ServiceError::InvalidRequest(format!("{field} must be a non-negative integer"))
    })
}
