//! Price aggregation for custom orders.

use crate::models::{PriceRecord, ProductId};

/// Sums the price of every requested id. Repeated ids are charged once per occurrence; ids with
/// no matching record contribute nothing.
pub fn total_price(requested: &[ProductId], records: &[PriceRecord]) -> f64 {
    requested
        .iter()
        .map(|id| {
            records
                .iter()
                .find(|record| record.id == *id)
                .map_or(0.0, |record| record.price)
        })
        .sum()
}
