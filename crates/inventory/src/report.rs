//! Read views over the ledger: product listings and dashboard aggregates.
//!
//! Everything here is derived from a fresh listing; values are recomputed from
//! `quantity * unit_price` and never read back from storage.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warehouse_core::{CategoryId, Money, ProductId};

/// Product row joined with its category name.
///
/// `category_name` is `None` when the join finds no category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductListing {
    pub id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub category_id: CategoryId,
    pub category_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProductListing {
    pub fn value(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Totals for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryValuation {
    pub category_id: CategoryId,
    pub category_name: Option<String>,
    pub product_count: usize,
    pub total_quantity: i64,
    pub total_value: Money,
}

/// Dashboard totals across the whole ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub product_count: usize,
    pub total_quantity: i64,
    pub total_value: Money,
    /// Ordered by category id.
    pub categories: Vec<CategoryValuation>,
}

impl InventorySummary {
    pub fn from_listings(listings: &[ProductListing]) -> Self {
        let mut by_category: BTreeMap<CategoryId, CategoryValuation> = BTreeMap::new();
        for row in listings {
            let entry = by_category
                .entry(row.category_id)
                .or_insert_with(|| CategoryValuation {
                    category_id: row.category_id,
                    category_name: row.category_name.clone(),
                    product_count: 0,
                    total_quantity: 0,
                    total_value: Money::ZERO,
                });
            entry.product_count += 1;
            entry.total_quantity = entry.total_quantity.saturating_add(row.quantity);
            entry.total_value = entry.total_value + row.value();
        }

        Self {
            product_count: listings.len(),
            total_quantity: listings
                .iter()
                .fold(0i64, |acc, row| acc.saturating_add(row.quantity)),
            total_value: listings.iter().map(ProductListing::value).sum(),
            categories: by_category.into_values().collect(),
        }
    }
}

/// Listings strictly below `threshold`, lowest stock first.
pub fn low_stock(listings: &[ProductListing], threshold: i64) -> Vec<ProductListing> {
    let mut low: Vec<ProductListing> = listings
        .iter()
        .filter(|row| row.quantity < threshold)
        .cloned()
        .collect();
    low.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));
    low
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: i64, name: &str, quantity: i64, cents: u64, category: i64) -> ProductListing {
        ProductListing {
            id: ProductId::new(id),
            name: name.to_string(),
            quantity,
            unit_price: Money::from_cents(cents),
            category_id: CategoryId::new(category),
            category_name: Some(format!("cat-{category}")),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn summary_totals_match_listings() {
        let rows = vec![
            listing(1, "Widget", 15, 275, 1),
            listing(2, "Bolt", 100, 5, 1),
            listing(3, "Drill", 2, 8999, 2),
        ];
        let summary = InventorySummary::from_listings(&rows);

        assert_eq!(summary.product_count, 3);
        assert_eq!(summary.total_quantity, 117);
        assert_eq!(summary.total_value, Money::from_cents(4125 + 500 + 17998));
        assert_eq!(summary.categories.len(), 2);

        let tools = &summary.categories[0];
        assert_eq!(tools.category_id, CategoryId::new(1));
        assert_eq!(tools.product_count, 2);
        assert_eq!(tools.total_quantity, 115);
        assert_eq!(tools.total_value, Money::from_cents(4625));
    }

    #[test]
    fn summary_of_nothing_is_zero() {
        let summary = InventorySummary::from_listings(&[]);
        assert_eq!(summary.product_count, 0);
        assert_eq!(summary.total_value, Money::ZERO);
        assert!(summary.categories.is_empty());
    }

    #[test]
    fn low_stock_is_strictly_below_threshold_and_sorted() {
        let rows = vec![
            listing(1, "Widget", 5, 100, 1),
            listing(2, "Bolt", 1, 100, 1),
            listing(3, "Axe", 4, 100, 1),
            listing(4, "Anvil", 1, 100, 1),
        ];
        let names: Vec<_> = low_stock(&rows, 5).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Anvil", "Bolt", "Axe"]);
    }
}
