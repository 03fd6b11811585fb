//! Presentation-boundary facade.
//!
//! Takes raw form values and selections (by name, from the option lists this
//! facade hands out) and answers every action with a [`Feedback`]. Nothing
//! escapes as a panic or an error type; the interactive session keeps going.

use warehouse_core::{DomainError, DomainResult, Money};
use warehouse_infra::{Ledger, LedgerError, LedgerStore};
use warehouse_inventory::{
    AddCategory, Category, IssueOutcome, IssueStock, ProductListing, ReceiveOutcome, ReceiveStock,
    UpdateCategory, UpdateProduct,
};

use crate::feedback::Feedback;
use crate::table::Table;

const PRODUCT_HEADERS: [&str; 6] = ["ID", "Name", "Category", "Quantity", "Unit price", "Value"];

pub struct Console<S> {
    ledger: Ledger<S>,
}

fn parse_quantity(field: &str, raw: &str) -> DomainResult<i64> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| DomainError::validation(format!("{field} must be a whole number")))?;
    if value <= 0 {
        return Err(DomainError::validation(format!("{field} must be positive")));
    }
    Ok(value)
}

fn product_row(listing: &ProductListing) -> Vec<String> {
    vec![
        listing.id.to_string(),
        listing.name.clone(),
        listing.category_name.clone().unwrap_or_else(|| "-".to_string()),
        listing.quantity.to_string(),
        listing.unit_price.to_string(),
        listing.value().to_string(),
    ]
}

fn products_table(title: &str, listings: &[ProductListing]) -> Table {
    let mut table = Table::new(title, &PRODUCT_HEADERS);
    for listing in listings {
        table.push_row(product_row(listing));
    }
    table
}

impl<S> Console<S>
where
    S: LedgerStore,
{
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    async fn category_named(&self, name: &str) -> Result<Category, LedgerError> {
        let name = name.trim();
        self.ledger
            .list_categories()
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DomainError::precondition(format!("unknown category {name:?}")).into())
    }

    async fn product_named(&self, name: &str) -> Result<ProductListing, LedgerError> {
        let name = name.trim();
        self.ledger
            .list_products()
            .await?
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| DomainError::precondition(format!("no such product {name:?}")).into())
    }

    /// Category names for a selection widget, ordered by name.
    pub async fn category_options(&self) -> Result<Vec<String>, Feedback> {
        let categories = self.ledger.list_categories().await?;
        Ok(categories.into_iter().map(|c| c.name).collect())
    }

    /// Product names for a selection widget, ordered by name.
    pub async fn product_options(&self) -> Result<Vec<String>, Feedback> {
        let products = self.ledger.list_products().await?;
        Ok(products.into_iter().map(|p| p.name).collect())
    }

    pub async fn categories_table(&self) -> Feedback {
        match self.ledger.list_categories().await {
            Ok(categories) => {
                let mut table = Table::new("Categories", &["ID", "Name", "Description"]);
                for c in categories {
                    table.push_row(vec![
                        c.id.to_string(),
                        c.name,
                        c.description.unwrap_or_default(),
                    ]);
                }
                Feedback::Table(table)
            }
            Err(e) => e.into(),
        }
    }

    pub async fn submit_category(&self, name: &str, description: &str) -> Feedback {
        match self
            .ledger
            .add_category(AddCategory::new(name, Some(description)))
            .await
        {
            Ok(category) => Feedback::ack(format!("Added category: {}", category.name)),
            Err(e) => e.into(),
        }
    }

    pub async fn edit_category(&self, selected: &str, name: &str, description: &str) -> Feedback {
        let result = async {
            let category = self.category_named(selected).await?;
            self.ledger
                .update_category(UpdateCategory {
                    id: category.id,
                    name: name.to_string(),
                    description: Some(description.to_string()),
                })
                .await
        }
        .await;

        match result {
            Ok(category) => Feedback::ack(format!("Updated category: {}", category.name)),
            Err(e) => e.into(),
        }
    }

    pub async fn delete_category(&self, selected: &str) -> Feedback {
        let result = async {
            let category = self.category_named(selected).await?;
            let removed = self.ledger.remove_category(category.id).await?;
            Ok::<_, LedgerError>((category, removed))
        }
        .await;

        match result {
            Ok((category, 0)) => Feedback::ack(format!("Deleted category: {}", category.name)),
            Ok((category, removed)) => Feedback::ack(format!(
                "Deleted category: {} together with {removed} product(s)",
                category.name
            )),
            Err(e) => e.into(),
        }
    }

    pub async fn products_table(&self) -> Feedback {
        match self.ledger.list_products().await {
            Ok(listings) => Feedback::Table(products_table("Products", &listings)),
            Err(e) => e.into(),
        }
    }

    /// Incoming stock form: name, category selection, quantity, unit price.
    pub async fn submit_receipt(
        &self,
        name: &str,
        category: &str,
        quantity: &str,
        unit_price: &str,
    ) -> Feedback {
        let result = async {
            let quantity = parse_quantity("quantity", quantity)?;
            let unit_price: Money = unit_price.parse()?;
            let category = self.category_named(category).await?;
            self.ledger
                .receive(ReceiveStock {
                    name: name.to_string(),
                    category_id: category.id,
                    quantity,
                    unit_price,
                })
                .await
        }
        .await;

        match result {
            Ok(ReceiveOutcome::Created { product }) => Feedback::ack(format!(
                "Added product: {} ({} in stock)",
                product.name, product.quantity
            )),
            Ok(ReceiveOutcome::Restocked { product }) => Feedback::ack(format!(
                "Restocked {}: now {} in stock at {}",
                product.name, product.quantity, product.unit_price
            )),
            Err(e) => e.into(),
        }
    }

    /// Outgoing stock form: product selection and quantity.
    pub async fn submit_issue(&self, product: &str, quantity: &str) -> Feedback {
        let result = async {
            let quantity = parse_quantity("quantity", quantity)?;
            let product = self.product_named(product).await?;
            self.ledger
                .issue(IssueStock {
                    product_id: product.id,
                    quantity,
                })
                .await
        }
        .await;

        match result {
            Ok(IssueOutcome::Deducted { product }) => Feedback::ack(format!(
                "Issued from {}: {} left",
                product.name, product.quantity
            )),
            Ok(IssueOutcome::Depleted { name, .. }) => {
                Feedback::ack(format!("Issued the last of {name}; product removed"))
            }
            Err(e) => e.into(),
        }
    }

    pub async fn edit_product(
        &self,
        selected: &str,
        name: &str,
        quantity: &str,
        unit_price: &str,
        category: &str,
    ) -> Feedback {
        let result = async {
            let quantity = parse_quantity("quantity", quantity)?;
            let unit_price: Money = unit_price.parse()?;
            let product = self.product_named(selected).await?;
            let category = self.category_named(category).await?;
            self.ledger
                .update_product(UpdateProduct {
                    id: product.id,
                    name: name.to_string(),
                    quantity,
                    unit_price,
                    category_id: category.id,
                })
                .await
        }
        .await;

        match result {
            Ok(product) => Feedback::ack(format!("Updated product: {}", product.name)),
            Err(e) => e.into(),
        }
    }

    pub async fn delete_product(&self, selected: &str) -> Feedback {
        let result = async {
            let product = self.product_named(selected).await?;
            self.ledger.delete_product(product.id).await?;
            Ok::<_, LedgerError>(product)
        }
        .await;

        match result {
            Ok(product) => Feedback::ack(format!("Deleted product: {}", product.name)),
            Err(e) => e.into(),
        }
    }

    /// Per-category valuation with a closing totals row.
    pub async fn dashboard(&self) -> Feedback {
        let summary = match self.ledger.summary().await {
            Ok(summary) => summary,
            Err(e) => return e.into(),
        };

        let mut table = Table::new("Inventory value", &["Category", "Products", "Quantity", "Value"]);
        for c in &summary.categories {
            table.push_row(vec![
                c.category_name.clone().unwrap_or_else(|| "-".to_string()),
                c.product_count.to_string(),
                c.total_quantity.to_string(),
                c.total_value.to_string(),
            ]);
        }
        table.push_row(vec![
            "Total".to_string(),
            summary.product_count.to_string(),
            summary.total_quantity.to_string(),
            summary.total_value.to_string(),
        ]);
        Feedback::Table(table)
    }

    pub async fn low_stock_table(&self) -> Feedback {
        match self.ledger.low_stock().await {
            Ok(listings) => {
                let title = format!(
                    "Low stock (below {})",
                    self.ledger.config().low_stock_threshold
                );
                Feedback::Table(products_table(&title, &listings))
            }
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warehouse_infra::{InMemoryLedgerStore, LedgerConfig};
    use warehouse_inventory::DeletePolicy;

    fn console(policy: DeletePolicy) -> Console<InMemoryLedgerStore> {
        let config = LedgerConfig::in_memory().with_delete_policy(policy);
        Console::new(Ledger::new(InMemoryLedgerStore::new(), config))
    }

    fn table(feedback: Feedback) -> Table {
        match feedback {
            Feedback::Table(table) => table,
            other => panic!("expected a table, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn receipt_then_issue_flows_through_feedback() {
        let console = console(DeletePolicy::Restrict);
        assert!(!console.submit_category("Tools", "Hand tools").await.is_error());
        assert_eq!(console.category_options().await.unwrap(), vec!["Tools"]);

        let added = console.submit_receipt("Widget", "Tools", "10", "2.50").await;
        assert_eq!(added.message(), Some("Added product: Widget (10 in stock)"));

        let restocked = console.submit_receipt("Widget", "Tools", "5", "2.75").await;
        assert_eq!(
            restocked.message(),
            Some("Restocked Widget: now 15 in stock at 2.75")
        );

        let products = table(console.products_table().await);
        assert_eq!(products.rows.len(), 1);
        assert_eq!(
            products.rows[0][1..],
            ["Widget", "Tools", "15", "2.75", "41.25"].map(String::from)
        );

        let issued = console.submit_issue("Widget", "15").await;
        assert_eq!(
            issued.message(),
            Some("Issued the last of Widget; product removed")
        );
        assert!(table(console.products_table().await).is_empty());
    }

    #[tokio::test]
    async fn malformed_form_values_become_error_feedback() {
        let console = console(DeletePolicy::Restrict);
        console.submit_category("Tools", "").await;

        for (qty, price) in [("ten", "1.00"), ("0", "1.00"), ("3", "abc"), ("3", "-1")] {
            let feedback = console.submit_receipt("Widget", "Tools", qty, price).await;
            assert!(feedback.is_error(), "{qty}/{price} should be refused");
            assert!(feedback.message().unwrap().starts_with("Please correct the form"));
        }
        assert!(console.product_options().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_selections_are_reported() {
        let console = console(DeletePolicy::Restrict);
        let receipt = console.submit_receipt("Widget", "Nowhere", "1", "1").await;
        assert!(receipt.message().unwrap().contains("unknown category"));

        let issue = console.submit_issue("Ghost", "1").await;
        assert!(issue.message().unwrap().contains("no such product"));
    }

    #[tokio::test]
    async fn restricted_category_delete_explains_itself() {
        let console = console(DeletePolicy::Restrict);
        console.submit_category("Tools", "").await;
        console.submit_receipt("Hammer", "Tools", "2", "9.99").await;

        let refused = console.delete_category("Tools").await;
        assert!(refused.is_error());
        assert!(refused.message().unwrap().starts_with("Cannot delete"));

        console.delete_product("Hammer").await;
        let deleted = console.delete_category("Tools").await;
        assert_eq!(deleted.message(), Some("Deleted category: Tools"));
    }

    #[tokio::test]
    async fn cascading_category_delete_reports_removed_products() {
        let console = console(DeletePolicy::Cascade);
        console.submit_category("Tools", "").await;
        console.submit_receipt("Hammer", "Tools", "2", "9.99").await;
        console.submit_receipt("Saw", "Tools", "1", "15").await;

        let deleted = console.delete_category("Tools").await;
        assert_eq!(
            deleted.message(),
            Some("Deleted category: Tools together with 2 product(s)")
        );
    }

    #[tokio::test]
    async fn edits_and_dashboard() {
        let console = console(DeletePolicy::Restrict);
        console.submit_category("Tools", "").await;
        console.submit_category("Garden", "").await;
        console.submit_receipt("Hose", "Garden", "3", "12.00").await;
        console.submit_receipt("Saw", "Tools", "10", "4.50").await;

        let edited = console.edit_product("Saw", "Handsaw", "8", "5", "Tools").await;
        assert_eq!(edited.message(), Some("Updated product: Handsaw"));
        let renamed = console.edit_category("Garden", "Outdoor", "Yard things").await;
        assert_eq!(renamed.message(), Some("Updated category: Outdoor"));

        let dashboard = table(console.dashboard().await);
        let total = dashboard.rows.last().unwrap();
        assert_eq!(total, &["Total", "2", "11", "76.00"].map(String::from));

        let low = table(console.low_stock_table().await);
        assert_eq!(low.title, "Low stock (below 5)");
        assert_eq!(low.rows.len(), 1);
        assert_eq!(low.rows[0][1], "Hose");
        assert_eq!(low.rows[0][2], "Outdoor");
    }

    #[tokio::test]
    async fn low_stock_follows_configured_threshold() {
        let config = LedgerConfig::in_memory().with_low_stock_threshold(3);
        let console = Console::new(Ledger::new(InMemoryLedgerStore::new(), config));
        console.submit_category("Tools", "").await;
        console.submit_receipt("Bolt", "Tools", "2", "0.10").await;
        console.submit_receipt("Nail", "Tools", "3", "0.01").await;

        assert_eq!(console.ledger().config().low_stock_threshold, 3);
        let low = table(console.low_stock_table().await);
        assert_eq!(low.title, "Low stock (below 3)");
        assert_eq!(low.rows.len(), 1);
        assert_eq!(low.rows[0][1], "Bolt");
    }

    #[test]
    fn quantity_must_be_positive_whole_number() {
        assert_eq!(parse_quantity("quantity", " 12 ").unwrap(), 12);
        for bad in ["0", "-2", "1.5", "", "ten"] {
            assert!(matches!(
                parse_quantity("quantity", bad),
                Err(DomainError::Validation(_))
            ));
        }
    }
}
