//! Ledger service: the single entry point for inventory operations.
//!
//! Holds an explicitly injected store handle and the configuration that picks
//! the category delete policy and the low-stock threshold. Every call is one
//! store operation; there is no process-wide connection state.

use chrono::Utc;
use tracing::instrument;

use warehouse_core::{CategoryId, ProductId};
use warehouse_inventory::{
    low_stock, AddCategory, Category, InventorySummary, IssueOutcome, IssueStock, Product,
    ProductListing, ReceiveOutcome, ReceiveStock, UpdateCategory, UpdateProduct,
};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerStore;

/// Whether a failed removal was a business refusal rather than a store fault.
fn is_refusal(err: &LedgerError) -> bool {
    matches!(err, LedgerError::Domain(_))
}

fn log_removal_failure(id: CategoryId, err: &LedgerError) {
    if is_refusal(err) {
        tracing::warn!(category_id = %id, error = %err, "category removal refused");
    } else {
        tracing::error!(category_id = %id, error = %err, "category removal failed");
    }
}

#[derive(Debug, Clone)]
pub struct Ledger<S> {
    store: S,
    config: LedgerConfig,
}

impl<S> Ledger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

impl<S> Ledger<S>
where
    S: LedgerStore,
{
    #[instrument(skip(self), err)]
    pub async fn add_category(&self, cmd: AddCategory) -> LedgerResult<Category> {
        let category = self.store.add_category(cmd, Utc::now()).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "category added");
        Ok(category)
    }

    pub async fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        self.store.list_categories().await
    }

    pub async fn get_category(&self, id: CategoryId) -> LedgerResult<Option<Category>> {
        self.store.get_category(id).await
    }

    #[instrument(skip(self), err)]
    pub async fn update_category(&self, cmd: UpdateCategory) -> LedgerResult<Category> {
        let category = self.store.update_category(cmd).await?;
        tracing::info!(category_id = %category.id, "category updated");
        Ok(category)
    }

    /// Remove a category under the configured delete policy.
    ///
    /// Returns the number of products removed along with it (always 0 under
    /// `restrict`).
    #[instrument(skip(self), fields(policy = %self.config.delete_policy), err)]
    pub async fn remove_category(&self, id: CategoryId) -> LedgerResult<usize> {
        let removed = self
            .store
            .remove_category(id, self.config.delete_policy)
            .await
            .inspect_err(|e| log_removal_failure(id, e))?;
        tracing::info!(category_id = %id, products_removed = removed, "category removed");
        Ok(removed)
    }

    /// Receive stock for a product name; creates the product on first receipt.
    #[instrument(skip(self), err)]
    pub async fn receive(&self, cmd: ReceiveStock) -> LedgerResult<ReceiveOutcome> {
        let outcome = self.store.receive(cmd, Utc::now()).await?;
        let product = outcome.product();
        match &outcome {
            ReceiveOutcome::Created { .. } => {
                tracing::info!(product_id = %product.id, quantity = product.quantity, "product created")
            }
            ReceiveOutcome::Restocked { .. } => {
                tracing::info!(product_id = %product.id, quantity = product.quantity, "product restocked")
            }
        }
        Ok(outcome)
    }

    /// Issue stock; the product is deleted when it reaches zero.
    #[instrument(skip(self), err)]
    pub async fn issue(&self, cmd: IssueStock) -> LedgerResult<IssueOutcome> {
        let outcome = self.store.issue(cmd, Utc::now()).await?;
        match &outcome {
            IssueOutcome::Deducted { product } => {
                tracing::info!(product_id = %product.id, remaining = product.quantity, "stock issued")
            }
            IssueOutcome::Depleted { product_id, .. } => {
                tracing::info!(product_id = %product_id, "stock depleted; product removed")
            }
        }
        Ok(outcome)
    }

    pub async fn list_products(&self) -> LedgerResult<Vec<ProductListing>> {
        self.store.list_products().await
    }

    pub async fn get_product(&self, id: ProductId) -> LedgerResult<Option<ProductListing>> {
        self.store.get_product(id).await
    }

    #[instrument(skip(self), err)]
    pub async fn update_product(&self, cmd: UpdateProduct) -> LedgerResult<Product> {
        let product = self.store.update_product(cmd, Utc::now()).await?;
        tracing::info!(product_id = %product.id, "product updated");
        Ok(product)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_product(&self, id: ProductId) -> LedgerResult<()> {
        self.store.delete_product(id).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Dashboard totals computed from a fresh listing.
    pub async fn summary(&self) -> LedgerResult<InventorySummary> {
        let listings = self.store.list_products().await?;
        Ok(InventorySummary::from_listings(&listings))
    }

    /// Products below the configured low-stock threshold, lowest first.
    pub async fn low_stock(&self) -> LedgerResult<Vec<ProductListing>> {
        let listings = self.store.list_products().await?;
        Ok(low_stock(&listings, self.config.low_stock_threshold))
    }
}
