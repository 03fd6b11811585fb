use std::sync::Arc;

use chrono::{DateTime, Utc};

use warehouse_core::{CategoryId, ProductId};
use warehouse_inventory::{
    AddCategory, Category, DeletePolicy, IssueOutcome, IssueStock, Product, ProductListing,
    ReceiveOutcome, ReceiveStock, UpdateCategory, UpdateProduct,
};

use crate::error::LedgerResult;

/// Persistence boundary for the inventory ledger.
///
/// Every mutating method is atomic: it either applies its whole write or
/// leaves the store unchanged. Read-modify-write sequences (receive, issue,
/// category removal, product edit) must not interleave with other writers.
///
/// `now` is supplied by the caller so stores stay clock-free.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn add_category(&self, cmd: AddCategory, now: DateTime<Utc>) -> LedgerResult<Category>;

    /// All categories ordered by name.
    async fn list_categories(&self) -> LedgerResult<Vec<Category>>;

    async fn get_category(&self, id: CategoryId) -> LedgerResult<Option<Category>>;

    async fn update_category(&self, cmd: UpdateCategory) -> LedgerResult<Category>;

    /// Remove a category under `policy`. Returns how many products went with it.
    async fn remove_category(&self, id: CategoryId, policy: DeletePolicy) -> LedgerResult<usize>;

    /// Accumulate stock by product name, creating the product on first receipt.
    async fn receive(&self, cmd: ReceiveStock, now: DateTime<Utc>) -> LedgerResult<ReceiveOutcome>;

    /// Deduct stock by product id, deleting the product when it reaches zero.
    async fn issue(&self, cmd: IssueStock, now: DateTime<Utc>) -> LedgerResult<IssueOutcome>;

    /// All products joined with their category name, ordered by product name.
    async fn list_products(&self) -> LedgerResult<Vec<ProductListing>>;

    async fn get_product(&self, id: ProductId) -> LedgerResult<Option<ProductListing>>;

    async fn update_product(&self, cmd: UpdateProduct, now: DateTime<Utc>) -> LedgerResult<Product>;

    async fn delete_product(&self, id: ProductId) -> LedgerResult<()>;
}

#[async_trait::async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn add_category(&self, cmd: AddCategory, now: DateTime<Utc>) -> LedgerResult<Category> {
        (**self).add_category(cmd, now).await
    }

    async fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        (**self).list_categories().await
    }

    async fn get_category(&self, id: CategoryId) -> LedgerResult<Option<Category>> {
        (**self).get_category(id).await
    }

    async fn update_category(&self, cmd: UpdateCategory) -> LedgerResult<Category> {
        (**self).update_category(cmd).await
    }

    async fn remove_category(&self, id: CategoryId, policy: DeletePolicy) -> LedgerResult<usize> {
        (**self).remove_category(id, policy).await
    }

    async fn receive(&self, cmd: ReceiveStock, now: DateTime<Utc>) -> LedgerResult<ReceiveOutcome> {
        (**self).receive(cmd, now).await
    }

    async fn issue(&self, cmd: IssueStock, now: DateTime<Utc>) -> LedgerResult<IssueOutcome> {
        (**self).issue(cmd, now).await
    }

    async fn list_products(&self) -> LedgerResult<Vec<ProductListing>> {
        (**self).list_products().await
    }

    async fn get_product(&self, id: ProductId) -> LedgerResult<Option<ProductListing>> {
        (**self).get_product(id).await
    }

    async fn update_product(&self, cmd: UpdateProduct, now: DateTime<Utc>) -> LedgerResult<Product> {
        (**self).update_product(cmd, now).await
    }

    async fn delete_product(&self, id: ProductId) -> LedgerResult<()> {
        (**self).delete_product(id).await
    }
}
