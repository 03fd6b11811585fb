use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use warehouse_core::{CategoryId, DomainError, Entity, ProductId};
use warehouse_inventory::{
    plan_issue, plan_receive, plan_removal, AddCategory, Category, DeletePolicy, IssueOutcome,
    IssuePlan, IssueStock, Product, ProductListing, ReceiveOutcome, ReceivePlan, ReceiveStock,
    RemovalPlan, UpdateCategory, UpdateProduct,
};

use super::LedgerStore;
use crate::error::{LedgerError, LedgerResult};

#[derive(Debug, Default)]
struct State {
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    last_category_id: i64,
    last_product_id: i64,
}

impl State {
    fn product_by_name(&self, name: &str) -> Option<&Product> {
        self.products.values().find(|p| p.name == name)
    }

    fn require_category(&self, id: CategoryId) -> LedgerResult<()> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(DomainError::precondition(format!("no such category: {id}")).into())
        }
    }

    fn ensure_category_name_free(&self, name: &str, except: Option<CategoryId>) -> LedgerResult<()> {
        let taken = self
            .categories
            .values()
            .any(|c| c.name == name && Some(c.id) != except);
        if taken {
            return Err(DomainError::conflict(format!("category {name:?} already exists")).into());
        }
        Ok(())
    }

    fn listing(&self, product: &Product) -> ProductListing {
        ProductListing {
            id: product.id,
            name: product.name.clone(),
            quantity: product.quantity,
            unit_price: product.unit_price,
            category_id: product.category_id,
            category_name: self
                .categories
                .get(&product.category_id)
                .map(|c| c.name.clone()),
            updated_at: product.updated_at,
        }
    }
}

/// In-memory ledger store for tests/dev.
///
/// One write guard spans each read-modify-write, so operations are atomic.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<State>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| LedgerError::unavailable("in-memory store lock poisoned"))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| LedgerError::unavailable("in-memory store lock poisoned"))
    }

    fn add_category_sync(&self, cmd: AddCategory, now: DateTime<Utc>) -> LedgerResult<Category> {
        let cmd = cmd.validate()?;
        let mut state = self.write()?;
        state.ensure_category_name_free(&cmd.name, None)?;

        state.last_category_id += 1;
        let category = Category {
            id: CategoryId::new(state.last_category_id),
            name: cmd.name,
            description: cmd.description,
            created_at: now,
        };
        state.categories.insert(category.id(), category.clone());
        Ok(category)
    }

    fn update_category_sync(&self, cmd: UpdateCategory) -> LedgerResult<Category> {
        let cmd = cmd.validate()?;
        let mut state = self.write()?;
        if !state.categories.contains_key(&cmd.id) {
            return Err(DomainError::not_found().into());
        }
        state.ensure_category_name_free(&cmd.name, Some(cmd.id))?;

        let category = state
            .categories
            .get_mut(&cmd.id)
            .ok_or_else(DomainError::not_found)?;
        category.name = cmd.name;
        category.description = cmd.description;
        Ok(category.clone())
    }

    fn remove_category_sync(&self, id: CategoryId, policy: DeletePolicy) -> LedgerResult<usize> {
        let mut state = self.write()?;
        let category = state.categories.get(&id).ok_or_else(DomainError::not_found)?;
        let dependents = state
            .products
            .values()
            .filter(|p| p.category_id == id)
            .count();

        match plan_removal(policy, category, dependents)? {
            RemovalPlan::CategoryOnly => {}
            RemovalPlan::Cascade { .. } => state.products.retain(|_, p| p.category_id != id),
        }
        state.categories.remove(&id);
        Ok(dependents)
    }

    fn receive_sync(&self, cmd: ReceiveStock, now: DateTime<Utc>) -> LedgerResult<ReceiveOutcome> {
        let cmd = cmd.validate()?;
        let mut state = self.write()?;
        state.require_category(cmd.category_id)?;

        let plan = plan_receive(state.product_by_name(&cmd.name), &cmd)?;
        match plan {
            ReceivePlan::Create(new) => {
                state.last_product_id += 1;
                let product = Product {
                    id: ProductId::new(state.last_product_id),
                    name: new.name,
                    quantity: new.quantity,
                    unit_price: new.unit_price,
                    category_id: new.category_id,
                    updated_at: now,
                };
                state.products.insert(product.id(), product.clone());
                Ok(ReceiveOutcome::Created { product })
            }
            ReceivePlan::Restock {
                id,
                quantity,
                unit_price,
            } => {
                let product = state.products.get_mut(&id).ok_or_else(DomainError::not_found)?;
                product.quantity = quantity;
                product.unit_price = unit_price;
                product.updated_at = now;
                Ok(ReceiveOutcome::Restocked {
                    product: product.clone(),
                })
            }
        }
    }

    fn issue_sync(&self, cmd: IssueStock, now: DateTime<Utc>) -> LedgerResult<IssueOutcome> {
        let mut state = self.write()?;
        let plan = plan_issue(state.products.get(&cmd.product_id), &cmd)?;
        match plan {
            IssuePlan::Deduct { id, remaining } => {
                let product = state.products.get_mut(&id).ok_or_else(DomainError::not_found)?;
                product.quantity = remaining;
                product.updated_at = now;
                Ok(IssueOutcome::Deducted {
                    product: product.clone(),
                })
            }
            IssuePlan::Remove { id } => {
                let product = state.products.remove(&id).ok_or_else(DomainError::not_found)?;
                Ok(IssueOutcome::Depleted {
                    product_id: product.id,
                    name: product.name,
                })
            }
        }
    }

    fn update_product_sync(&self, cmd: UpdateProduct, now: DateTime<Utc>) -> LedgerResult<Product> {
        let cmd = cmd.validate()?;
        let mut state = self.write()?;
        if !state.products.contains_key(&cmd.id) {
            return Err(DomainError::not_found().into());
        }
        state.require_category(cmd.category_id)?;
        if state
            .products
            .values()
            .any(|p| p.name == cmd.name && p.id != cmd.id)
        {
            return Err(DomainError::conflict(format!("product {:?} already exists", cmd.name)).into());
        }

        let product = state.products.get_mut(&cmd.id).ok_or_else(DomainError::not_found)?;
        product.name = cmd.name;
        product.quantity = cmd.quantity;
        product.unit_price = cmd.unit_price;
        product.category_id = cmd.category_id;
        product.updated_at = now;
        Ok(product.clone())
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn add_category(&self, cmd: AddCategory, now: DateTime<Utc>) -> LedgerResult<Category> {
        self.add_category_sync(cmd, now)
    }

    async fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        let state = self.read()?;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: CategoryId) -> LedgerResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn update_category(&self, cmd: UpdateCategory) -> LedgerResult<Category> {
        self.update_category_sync(cmd)
    }

    async fn remove_category(&self, id: CategoryId, policy: DeletePolicy) -> LedgerResult<usize> {
        self.remove_category_sync(id, policy)
    }

    async fn receive(&self, cmd: ReceiveStock, now: DateTime<Utc>) -> LedgerResult<ReceiveOutcome> {
        self.receive_sync(cmd, now)
    }

    async fn issue(&self, cmd: IssueStock, now: DateTime<Utc>) -> LedgerResult<IssueOutcome> {
        self.issue_sync(cmd, now)
    }

    async fn list_products(&self) -> LedgerResult<Vec<ProductListing>> {
        let state = self.read()?;
        let mut listings: Vec<ProductListing> =
            state.products.values().map(|p| state.listing(p)).collect();
        listings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listings)
    }

    async fn get_product(&self, id: ProductId) -> LedgerResult<Option<ProductListing>> {
        let state = self.read()?;
        Ok(state.products.get(&id).map(|p| state.listing(p)))
    }

    async fn update_product(&self, cmd: UpdateProduct, now: DateTime<Utc>) -> LedgerResult<Product> {
        self.update_product_sync(cmd, now)
    }

    async fn delete_product(&self, id: ProductId) -> LedgerResult<()> {
        let mut state = self.write()?;
        state
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found().into())
    }
}
