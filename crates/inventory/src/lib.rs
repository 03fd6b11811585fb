//! Inventory ledger rules.
//!
//! This crate contains the business rules for categories and products,
//! implemented purely as deterministic domain logic (no IO, no storage).
//! Stores load the current state, ask these functions for a plan, and apply
//! the plan inside one atomic unit.

pub mod category;
pub mod product;
pub mod report;

pub use category::{plan_removal, AddCategory, Category, DeletePolicy, RemovalPlan, UpdateCategory};
pub use product::{
    plan_issue, plan_receive, IssueOutcome, IssuePlan, IssueStock, NewProduct, Product,
    ReceiveOutcome, ReceivePlan, ReceiveStock, UpdateProduct,
};
pub use report::{low_stock, CategoryValuation, InventorySummary, ProductListing};
