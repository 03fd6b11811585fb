//! Ledger store boundary.
//!
//! A store persists categories and products and applies each ledger operation
//! as one atomic unit. The business decisions come from `warehouse-inventory`;
//! stores only load state, ask for a plan, and write it.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::LedgerStore;
pub use sqlite::SqliteLedgerStore;
