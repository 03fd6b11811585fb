//! Infrastructure layer: store adapters, configuration, and the ledger service.

pub mod config;
pub mod error;
pub mod ledger;
pub mod store;


pub use config::{ConfigError, LedgerConfig};
pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use store::{InMemoryLedgerStore, LedgerStore, SqliteLedgerStore};
