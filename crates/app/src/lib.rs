//! Presentation boundary for the warehouse ledger.
//!
//! A UI (terminal, desktop, anything) drives [`Console`] with raw form values
//! and renders the [`Feedback`] it returns.

pub mod console;
pub mod feedback;
pub mod table;

pub use console::Console;
pub use feedback::{user_message, Feedback};
pub use table::Table;
