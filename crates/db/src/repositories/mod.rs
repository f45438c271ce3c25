//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod actor;
pub mod expense;

pub use actor::{ActorContact, ActorRepository};
pub use expense::{ExpenseRepository, expense_condition};
