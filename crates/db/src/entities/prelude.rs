//! `SeaORM` entity prelude.

pub use super::actors::Entity as Actors;
pub use super::expense_details::Entity as ExpenseDetails;
pub use super::expense_records::Entity as ExpenseRecords;
