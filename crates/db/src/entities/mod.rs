//! `SeaORM` entity definitions.

pub mod prelude;

pub mod actors;
pub mod expense_details;
pub mod expense_records;
pub mod sea_orm_active_enums;
