//! Core business logic for Expensa.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, classification rules, state transitions and aggregation
//! live here. Persistence, role lookup and notification delivery are reached
//! through the ports in [`expense::ports`].
//!
//! # Modules
//!
//! - `expense` - Expense submission, approval, edit, deletion and summaries

pub mod expense;
