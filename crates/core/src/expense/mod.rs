//! Expense submission, approval and aggregation for Expensa.
//!
//! Every expense is one [`ExpenseAggregate`] persisted as two rows that
//! must always agree on their shared fields.
//!
//! # Modules
//!
//! - `types` - Domain types (records, details, views, inputs, filters)
//! - `classifier` - Role and amount based routing policy
//! - `validation` - Input validation
//! - `aggregate` - The two-row expense aggregate and its transitions
//! - `summary` - Totals and breakdowns
//! - `ports` - Store, role resolver, notifier and clock traits
//! - `notify` - Notification events and the fire-and-forget relay
//! - `service` - The expense engine
//! - `memory` - In-process adapters for tests
//! - `error` - Expense and store error types

pub mod aggregate;
pub mod classifier;
pub mod error;
pub mod memory;
pub mod notify;
pub mod ports;
pub mod service;
pub mod summary;
pub mod types;
pub mod validation;

#[cfg(test)]
mod aggregate_props;
#[cfg(test)]
mod classifier_props;
#[cfg(test)]
mod service_props;

pub use aggregate::ExpenseAggregate;
pub use classifier::{
    Classification, ClassificationPolicy, DEFAULT_AUTO_APPROVAL_THRESHOLD, ThresholdPolicy,
    classify,
};
pub use error::{ExpenseError, StoreError};
pub use notify::{ExpenseNotification, NotificationError, NotificationRelay, TracingDispatcher};
pub use ports::{Clock, ExpenseStore, NotificationDispatcher, RoleResolver, SystemClock};
pub use service::{DecisionOutcome, EditOutcome, ExpenseService, SubmitOutcome};
pub use types::{
    ApprovalAction, ApprovalActionInput, ApprovalStatus, CategoryBreakdown, EditExpenseInput,
    EditHistoryEntry, EditSnapshot, ExpenseDetail, ExpenseRecord, ExpenseView, ListFilter,
    Operation, RecordType, StatusAmounts, SubmitExpenseInput, SummaryBlock,
};
pub use validation::{ValidatedExpense, validate_expense_input};
