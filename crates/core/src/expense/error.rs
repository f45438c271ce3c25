//! Expense error types.
//!
//! `ExpenseError` is what callers of the expense service see.
//! `StoreError` is what persistence adapters report; the service maps it
//! onto `ExpenseError` and logs the original cause.

use thiserror::Error;

use expensa_shared::types::{ActorId, ExpenseDetailId, ExpenseId};

use super::types::{ApprovalStatus, Operation};

/// Errors reported by persistence and role lookup adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The record does not exist.
    #[error("Expense {0} not found")]
    NotFound(ExpenseId),

    /// The stored status no longer matches the expected one.
    #[error("Expense {0} changed since it was read")]
    Conflict(ExpenseId),

    /// A record exists without its detail row.
    #[error("Expense {0} has no linked detail row")]
    MissingDetail(ExpenseId),

    /// A detail row points to a record that does not exist.
    #[error("Expense detail {0} has no parent record")]
    OrphanDetail(ExpenseDetailId),

    /// The two rows of an expense disagree on a mirrored field.
    #[error("Expense {record_id} rows disagree on {field}")]
    Diverged {
        /// The canonical record.
        record_id: ExpenseId,
        /// First mirrored field found to differ.
        field: &'static str,
    },

    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors that can occur during expense operations.
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// No actor identity is available.
    #[error("Authentication required")]
    Unauthenticated,

    /// The actor lacks the role required for the operation.
    #[error("Actor {actor_id} is not allowed to {operation} expenses")]
    Forbidden {
        /// The actor that attempted the operation.
        actor_id: ActorId,
        /// The attempted operation.
        operation: Operation,
    },

    /// A required field is missing or out of range.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The record does not exist.
    #[error("Expense {0} not found")]
    NotFound(ExpenseId),

    /// The detail row does not exist.
    #[error("Expense detail {0} not found")]
    DetailNotFound(ExpenseDetailId),

    /// The operation is not allowed in the expense's current status.
    #[error("Cannot {operation} an expense that is {from}")]
    InvalidStateTransition {
        /// The current status.
        from: ApprovalStatus,
        /// The attempted operation.
        operation: Operation,
    },

    /// Another request changed the expense first.
    #[error("Expense {0} was modified concurrently, please retry")]
    ConcurrentModification(ExpenseId),

    /// The two rows of an expense disagree or one is missing.
    #[error("Referential inconsistency: {0}")]
    ReferentialInconsistency(String),

    /// The operation failed inside the store; the cause is kept for logging.
    #[error("Failed to {operation} expense")]
    OperationFailed {
        /// The attempted operation.
        operation: Operation,
        /// Underlying cause.
        #[source]
        source: StoreError,
    },
}

impl ExpenseError {
    /// Creates a validation error.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden { .. } => 403,
            Self::Validation { .. } => 400,
            Self::NotFound(_) | Self::DetailNotFound(_) => 404,
            Self::InvalidStateTransition { .. } | Self::ConcurrentModification(_) => 409,
            Self::ReferentialInconsistency(_) | Self::OperationFailed { .. } => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound(_) => "EXPENSE_NOT_FOUND",
            Self::DetailNotFound(_) => "EXPENSE_DETAIL_NOT_FOUND",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::ReferentialInconsistency(_) => "REFERENTIAL_INCONSISTENCY",
            Self::OperationFailed { .. } => "OPERATION_FAILED",
        }
    }
}
