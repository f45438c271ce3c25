//! Expense notifications and their fire-and-forget relay.
//!
//! The service only decides *whether* to notify. Outcomes hand an
//! [`ExpenseNotification`] back to the caller, which passes it to a
//! [`NotificationRelay`] after the write has committed. Delivery failures
//! are logged and never reach the caller.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use expensa_shared::types::{ActorId, ExpenseId};

use super::ports::NotificationDispatcher;

/// Default delivery timeout.
pub const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

/// An event worth telling someone about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpenseNotification {
    /// A pending expense waits for a top-level approver.
    ApprovalRequested {
        /// Expense.
        expense_id: ExpenseId,
        /// Title.
        title: String,
        /// Amount.
        amount: Decimal,
        /// Submitter or last editor.
        submitted_by: ActorId,
    },
    /// An expense was approved; sent to the submitter.
    ExpenseApproved {
        /// Expense.
        expense_id: ExpenseId,
        /// Title.
        title: String,
        /// Original submitter.
        submitter: ActorId,
        /// Approver.
        approved_by: ActorId,
    },
    /// An expense was rejected; sent to the submitter.
    ExpenseRejected {
        /// Expense.
        expense_id: ExpenseId,
        /// Title.
        title: String,
        /// Original submitter.
        submitter: ActorId,
        /// Approver who rejected it.
        rejected_by: ActorId,
        /// Rejection reason.
        reason: String,
    },
}

impl ExpenseNotification {
    /// Event kind, as used in logs and payloads.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ApprovalRequested { .. } => "approval_requested",
            Self::ExpenseApproved { .. } => "expense_approved",
            Self::ExpenseRejected { .. } => "expense_rejected",
        }
    }

    /// Expense the event is about.
    #[must_use]
    pub const fn expense_id(&self) -> ExpenseId {
        match self {
            Self::ApprovalRequested { expense_id, .. }
            | Self::ExpenseApproved { expense_id, .. }
            | Self::ExpenseRejected { expense_id, .. } => *expense_id,
        }
    }

    /// JSON payload of the event, including its kind.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Notification delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    /// Delivery did not finish in time.
    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),

    /// The recipient could not be resolved to an address.
    #[error("No contact details for actor {0}")]
    RecipientNotFound(ActorId),

    /// The transport reported a failure.
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Runs notification delivery off the request path with a timeout.
#[derive(Clone)]
pub struct NotificationRelay {
    dispatcher: Arc<dyn NotificationDispatcher>,
    timeout: Duration,
}

impl std::fmt::Debug for NotificationRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationRelay")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl NotificationRelay {
    /// Creates a relay with the default timeout.
    #[must_use]
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            dispatcher,
            timeout: DEFAULT_NOTIFICATION_TIMEOUT,
        }
    }

    /// Sets the delivery timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawns delivery and returns immediately.
    ///
    /// The handle resolves to `true` if the notification was delivered.
    /// Callers are free to drop it.
    pub fn fire(&self, notification: ExpenseNotification) -> JoinHandle<bool> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let timeout = self.timeout;

        tokio::spawn(async move {
            let kind = notification.kind();
            let expense_id = notification.expense_id();
            debug!(kind, expense_id = %expense_id, "Dispatching notification");

            let result = match tokio::time::timeout(timeout, dispatcher.notify(&notification)).await
            {
                Ok(result) => result,
                Err(_) => Err(NotificationError::Timeout(timeout)),
            };

            match result {
                Ok(()) => {
                    info!(kind, expense_id = %expense_id, "Notification delivered");
                    true
                }
                Err(e) => {
                    warn!(kind, expense_id = %expense_id, error = %e, "Notification failed");
                    false
                }
            }
        })
    }

    /// Fires the notification if there is one.
    pub fn fire_opt(&self, notification: Option<ExpenseNotification>) -> Option<JoinHandle<bool>> {
        notification.map(|n| self.fire(n))
    }
}

/// Dispatcher that only logs. Used when email delivery is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

#[async_trait::async_trait]
impl NotificationDispatcher for TracingDispatcher {
    async fn notify(&self, notification: &ExpenseNotification) -> Result<(), NotificationError> {
        info!(
            kind = notification.kind(),
            payload = %notification.payload(),
            "Notification (delivery disabled)"
        );
        Ok(())
    }
}
