//! Collaborator ports consumed by the expense service.
//!
//! Adapters live outside this crate: `expensa-db` implements the store and
//! the role resolver on PostgreSQL, `expensa-api` delivers notifications by
//! email. [`super::memory`] has in-process versions for tests.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};

use expensa_shared::types::{ActorId, ExpenseDetailId, ExpenseId, PageRequest};

use super::aggregate::ExpenseAggregate;
use super::error::StoreError;
use super::notify::{ExpenseNotification, NotificationError};
use super::types::{ApprovalStatus, ExpenseRecord, ListFilter};

/// Answers capability questions about an actor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// Returns true if the actor has unrestricted approval authority.
    async fn is_top_level_approver(&self, actor: ActorId) -> Result<bool, StoreError>;

    /// Returns true if the actor may submit, view and edit expenses.
    async fn has_financial_admin_access(&self, actor: ActorId) -> Result<bool, StoreError>;
}

/// Best-effort delivery of expense notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Delivers one notification.
    async fn notify(&self, notification: &ExpenseNotification) -> Result<(), NotificationError>;
}

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to the microsecond precision PostgreSQL stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// Transactional persistence of expense aggregates.
///
/// Each method is one atomic unit of work covering both rows.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Inserts both rows of a new expense.
    async fn insert(&self, expense: &ExpenseAggregate) -> Result<(), StoreError>;

    /// Loads an expense by record ID.
    async fn find(&self, id: ExpenseId) -> Result<Option<ExpenseAggregate>, StoreError>;

    /// Loads an expense by detail ID.
    async fn find_by_detail(
        &self,
        id: ExpenseDetailId,
    ) -> Result<Option<ExpenseAggregate>, StoreError>;

    /// Writes both rows of a loaded expense.
    ///
    /// The write only happens if the stored status still equals `expected`;
    /// otherwise `StoreError::Conflict` is returned and nothing changes.
    async fn update(
        &self,
        expense: &ExpenseAggregate,
        expected: ApprovalStatus,
    ) -> Result<(), StoreError>;

    /// Deletes the detail row and then the record.
    ///
    /// Returns the removed expense, or `None` if the record did not exist.
    async fn delete(&self, id: ExpenseId) -> Result<Option<ExpenseAggregate>, StoreError>;

    /// Returns one page of expenses matching the filter, newest expense date
    /// first, together with the total number of matches.
    async fn list(
        &self,
        filter: &ListFilter,
        page: PageRequest,
    ) -> Result<(Vec<ExpenseAggregate>, u64), StoreError>;

    /// Returns every record matching the filter, ignoring pagination.
    async fn matching_records(&self, filter: &ListFilter) -> Result<Vec<ExpenseRecord>, StoreError>;
}
