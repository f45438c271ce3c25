//! In-process adapters for the expense ports.
//!
//! Used by the core and API test suites. They keep both rows of an expense
//! separately, like the database does, so a broken write shows up as a
//! divergence on the next read.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use expensa_shared::types::{ActorId, ExpenseDetailId, ExpenseId, PageRequest};

use super::aggregate::ExpenseAggregate;
use super::error::StoreError;
use super::notify::{ExpenseNotification, NotificationError};
use super::ports::{Clock, ExpenseStore, NotificationDispatcher, RoleResolver};
use super::types::{ApprovalStatus, ExpenseDetail, ExpenseRecord, ListFilter};

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<ExpenseId, ExpenseRecord>,
    details: HashMap<ExpenseDetailId, ExpenseDetail>,
}

impl Tables {
    fn detail_for(&self, id: ExpenseId) -> Option<&ExpenseDetail> {
        self.details.values().find(|d| d.financial_record_id == id)
    }

    fn load(&self, id: ExpenseId) -> Result<Option<ExpenseAggregate>, StoreError> {
        let Some(record) = self.records.get(&id) else {
            return Ok(None);
        };
        let detail = self
            .detail_for(id)
            .ok_or(StoreError::MissingDetail(id))?;
        ExpenseAggregate::from_rows(record.clone(), detail.clone()).map(Some)
    }
}

/// Expense store backed by two hash maps.
#[derive(Debug, Default)]
pub struct InMemoryExpenseStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl InMemoryExpenseStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored record rows.
    pub async fn record_count(&self) -> usize {
        self.tables.read().await.records.len()
    }

    /// Number of stored detail rows.
    pub async fn detail_count(&self) -> usize {
        self.tables.read().await.details.len()
    }

    /// Overwrites a stored detail row without touching its record.
    pub async fn put_detail_row(&self, detail: ExpenseDetail) {
        self.tables.write().await.details.insert(detail.id, detail);
    }

    /// Removes a detail row without touching its record.
    pub async fn remove_detail_row(&self, id: ExpenseDetailId) {
        self.tables.write().await.details.remove(&id);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Backend("write failure injected".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn insert(&self, expense: &ExpenseAggregate) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables.records.insert(expense.id(), expense.record().clone());
        tables
            .details
            .insert(expense.detail_id(), expense.detail().clone());
        Ok(())
    }

    async fn find(&self, id: ExpenseId) -> Result<Option<ExpenseAggregate>, StoreError> {
        self.tables.read().await.load(id)
    }

    async fn find_by_detail(
        &self,
        id: ExpenseDetailId,
    ) -> Result<Option<ExpenseAggregate>, StoreError> {
        let tables = self.tables.read().await;
        let Some(detail) = tables.details.get(&id) else {
            return Ok(None);
        };
        let record = tables
            .records
            .get(&detail.financial_record_id)
            .ok_or(StoreError::OrphanDetail(id))?;
        ExpenseAggregate::from_rows(record.clone(), detail.clone()).map(Some)
    }

    async fn update(
        &self,
        expense: &ExpenseAggregate,
        expected: ApprovalStatus,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let stored = tables
            .records
            .get(&expense.id())
            .ok_or(StoreError::NotFound(expense.id()))?;
        if stored.approval_status != expected {
            return Err(StoreError::Conflict(expense.id()));
        }
        if !tables.details.contains_key(&expense.detail_id()) {
            return Err(StoreError::MissingDetail(expense.id()));
        }
        tables.records.insert(expense.id(), expense.record().clone());
        tables
            .details
            .insert(expense.detail_id(), expense.detail().clone());
        Ok(())
    }

    async fn delete(&self, id: ExpenseId) -> Result<Option<ExpenseAggregate>, StoreError> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let Some(expense) = tables.load(id)? else {
            return Ok(None);
        };
        tables.details.remove(&expense.detail_id());
        tables.records.remove(&id);
        Ok(Some(expense))
    }

    async fn list(
        &self,
        filter: &ListFilter,
        page: PageRequest,
    ) -> Result<(Vec<ExpenseAggregate>, u64), StoreError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&ExpenseRecord> =
            tables.records.values().filter(|r| filter.matches(r)).collect();
        matching.sort_by(|a, b| {
            b.record_date
                .cmp(&a.record_date)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);

        let items = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|record| tables.load(record.id))
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total))
    }

    async fn matching_records(&self, filter: &ListFilter) -> Result<Vec<ExpenseRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}

/// Role resolver over fixed sets of actors.
#[derive(Debug, Default, Clone)]
pub struct StaticRoleResolver {
    top_level: HashSet<ActorId>,
    financial_admins: HashSet<ActorId>,
}

impl StaticRoleResolver {
    /// Creates a resolver that grants nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level approver.
    #[must_use]
    pub fn with_top_level(mut self, actor: ActorId) -> Self {
        self.top_level.insert(actor);
        self
    }

    /// Adds a financial admin.
    #[must_use]
    pub fn with_financial_admin(mut self, actor: ActorId) -> Self {
        self.financial_admins.insert(actor);
        self
    }
}

#[async_trait]
impl RoleResolver for StaticRoleResolver {
    async fn is_top_level_approver(&self, actor: ActorId) -> Result<bool, StoreError> {
        Ok(self.top_level.contains(&actor))
    }

    async fn has_financial_admin_access(&self, actor: ActorId) -> Result<bool, StoreError> {
        Ok(self.financial_admins.contains(&actor))
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Dispatcher that records every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<ExpenseNotification>>,
}

impl RecordingDispatcher {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far.
    pub fn sent(&self) -> Vec<ExpenseNotification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(&self, notification: &ExpenseNotification) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .map_err(|e| NotificationError::Delivery(e.to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::classifier::{ClassificationPolicy, ThresholdPolicy};
    use crate::expense::validation::validate_expense_input;
    use crate::expense::types::SubmitExpenseInput;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn expense() -> ExpenseAggregate {
        let fields = validate_expense_input(SubmitExpenseInput {
            title: "Hotel".to_string(),
            amount: dec!(6000),
            category: "travel".to_string(),
            expense_date: NaiveDate::from_ymd_opt(2026, 5, 1),
            ..Default::default()
        })
        .unwrap();
        let classification = ThresholdPolicy::default().classify(false, dec!(6000));
        ExpenseAggregate::create(fields, ActorId::new(), classification, Utc::now())
    }

    #[tokio::test]
    async fn test_update_is_compare_and_swap() {
        let store = InMemoryExpenseStore::new();
        let mut stored = expense();
        store.insert(&stored).await.unwrap();

        stored.approve(ActorId::new(), Utc::now()).unwrap();
        store
            .update(&stored, ApprovalStatus::Pending)
            .await
            .unwrap();

        let err = store
            .update(&stored, ApprovalStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Conflict(stored.id()));
    }

    #[tokio::test]
    async fn test_missing_detail_is_reported() {
        let store = InMemoryExpenseStore::new();
        let stored = expense();
        store.insert(&stored).await.unwrap();
        store.remove_detail_row(stored.detail_id()).await;

        assert_eq!(
            store.find(stored.id()).await.unwrap_err(),
            StoreError::MissingDetail(stored.id())
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_nothing_behind() {
        let store = InMemoryExpenseStore::new();
        store.fail_writes(true);
        assert!(store.insert(&expense()).await.is_err());
        assert_eq!(store.record_count().await, 0);
        assert_eq!(store.detail_count().await, 0);
    }
}
