//! Expense service.
//!
//! Orchestrates every expense operation: the access check, validation, the
//! classification policy, the aggregate transition and one atomic store write.
//! Notifications are not sent here. Each outcome carries the notification
//! the caller should hand to a [`super::notify::NotificationRelay`] once the
//! write has committed.

use std::sync::Arc;

use tracing::{error, info, warn};

use expensa_shared::types::{ActorId, ExpenseDetailId, ExpenseId, PageResponse};

use super::aggregate::ExpenseAggregate;
use super::classifier::{ClassificationPolicy, ThresholdPolicy};
use super::error::{ExpenseError, StoreError};
use super::notify::ExpenseNotification;
use super::ports::{Clock, ExpenseStore, RoleResolver, SystemClock};
use super::summary::summarize;
use super::types::{
    ApprovalAction, ApprovalActionInput, ApprovalStatus, EditExpenseInput, ExpenseView,
    ListFilter, Operation, SubmitExpenseInput, SummaryBlock,
};
use super::validation::{validate_expense_input, validate_rejection_reason};

/// Default upper bound on the page size of a listing.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// The stored expense.
    pub expense: ExpenseView,
    /// True when top-level approvers should be told about a pending expense.
    pub notify_approvers: bool,
}

impl SubmitOutcome {
    /// Notification to dispatch, if any.
    #[must_use]
    pub fn notification(&self) -> Option<ExpenseNotification> {
        self.notify_approvers
            .then(|| approval_requested(&self.expense, self.expense.created_by))
    }
}

/// Result of an approval decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    /// The updated expense.
    pub expense: ExpenseView,
    /// Original submitter, the recipient of the decision notification.
    pub submitter: ActorId,
    /// Approver who made the decision.
    pub decided_by: ActorId,
    /// The decision.
    pub decision: ApprovalAction,
}

impl DecisionOutcome {
    /// Notification to dispatch to the submitter.
    #[must_use]
    pub fn notification(&self) -> Option<ExpenseNotification> {
        let expense_id = self.expense.id;
        let title = self.expense.title.clone();
        Some(match self.decision {
            ApprovalAction::Approve => ExpenseNotification::ExpenseApproved {
                expense_id,
                title,
                submitter: self.submitter,
                approved_by: self.decided_by,
            },
            ApprovalAction::Reject => ExpenseNotification::ExpenseRejected {
                expense_id,
                title,
                submitter: self.submitter,
                rejected_by: self.decided_by,
                reason: self.expense.rejection_reason.clone().unwrap_or_default(),
            },
        })
    }
}

/// Result of an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// The updated expense.
    pub expense: ExpenseView,
    /// Actor who made the edit.
    pub editor: ActorId,
    /// True when the edit left the expense waiting for approval.
    pub notify_approvers: bool,
}

impl EditOutcome {
    /// Notification to dispatch, if any.
    #[must_use]
    pub fn notification(&self) -> Option<ExpenseNotification> {
        self.notify_approvers
            .then(|| approval_requested(&self.expense, self.editor))
    }
}

fn approval_requested(expense: &ExpenseView, submitted_by: ActorId) -> ExpenseNotification {
    ExpenseNotification::ApprovalRequested {
        expense_id: expense.id,
        title: expense.title.clone(),
        amount: expense.amount,
        submitted_by,
    }
}

/// Expense engine over injected collaborators.
#[derive(Clone)]
pub struct ExpenseService {
    store: Arc<dyn ExpenseStore>,
    roles: Arc<dyn RoleResolver>,
    policy: Arc<dyn ClassificationPolicy>,
    clock: Arc<dyn Clock>,
    max_page_size: u32,
}

impl std::fmt::Debug for ExpenseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpenseService")
            .field("policy", &self.policy)
            .field("clock", &self.clock)
            .field("max_page_size", &self.max_page_size)
            .finish_non_exhaustive()
    }
}

impl ExpenseService {
    /// Creates a service with the default threshold policy and the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn ExpenseStore>, roles: Arc<dyn RoleResolver>) -> Self {
        Self {
            store,
            roles,
            policy: Arc::new(ThresholdPolicy::default()),
            clock: Arc::new(SystemClock),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Replaces the classification policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn ClassificationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the largest page a listing may return.
    #[must_use]
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    /// Submits a new expense.
    ///
    /// Both rows are written in one transaction. Approved and auto-approved
    /// expenses are stamped with the submitter as approver.
    pub async fn submit(
        &self,
        input: SubmitExpenseInput,
        actor: ActorId,
    ) -> Result<SubmitOutcome, ExpenseError> {
        let is_top = self.require_access(actor, Operation::Submit).await?;
        let fields = validate_expense_input(input)?;

        let classification = self.policy.classify(is_top, fields.amount);
        let expense = ExpenseAggregate::create(fields, actor, classification, self.clock.now());

        self.store
            .insert(&expense)
            .await
            .map_err(|e| store_failure(Operation::Submit, e))?;

        info!(
            expense_id = %expense.id(),
            actor_id = %actor,
            status = %expense.status(),
            record_type = %classification.record_type,
            "Expense submitted"
        );

        Ok(SubmitOutcome {
            expense: expense.to_view(),
            notify_approvers: classification.needs_approval && !is_top,
        })
    }

    /// Approves a pending expense.
    pub async fn approve(
        &self,
        record_id: ExpenseId,
        actor: ActorId,
    ) -> Result<DecisionOutcome, ExpenseError> {
        self.require_top_level(actor, Operation::Approve).await?;
        let mut expense = self.load(record_id, Operation::Approve).await?;

        let expected = expense.status();
        expense.approve(actor, self.clock.now())?;
        self.save(&expense, expected, Operation::Approve).await?;

        info!(expense_id = %record_id, actor_id = %actor, "Expense approved");
        Ok(decision(&expense, actor, ApprovalAction::Approve))
    }

    /// Rejects a pending expense with a reason.
    pub async fn reject(
        &self,
        record_id: ExpenseId,
        actor: ActorId,
        reason: Option<&str>,
    ) -> Result<DecisionOutcome, ExpenseError> {
        self.require_top_level(actor, Operation::Reject).await?;
        let reason = validate_rejection_reason(reason)?;
        let mut expense = self.load(record_id, Operation::Reject).await?;

        let expected = expense.status();
        expense.reject(actor, reason, self.clock.now())?;
        self.save(&expense, expected, Operation::Reject).await?;

        info!(expense_id = %record_id, actor_id = %actor, "Expense rejected");
        Ok(decision(&expense, actor, ApprovalAction::Reject))
    }

    /// Applies an approval action.
    pub async fn decide(
        &self,
        input: ApprovalActionInput,
        actor: ActorId,
    ) -> Result<DecisionOutcome, ExpenseError> {
        match input.action {
            ApprovalAction::Approve => self.approve(input.record_id, actor).await,
            ApprovalAction::Reject => {
                self.reject(input.record_id, actor, input.rejection_reason.as_deref())
                    .await
            }
        }
    }

    /// Edits a non-approved expense.
    ///
    /// The new amount is reclassified with the editor's role, and the
    /// previous and new values are appended to the audit log.
    pub async fn edit(
        &self,
        input: EditExpenseInput,
        actor: ActorId,
    ) -> Result<EditOutcome, ExpenseError> {
        let is_top = self.require_access(actor, Operation::Edit).await?;
        let fields = validate_expense_input(input.fields)?;
        let mut expense = self.load(input.record_id, Operation::Edit).await?;

        let expected = expense.status();
        if !expected.is_editable() {
            return Err(ExpenseError::InvalidStateTransition {
                from: expected,
                operation: Operation::Edit,
            });
        }
        if expense.submitter() != actor && !is_top {
            return Err(ExpenseError::Forbidden {
                actor_id: actor,
                operation: Operation::Edit,
            });
        }

        let classification = self.policy.classify(is_top, fields.amount);
        expense.apply_edit(fields, actor, classification, self.clock.now())?;
        self.save(&expense, expected, Operation::Edit).await?;

        info!(
            expense_id = %input.record_id,
            actor_id = %actor,
            from = %expected,
            to = %expense.status(),
            "Expense edited"
        );

        Ok(EditOutcome {
            expense: expense.to_view(),
            editor: actor,
            notify_approvers: classification.needs_approval && !is_top,
        })
    }

    /// Deletes both rows of an expense, whatever its status.
    pub async fn delete(
        &self,
        record_id: ExpenseId,
        actor: ActorId,
    ) -> Result<ExpenseView, ExpenseError> {
        self.require_top_level(actor, Operation::Delete).await?;

        let removed = self
            .store
            .delete(record_id)
            .await
            .map_err(|e| store_failure(Operation::Delete, e))?
            .ok_or(ExpenseError::NotFound(record_id))?;

        info!(
            expense_id = %record_id,
            actor_id = %actor,
            status = %removed.status(),
            "Expense deleted"
        );
        Ok(removed.to_view())
    }

    /// Returns one expense by record ID.
    pub async fn get(
        &self,
        record_id: ExpenseId,
        actor: ActorId,
    ) -> Result<ExpenseView, ExpenseError> {
        self.require_access(actor, Operation::View).await?;
        Ok(self.load(record_id, Operation::View).await?.to_view())
    }

    /// Returns one expense by detail ID.
    pub async fn get_by_detail(
        &self,
        detail_id: ExpenseDetailId,
        actor: ActorId,
    ) -> Result<ExpenseView, ExpenseError> {
        self.require_access(actor, Operation::View).await?;
        self.store
            .find_by_detail(detail_id)
            .await
            .map_err(|e| store_failure(Operation::View, e))?
            .map(|expense| expense.to_view())
            .ok_or(ExpenseError::DetailNotFound(detail_id))
    }

    /// Returns one page of expenses matching the filter.
    pub async fn list(
        &self,
        filter: &ListFilter,
        actor: ActorId,
    ) -> Result<PageResponse<ExpenseView>, ExpenseError> {
        self.require_access(actor, Operation::View).await?;
        let page = filter.page_request(self.max_page_size);

        let (items, total) = self
            .store
            .list(filter, page)
            .await
            .map_err(|e| store_failure(Operation::View, e))?;

        Ok(PageResponse::new(items, page, total).map(|expense| expense.to_view()))
    }

    /// Totals over every expense matching the filter, ignoring pagination.
    pub async fn summarize(
        &self,
        filter: &ListFilter,
        actor: ActorId,
    ) -> Result<SummaryBlock, ExpenseError> {
        self.require_access(actor, Operation::Summarize).await?;
        let records = self
            .store
            .matching_records(filter)
            .await
            .map_err(|e| store_failure(Operation::Summarize, e))?;
        Ok(summarize(&records))
    }

    /// Requires financial-admin or top-level access. Returns whether the
    /// actor is a top-level approver.
    async fn require_access(&self, actor: ActorId, operation: Operation) -> Result<bool, ExpenseError> {
        let is_top = self
            .roles
            .is_top_level_approver(actor)
            .await
            .map_err(|e| store_failure(operation, e))?;
        if is_top {
            return Ok(true);
        }

        let is_admin = self
            .roles
            .has_financial_admin_access(actor)
            .await
            .map_err(|e| store_failure(operation, e))?;
        if is_admin {
            Ok(false)
        } else {
            Err(ExpenseError::Forbidden {
                actor_id: actor,
                operation,
            })
        }
    }

    async fn require_top_level(&self, actor: ActorId, operation: Operation) -> Result<(), ExpenseError> {
        let is_top = self
            .roles
            .is_top_level_approver(actor)
            .await
            .map_err(|e| store_failure(operation, e))?;
        if is_top {
            Ok(())
        } else {
            Err(ExpenseError::Forbidden {
                actor_id: actor,
                operation,
            })
        }
    }

    async fn load(&self, id: ExpenseId, operation: Operation) -> Result<ExpenseAggregate, ExpenseError> {
        self.store
            .find(id)
            .await
            .map_err(|e| store_failure(operation, e))?
            .ok_or(ExpenseError::NotFound(id))
    }

    async fn save(
        &self,
        expense: &ExpenseAggregate,
        expected: ApprovalStatus,
        operation: Operation,
    ) -> Result<(), ExpenseError> {
        self.store
            .update(expense, expected)
            .await
            .map_err(|e| store_failure(operation, e))
    }
}

fn decision(expense: &ExpenseAggregate, actor: ActorId, decision: ApprovalAction) -> DecisionOutcome {
    DecisionOutcome {
        expense: expense.to_view(),
        submitter: expense.submitter(),
        decided_by: actor,
        decision,
    }
}

fn store_failure(operation: Operation, err: StoreError) -> ExpenseError {
    match err {
        StoreError::NotFound(id) => ExpenseError::NotFound(id),
        StoreError::Conflict(id) => {
            warn!(expense_id = %id, %operation, "Concurrent modification detected");
            ExpenseError::ConcurrentModification(id)
        }
        StoreError::MissingDetail(_) | StoreError::OrphanDetail(_) | StoreError::Diverged { .. } => {
            error!(error = %err, %operation, "Expense rows are inconsistent");
            ExpenseError::ReferentialInconsistency(err.to_string())
        }
        StoreError::Backend(_) => {
            error!(error = %err, %operation, "Expense store operation failed");
            ExpenseError::OperationFailed {
                operation,
                source: err,
            }
        }
    }
}
