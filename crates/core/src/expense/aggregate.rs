//! The expense aggregate: one logical expense, two physical rows.
//!
//! Every mutation of a mirrored field (title, amount, category, approval
//! status, approver stamps) goes through this type and writes both rows,
//! so stores only ever persist pairs that agree.

use chrono::{DateTime, Utc};

use expensa_shared::types::{ActorId, ExpenseDetailId, ExpenseId};

use super::classifier::Classification;
use super::error::{ExpenseError, StoreError};
use super::types::{
    ApprovalStatus, EditHistoryEntry, EditSnapshot, ExpenseDetail, ExpenseRecord, ExpenseView,
    Operation, RecordType,
};
use super::validation::ValidatedExpense;

/// An expense record together with its detail row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseAggregate {
    record: ExpenseRecord,
    detail: ExpenseDetail,
}

fn contractor_for(record_type: RecordType, submitter: ActorId) -> Option<ActorId> {
    match record_type {
        RecordType::ContractorExpense => Some(submitter),
        RecordType::CompanyExpense => None,
    }
}

fn approval_stamp(
    status: ApprovalStatus,
    actor: ActorId,
    now: DateTime<Utc>,
) -> (Option<ActorId>, Option<DateTime<Utc>>) {
    if status.is_approved() {
        (Some(actor), Some(now))
    } else {
        (None, None)
    }
}

impl ExpenseAggregate {
    /// Builds a new expense from validated fields and its classification.
    ///
    /// Approved and auto-approved expenses are stamped with the submitter
    /// as approver.
    #[must_use]
    pub fn create(
        fields: ValidatedExpense,
        submitter: ActorId,
        classification: Classification,
        now: DateTime<Utc>,
    ) -> Self {
        let id = ExpenseId::new();
        let status = classification.initial_status;
        let (approved_by, approved_at) = approval_stamp(status, submitter, now);

        let record = ExpenseRecord {
            id,
            record_type: classification.record_type,
            title: fields.title.clone(),
            description: fields.description,
            amount: fields.amount,
            category: fields.category.clone(),
            record_date: fields.expense_date,
            approval_status: status,
            needs_approval: classification.needs_approval,
            created_by: submitter,
            approved_by,
            approved_at,
            contractor_id: contractor_for(classification.record_type, submitter),
            created_at: now,
            updated_at: now,
        };

        let detail = ExpenseDetail {
            id: ExpenseDetailId::new(),
            financial_record_id: id,
            title: fields.title,
            amount: fields.amount,
            category: fields.category,
            sub_category: fields.sub_category,
            expense_date: fields.expense_date,
            expense_type: fields.expense_type,
            is_recurring: fields.is_recurring,
            recurring_cycle: fields.recurring_cycle,
            payment_method: fields.payment_method,
            invoice_number: fields.invoice_number,
            receipt_url: fields.receipt_url,
            attachment_urls: fields.attachment_urls,
            tax_included: fields.tax_included,
            tax_rate: fields.tax_rate,
            approval_status: status,
            approved_by,
            approved_at,
            rejection_reason: None,
            edit_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        Self { record, detail }
    }

    /// Reassembles an aggregate from stored rows.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Diverged` if the detail does not point at the
    /// record or a mirrored field differs.
    pub fn from_rows(record: ExpenseRecord, detail: ExpenseDetail) -> Result<Self, StoreError> {
        let aggregate = Self { record, detail };
        if let Some(field) = aggregate.diverged_field() {
            return Err(StoreError::Diverged {
                record_id: aggregate.record.id,
                field,
            });
        }
        Ok(aggregate)
    }

    fn diverged_field(&self) -> Option<&'static str> {
        let (r, d) = (&self.record, &self.detail);
        if d.financial_record_id != r.id {
            Some("financial_record_id")
        } else if r.title != d.title {
            Some("title")
        } else if r.amount != d.amount {
            Some("amount")
        } else if r.category != d.category {
            Some("category")
        } else if r.approval_status != d.approval_status {
            Some("approval_status")
        } else if r.approved_by != d.approved_by {
            Some("approved_by")
        } else if r.approved_at != d.approved_at {
            Some("approved_at")
        } else {
            None
        }
    }

    /// Returns true if both rows agree on every mirrored field.
    #[must_use]
    pub fn is_mirrored(&self) -> bool {
        self.diverged_field().is_none()
    }

    /// Record ID.
    #[must_use]
    pub const fn id(&self) -> ExpenseId {
        self.record.id
    }

    /// Detail ID.
    #[must_use]
    pub const fn detail_id(&self) -> ExpenseDetailId {
        self.detail.id
    }

    /// Current approval status.
    #[must_use]
    pub const fn status(&self) -> ApprovalStatus {
        self.record.approval_status
    }

    /// Original submitter.
    #[must_use]
    pub const fn submitter(&self) -> ActorId {
        self.record.created_by
    }

    /// The canonical record row.
    #[must_use]
    pub const fn record(&self) -> &ExpenseRecord {
        &self.record
    }

    /// The detail row.
    #[must_use]
    pub const fn detail(&self) -> &ExpenseDetail {
        &self.detail
    }

    fn set_status(
        &mut self,
        status: ApprovalStatus,
        approved_by: Option<ActorId>,
        approved_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        self.record.approval_status = status;
        self.record.approved_by = approved_by;
        self.record.approved_at = approved_at;
        self.record.updated_at = now;

        self.detail.approval_status = status;
        self.detail.approved_by = approved_by;
        self.detail.approved_at = approved_at;
        self.detail.updated_at = now;
    }

    fn ensure_pending(&self, operation: Operation) -> Result<(), ExpenseError> {
        if self.status() == ApprovalStatus::Pending {
            Ok(())
        } else {
            Err(ExpenseError::InvalidStateTransition {
                from: self.status(),
                operation,
            })
        }
    }

    /// Approves a pending expense.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::InvalidStateTransition` if the expense is not pending.
    pub fn approve(&mut self, approver: ActorId, now: DateTime<Utc>) -> Result<(), ExpenseError> {
        self.ensure_pending(Operation::Approve)?;
        self.set_status(ApprovalStatus::Approved, Some(approver), Some(now), now);
        Ok(())
    }

    /// Rejects a pending expense. The reason is kept on the detail row only.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::InvalidStateTransition` if the expense is not pending.
    pub fn reject(
        &mut self,
        approver: ActorId,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(), ExpenseError> {
        self.ensure_pending(Operation::Reject)?;
        self.set_status(ApprovalStatus::Rejected, Some(approver), Some(now), now);
        self.detail.rejection_reason = Some(reason);
        Ok(())
    }

    fn snapshot(&self) -> EditSnapshot {
        EditSnapshot {
            title: self.record.title.clone(),
            amount: self.record.amount,
            category: self.record.category.clone(),
            description: self.record.description.clone(),
            expense_date: self.record.record_date,
        }
    }

    /// Replaces the business fields, applies the new classification and
    /// appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseError::InvalidStateTransition` if the expense is approved.
    pub fn apply_edit(
        &mut self,
        fields: ValidatedExpense,
        editor: ActorId,
        classification: Classification,
        now: DateTime<Utc>,
    ) -> Result<(), ExpenseError> {
        if !self.status().is_editable() {
            return Err(ExpenseError::InvalidStateTransition {
                from: self.status(),
                operation: Operation::Edit,
            });
        }

        let previous_values = self.snapshot();

        self.record.record_type = classification.record_type;
        self.record.needs_approval = classification.needs_approval;
        self.record.contractor_id = contractor_for(classification.record_type, self.record.created_by);
        self.record.description = fields.description;
        self.record.record_date = fields.expense_date;

        self.record.title.clone_from(&fields.title);
        self.detail.title = fields.title;
        self.record.amount = fields.amount;
        self.detail.amount = fields.amount;
        self.record.category.clone_from(&fields.category);
        self.detail.category = fields.category;

        self.detail.sub_category = fields.sub_category;
        self.detail.expense_date = fields.expense_date;
        self.detail.expense_type = fields.expense_type;
        self.detail.is_recurring = fields.is_recurring;
        self.detail.recurring_cycle = fields.recurring_cycle;
        self.detail.payment_method = fields.payment_method;
        self.detail.invoice_number = fields.invoice_number;
        self.detail.receipt_url = fields.receipt_url;
        self.detail.attachment_urls = fields.attachment_urls;
        self.detail.tax_included = fields.tax_included;
        self.detail.tax_rate = fields.tax_rate;
        self.detail.rejection_reason = None;

        let status = classification.initial_status;
        let (approved_by, approved_at) = approval_stamp(status, editor, now);
        self.set_status(status, approved_by, approved_at, now);

        let new_values = self.snapshot();
        self.detail.edit_history.push(EditHistoryEntry {
            timestamp: now,
            actor_id: editor,
            previous_values,
            new_values,
        });

        Ok(())
    }

    /// Merged projection of both rows.
    #[must_use]
    pub fn to_view(&self) -> ExpenseView {
        let (r, d) = (&self.record, &self.detail);
        ExpenseView {
            id: r.id,
            detail_id: d.id,
            record_type: r.record_type,
            title: r.title.clone(),
            description: r.description.clone(),
            amount: r.amount,
            category: r.category.clone(),
            sub_category: d.sub_category.clone(),
            expense_date: d.expense_date,
            expense_type: d.expense_type.clone(),
            is_recurring: d.is_recurring,
            recurring_cycle: d.recurring_cycle.clone(),
            payment_method: d.payment_method.clone(),
            invoice_number: d.invoice_number.clone(),
            receipt_url: d.receipt_url.clone(),
            attachment_urls: d.attachment_urls.clone(),
            tax_included: d.tax_included,
            tax_rate: d.tax_rate,
            approval_status: r.approval_status,
            needs_approval: r.needs_approval,
            created_by: r.created_by,
            contractor_id: r.contractor_id,
            approved_by: r.approved_by,
            approved_at: r.approved_at,
            rejection_reason: d.rejection_reason.clone(),
            edit_history: d.edit_history.clone(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
