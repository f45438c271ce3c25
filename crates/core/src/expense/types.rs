//! Expense domain types.
//!
//! An expense is stored as two physical rows: the canonical
//! [`ExpenseRecord`] and its extended [`ExpenseDetail`] projection. Both carry
//! the shared fields (title, amount, category, approval status and approval
//! stamps) and must always agree on them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use expensa_shared::types::{ActorId, ExpenseDetailId, ExpenseId, PageRequest};

/// Ledger type of an expense record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    /// Expense submitted by a top-level approver on behalf of the company.
    CompanyExpense,
    /// Expense submitted by a financial admin.
    ContractorExpense,
}

impl RecordType {
    /// Returns the string representation of the record type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CompanyExpense => "company_expense",
            Self::ContractorExpense => "contractor_expense",
        }
    }

    /// Parses a record type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "company_expense" => Some(Self::CompanyExpense),
            "contractor_expense" => Some(Self::ContractorExpense),
            _ => None,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval status of an expense.
///
/// The initial status is set by the classifier. The approval engine only
/// moves `Pending` to `Approved` or `Rejected`; every other status is
/// terminal for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for a top-level approver.
    Pending,
    /// Approved by a top-level approver (including self-approval).
    Approved,
    /// Below the threshold, approved without review.
    AutoApproved,
    /// Rejected by a top-level approver.
    Rejected,
}

impl ApprovalStatus {
    /// Every status, in reporting order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Approved,
        Self::AutoApproved,
        Self::Rejected,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::AutoApproved => "auto_approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "auto_approved" => Some(Self::AutoApproved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if the status carries an approver stamp.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved | Self::AutoApproved)
    }

    /// Returns true if the expense may still be edited.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        !matches!(self, Self::Approved)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation on the expense ledger, used in authorization and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create a new expense.
    Submit,
    /// Read one expense or a listing.
    View,
    /// Approve a pending expense.
    Approve,
    /// Reject a pending expense.
    Reject,
    /// Change business fields of an expense.
    Edit,
    /// Remove an expense.
    Delete,
    /// Compute totals over a filtered view.
    Summarize,
}

impl Operation {
    /// Returns the verb for this operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::View => "view",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Summarize => "summarize",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical ledger entity for an approvable expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Record ID.
    pub id: ExpenseId,
    /// Ledger type.
    pub record_type: RecordType,
    /// Short title.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Positive amount.
    pub amount: Decimal,
    /// Category.
    pub category: String,
    /// Date the expense was incurred.
    pub record_date: NaiveDate,
    /// Approval status.
    pub approval_status: ApprovalStatus,
    /// Whether a top-level approver must review the expense.
    pub needs_approval: bool,
    /// Actor who submitted the expense.
    pub created_by: ActorId,
    /// Actor who approved or rejected the expense.
    pub approved_by: Option<ActorId>,
    /// When the expense was approved or rejected.
    pub approved_at: Option<DateTime<Utc>>,
    /// Submitting contractor, set for contractor expenses.
    pub contractor_id: Option<ActorId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Business fields captured before and after an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSnapshot {
    /// Title.
    pub title: String,
    /// Amount.
    pub amount: Decimal,
    /// Category.
    pub category: String,
    /// Description.
    pub description: Option<String>,
    /// Expense date.
    pub expense_date: NaiveDate,
}

/// One append-only audit entry on the detail row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditHistoryEntry {
    /// When the edit happened.
    pub timestamp: DateTime<Utc>,
    /// Who made the edit.
    pub actor_id: ActorId,
    /// Values before the edit.
    pub previous_values: EditSnapshot,
    /// Values after the edit.
    pub new_values: EditSnapshot,
}

/// Extended metadata projection, 1:1 linked to an [`ExpenseRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDetail {
    /// Detail ID.
    pub id: ExpenseDetailId,
    /// Back-reference to the canonical record.
    pub financial_record_id: ExpenseId,
    /// Title (mirrored).
    pub title: String,
    /// Amount (mirrored).
    pub amount: Decimal,
    /// Category (mirrored).
    pub category: String,
    /// Optional sub-category.
    pub sub_category: Option<String>,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
    /// Free-form expense type.
    pub expense_type: Option<String>,
    /// Whether the expense repeats.
    pub is_recurring: bool,
    /// Recurrence cycle, e.g. "monthly".
    pub recurring_cycle: Option<String>,
    /// Payment method.
    pub payment_method: Option<String>,
    /// Invoice number.
    pub invoice_number: Option<String>,
    /// Receipt location.
    pub receipt_url: Option<String>,
    /// Additional attachments.
    pub attachment_urls: Vec<String>,
    /// Whether the amount already includes tax.
    pub tax_included: bool,
    /// Tax rate in percent.
    pub tax_rate: Option<Decimal>,
    /// Approval status (mirrored).
    pub approval_status: ApprovalStatus,
    /// Approver (mirrored).
    pub approved_by: Option<ActorId>,
    /// Approval time (mirrored).
    pub approved_at: Option<DateTime<Utc>>,
    /// Reason given on rejection.
    pub rejection_reason: Option<String>,
    /// Append-only audit log.
    pub edit_history: Vec<EditHistoryEntry>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Merged projection of an expense record and its detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseView {
    /// Record ID.
    pub id: ExpenseId,
    /// Detail ID.
    pub detail_id: ExpenseDetailId,
    /// Ledger type.
    pub record_type: RecordType,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Amount.
    pub amount: Decimal,
    /// Category.
    pub category: String,
    /// Sub-category.
    pub sub_category: Option<String>,
    /// Expense date.
    pub expense_date: NaiveDate,
    /// Expense type.
    pub expense_type: Option<String>,
    /// Recurring flag.
    pub is_recurring: bool,
    /// Recurrence cycle.
    pub recurring_cycle: Option<String>,
    /// Payment method.
    pub payment_method: Option<String>,
    /// Invoice number.
    pub invoice_number: Option<String>,
    /// Receipt location.
    pub receipt_url: Option<String>,
    /// Attachments.
    pub attachment_urls: Vec<String>,
    /// Tax included flag.
    pub tax_included: bool,
    /// Tax rate.
    pub tax_rate: Option<Decimal>,
    /// Approval status.
    pub approval_status: ApprovalStatus,
    /// Whether manual approval is required.
    pub needs_approval: bool,
    /// Submitter.
    pub created_by: ActorId,
    /// Contractor.
    pub contractor_id: Option<ActorId>,
    /// Approver.
    pub approved_by: Option<ActorId>,
    /// Approval time.
    pub approved_at: Option<DateTime<Utc>>,
    /// Rejection reason.
    pub rejection_reason: Option<String>,
    /// Audit log.
    pub edit_history: Vec<EditHistoryEntry>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for submitting an expense.
///
/// Required fields default to empty values so that a missing field is
/// reported by validation rather than by deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitExpenseInput {
    /// Title (required).
    #[serde(default)]
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Amount, must be positive.
    #[serde(default)]
    pub amount: Decimal,
    /// Category (required).
    #[serde(default)]
    pub category: String,
    /// Sub-category.
    #[serde(default)]
    pub sub_category: Option<String>,
    /// Expense date (required).
    #[serde(default)]
    pub expense_date: Option<NaiveDate>,
    /// Expense type.
    #[serde(default)]
    pub expense_type: Option<String>,
    /// Recurring flag.
    #[serde(default)]
    pub is_recurring: bool,
    /// Recurrence cycle, required when recurring.
    #[serde(default)]
    pub recurring_cycle: Option<String>,
    /// Payment method.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Invoice number.
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// Receipt location.
    #[serde(default)]
    pub receipt_url: Option<String>,
    /// Attachments.
    #[serde(default)]
    pub attachment_urls: Vec<String>,
    /// Tax included flag.
    #[serde(default)]
    pub tax_included: bool,
    /// Tax rate in percent (0-100).
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
}

/// Input for editing an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditExpenseInput {
    /// Record to edit.
    pub record_id: ExpenseId,
    /// Replacement business fields.
    #[serde(flatten)]
    pub fields: SubmitExpenseInput,
}

/// Approval decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalAction {
    /// Approve the expense.
    Approve,
    /// Reject the expense.
    Reject,
}

/// Input for an approval decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalActionInput {
    /// Record to decide on.
    pub record_id: ExpenseId,
    /// The decision.
    pub action: ApprovalAction,
    /// Reason, required when rejecting.
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Filter shared by the paged listing and the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    /// Exact category match.
    #[serde(default)]
    pub category: Option<String>,
    /// Exact status match.
    #[serde(default)]
    pub approval_status: Option<ApprovalStatus>,
    /// Earliest expense date (inclusive).
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    /// Latest expense date (inclusive).
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    /// Page number (1-indexed). Ignored by the summary.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size. Ignored by the summary.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            category: None,
            approval_status: None,
            date_from: None,
            date_to: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl ListFilter {
    /// Returns true if the record passes every criterion of the filter.
    ///
    /// Pagination fields do not take part in matching.
    #[must_use]
    pub fn matches(&self, record: &ExpenseRecord) -> bool {
        self.category
            .as_deref()
            .is_none_or(|category| record.category == category)
            && self
                .approval_status
                .is_none_or(|status| record.approval_status == status)
            && self.date_from.is_none_or(|from| record.record_date >= from)
            && self.date_to.is_none_or(|to| record.record_date <= to)
    }

    /// Returns the requested page, clamped to the allowed page size.
    #[must_use]
    pub fn page_request(&self, max_page_size: u32) -> PageRequest {
        PageRequest::new(self.page, self.page_size).clamped(max_page_size)
    }
}

/// Amounts per approval status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAmounts {
    /// Sum of pending expenses.
    pub pending: Decimal,
    /// Sum of approved expenses.
    pub approved: Decimal,
    /// Sum of auto-approved expenses.
    pub auto_approved: Decimal,
    /// Sum of rejected expenses.
    pub rejected: Decimal,
}

impl StatusAmounts {
    /// Returns the amount bucket for a status.
    #[must_use]
    pub const fn get(&self, status: ApprovalStatus) -> Decimal {
        match status {
            ApprovalStatus::Pending => self.pending,
            ApprovalStatus::Approved => self.approved,
            ApprovalStatus::AutoApproved => self.auto_approved,
            ApprovalStatus::Rejected => self.rejected,
        }
    }

    pub(crate) fn add(&mut self, status: ApprovalStatus, amount: Decimal) {
        let bucket = match status {
            ApprovalStatus::Pending => &mut self.pending,
            ApprovalStatus::Approved => &mut self.approved,
            ApprovalStatus::AutoApproved => &mut self.auto_approved,
            ApprovalStatus::Rejected => &mut self.rejected,
        };
        *bucket += amount;
    }
}

/// Amount and count for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    /// Category name.
    pub category: String,
    /// Sum of amounts.
    pub amount: Decimal,
    /// Number of expenses.
    pub count: u64,
}

/// Totals and breakdowns over a filtered view of the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryBlock {
    /// Sum of every matching amount.
    pub total_amount: Decimal,
    /// Number of matching expenses.
    pub total_count: u64,
    /// Sums per approval status.
    pub per_status_amount: StatusAmounts,
    /// Sums per category, largest first.
    pub per_category: Vec<CategoryBreakdown>,
}
