//! Expense classification policy.
//!
//! Maps the submitting actor's role and the amount to the ledger type,
//! the approval requirement and the initial status.
//!
//! | actor              | amount         | record type        | needs approval | status        |
//! |--------------------|----------------|--------------------|----------------|---------------|
//! | top-level approver | any            | company_expense    | no             | approved      |
//! | financial admin    | below threshold| contractor_expense | no             | auto_approved |
//! | financial admin    | at or above    | contractor_expense | yes            | pending       |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{ApprovalStatus, RecordType};

/// Default auto-approval threshold (5000).
pub const DEFAULT_AUTO_APPROVAL_THRESHOLD: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

/// Outcome of classifying an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Ledger type.
    pub record_type: RecordType,
    /// Whether a top-level approver must review the expense.
    pub needs_approval: bool,
    /// Status the expense starts in.
    pub initial_status: ApprovalStatus,
}

/// Classifies an expense against an explicit threshold.
///
/// The threshold is inclusive: an amount equal to it needs approval.
#[must_use]
pub fn classify(is_top_level_approver: bool, amount: Decimal, threshold: Decimal) -> Classification {
    if is_top_level_approver {
        return Classification {
            record_type: RecordType::CompanyExpense,
            needs_approval: false,
            initial_status: ApprovalStatus::Approved,
        };
    }

    if amount < threshold {
        Classification {
            record_type: RecordType::ContractorExpense,
            needs_approval: false,
            initial_status: ApprovalStatus::AutoApproved,
        }
    } else {
        Classification {
            record_type: RecordType::ContractorExpense,
            needs_approval: true,
            initial_status: ApprovalStatus::Pending,
        }
    }
}

/// Injectable classification rule.
pub trait ClassificationPolicy: Send + Sync + std::fmt::Debug {
    /// Classifies an expense submitted (or edited) by an actor.
    fn classify(&self, is_top_level_approver: bool, amount: Decimal) -> Classification;
}

/// Policy gating financial-admin submissions on a fixed amount threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPolicy {
    threshold: Decimal,
}

impl ThresholdPolicy {
    /// Creates a policy with the given threshold.
    #[must_use]
    pub const fn new(threshold: Decimal) -> Self {
        Self { threshold }
    }

    /// Returns the configured threshold.
    #[must_use]
    pub const fn threshold(&self) -> Decimal {
        self.threshold
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_APPROVAL_THRESHOLD)
    }
}

impl ClassificationPolicy for ThresholdPolicy {
    fn classify(&self, is_top_level_approver: bool, amount: Decimal) -> Classification {
        classify(is_top_level_approver, amount, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_threshold_is_5000() {
        assert_eq!(DEFAULT_AUTO_APPROVAL_THRESHOLD, dec!(5000));
        assert_eq!(ThresholdPolicy::default().threshold(), dec!(5000));
    }

    #[rstest]
    #[case(dec!(0.01))]
    #[case(dec!(4999))]
    #[case(dec!(5000))]
    #[case(dec!(1000000))]
    fn test_top_level_approver_is_always_self_approved(#[case] amount: Decimal) {
        let outcome = ThresholdPolicy::default().classify(true, amount);
        assert_eq!(outcome.record_type, RecordType::CompanyExpense);
        assert!(!outcome.needs_approval);
        assert_eq!(outcome.initial_status, ApprovalStatus::Approved);
    }

    #[rstest]
    #[case(dec!(1), false, ApprovalStatus::AutoApproved)]
    #[case(dec!(4999), false, ApprovalStatus::AutoApproved)]
    #[case(dec!(4999.99), false, ApprovalStatus::AutoApproved)]
    #[case(dec!(5000), true, ApprovalStatus::Pending)]
    #[case(dec!(5000.00), true, ApprovalStatus::Pending)]
    #[case(dec!(6000), true, ApprovalStatus::Pending)]
    fn test_financial_admin_is_amount_gated(
        #[case] amount: Decimal,
        #[case] needs_approval: bool,
        #[case] status: ApprovalStatus,
    ) {
        let outcome = ThresholdPolicy::default().classify(false, amount);
        assert_eq!(outcome.record_type, RecordType::ContractorExpense);
        assert_eq!(outcome.needs_approval, needs_approval);
        assert_eq!(outcome.initial_status, status);
    }

    #[test]
    fn test_injected_threshold() {
        let policy = ThresholdPolicy::new(dec!(100));
        assert_eq!(
            policy.classify(false, dec!(99)).initial_status,
            ApprovalStatus::AutoApproved
        );
        assert_eq!(
            policy.classify(false, dec!(100)).initial_status,
            ApprovalStatus::Pending
        );
    }
}
