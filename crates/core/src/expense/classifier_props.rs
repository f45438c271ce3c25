//! Property-based tests for the classification policy.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::classifier::{ClassificationPolicy, ThresholdPolicy, classify};
use super::types::{ApprovalStatus, RecordType};

/// Strategy to generate positive amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Top-level approvers self-approve whatever the amount and threshold.
    #[test]
    fn prop_top_level_always_approved(amount in positive_amount(), threshold in positive_amount()) {
        let outcome = classify(true, amount, threshold);
        prop_assert_eq!(outcome.record_type, RecordType::CompanyExpense);
        prop_assert!(!outcome.needs_approval);
        prop_assert_eq!(outcome.initial_status, ApprovalStatus::Approved);
    }

    /// Financial-admin submissions need approval exactly at or above the threshold.
    #[test]
    fn prop_admin_gated_by_threshold(amount in positive_amount(), threshold in positive_amount()) {
        let outcome = ThresholdPolicy::new(threshold).classify(false, amount);
        prop_assert_eq!(outcome.record_type, RecordType::ContractorExpense);
        prop_assert_eq!(outcome.needs_approval, amount >= threshold);
        let expected = if amount >= threshold {
            ApprovalStatus::Pending
        } else {
            ApprovalStatus::AutoApproved
        };
        prop_assert_eq!(outcome.initial_status, expected);
    }

    /// Only pending expenses need approval.
    #[test]
    fn prop_needs_approval_iff_pending(is_top in any::<bool>(), amount in positive_amount()) {
        let outcome = ThresholdPolicy::default().classify(is_top, amount);
        prop_assert_eq!(outcome.needs_approval, outcome.initial_status == ApprovalStatus::Pending);
    }
}
