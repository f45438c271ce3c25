//! Property-based tests for the expense aggregate.
//!
//! Any sequence of transitions, accepted or refused, leaves both rows in
//! agreement.

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use expensa_shared::types::ActorId;

use super::aggregate::ExpenseAggregate;
use super::classifier::{ClassificationPolicy, ThresholdPolicy};
use super::types::ApprovalStatus;
use super::validation::ValidatedExpense;

#[derive(Debug, Clone)]
enum Step {
    Approve,
    Reject,
    Edit { by_top: bool, amount: Decimal },
}

fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Approve),
        Just(Step::Reject),
        (any::<bool>(), positive_amount()).prop_map(|(by_top, amount)| Step::Edit { by_top, amount }),
    ]
}

fn fields(amount: Decimal) -> ValidatedExpense {
    ValidatedExpense {
        title: format!("Expense {amount}"),
        description: None,
        amount,
        category: "general".to_string(),
        sub_category: None,
        expense_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        expense_type: None,
        is_recurring: false,
        recurring_cycle: None,
        payment_method: None,
        invoice_number: None,
        receipt_url: None,
        attachment_urls: vec![],
        tax_included: false,
        tax_rate: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_rows_stay_mirrored(
        by_top in any::<bool>(),
        amount in positive_amount(),
        steps in prop::collection::vec(step(), 0..12),
    ) {
        let policy = ThresholdPolicy::default();
        let submitter = ActorId::new();
        let approver = ActorId::new();
        let now = Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap();

        let mut expense =
            ExpenseAggregate::create(fields(amount), submitter, policy.classify(by_top, amount), now);
        let mut edits = 0usize;

        for step in steps {
            let before = expense.status();
            let result = match step {
                Step::Approve => expense.approve(approver, now),
                Step::Reject => expense.reject(approver, "no".to_string(), now),
                Step::Edit { by_top, amount } => {
                    let editor = if by_top { approver } else { submitter };
                    let outcome = expense.apply_edit(fields(amount), editor, policy.classify(by_top, amount), now);
                    if outcome.is_ok() {
                        edits += 1;
                    }
                    outcome
                }
            };

            if result.is_err() {
                prop_assert_eq!(expense.status(), before);
            }
            prop_assert!(expense.is_mirrored());
            prop_assert_eq!(expense.detail().financial_record_id, expense.id());
            prop_assert_eq!(
                expense.record().approved_by.is_some(),
                expense.status() != ApprovalStatus::Pending
            );
        }

        prop_assert_eq!(expense.detail().edit_history.len(), edits);
    }
}
