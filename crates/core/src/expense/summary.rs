//! Summary aggregation over a filtered set of expense records.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::types::{CategoryBreakdown, ExpenseRecord, StatusAmounts, SummaryBlock};

/// Folds records into totals, per-status sums and per-category breakdowns.
///
/// Categories are ordered by amount, largest first, then by name.
pub fn summarize<'a, I>(records: I) -> SummaryBlock
where
    I: IntoIterator<Item = &'a ExpenseRecord>,
{
    let mut total_amount = Decimal::ZERO;
    let mut total_count = 0_u64;
    let mut per_status_amount = StatusAmounts::default();
    let mut categories: HashMap<&str, (Decimal, u64)> = HashMap::new();

    for record in records {
        total_amount += record.amount;
        total_count += 1;
        per_status_amount.add(record.approval_status, record.amount);

        let entry = categories
            .entry(record.category.as_str())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += record.amount;
        entry.1 += 1;
    }

    let mut per_category: Vec<CategoryBreakdown> = categories
        .into_iter()
        .map(|(category, (amount, count))| CategoryBreakdown {
            category: category.to_string(),
            amount,
            count,
        })
        .collect();
    per_category.sort_by(|a, b| {
        b.amount
            .cmp(&a.amount)
            .then_with(|| a.category.cmp(&b.category))
    });

    SummaryBlock {
        total_amount,
        total_count,
        per_status_amount,
        per_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expense::types::{ApprovalStatus, RecordType};
    use chrono::{NaiveDate, Utc};
    use expensa_shared::types::{ActorId, ExpenseId};
    use rust_decimal_macros::dec;

    fn record(category: &str, amount: Decimal, status: ApprovalStatus) -> ExpenseRecord {
        let now = Utc::now();
        ExpenseRecord {
            id: ExpenseId::new(),
            record_type: RecordType::ContractorExpense,
            title: "x".to_string(),
            description: None,
            amount,
            category: category.to_string(),
            record_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            approval_status: status,
            needs_approval: false,
            created_by: ActorId::new(),
            approved_by: None,
            approved_at: None,
            contractor_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&Vec::<ExpenseRecord>::new());
        assert_eq!(summary, SummaryBlock::default());
    }

    #[test]
    fn test_summary_totals_and_ordering() {
        let records = vec![
            record("travel", dec!(100), ApprovalStatus::Approved),
            record("meals", dec!(40.50), ApprovalStatus::Pending),
            record("travel", dec!(25), ApprovalStatus::Rejected),
            record("office", dec!(40.50), ApprovalStatus::AutoApproved),
        ];
        let summary = summarize(&records);

        assert_eq!(summary.total_amount, dec!(206.00));
        assert_eq!(summary.total_count, 4);
        assert_eq!(summary.per_status_amount.get(ApprovalStatus::Approved), dec!(100));
        assert_eq!(summary.per_status_amount.get(ApprovalStatus::Pending), dec!(40.50));
        assert_eq!(summary.per_status_amount.get(ApprovalStatus::Rejected), dec!(25));
        assert_eq!(
            summary.per_status_amount.get(ApprovalStatus::AutoApproved),
            dec!(40.50)
        );

        let names: Vec<_> = summary
            .per_category
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(names, vec!["travel", "meals", "office"]);
        assert_eq!(summary.per_category[0].count, 2);
        assert_eq!(summary.per_category[0].amount, dec!(125));
    }
}
