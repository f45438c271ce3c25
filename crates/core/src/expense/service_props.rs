//! Property-based tests for the expense service.
//!
//! The summary total always equals the sum over the unpaged listing under
//! the same filter.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use expensa_shared::types::ActorId;

use super::memory::{InMemoryExpenseStore, StaticRoleResolver};
use super::service::ExpenseService;
use super::types::{ApprovalStatus, ListFilter, SubmitExpenseInput};

const CATEGORIES: [&str; 3] = ["travel", "meals", "office"];

#[derive(Debug, Clone)]
struct Submission {
    by_top: bool,
    amount: Decimal,
    category: usize,
    day: u32,
    reject: bool,
}

fn submission() -> impl Strategy<Value = Submission> {
    (
        any::<bool>(),
        (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2)),
        0..CATEGORIES.len(),
        1u32..=28,
        any::<bool>(),
    )
        .prop_map(|(by_top, amount, category, day, reject)| Submission {
            by_top,
            amount,
            category,
            day,
            reject,
        })
}

fn filter() -> impl Strategy<Value = ListFilter> {
    (
        prop::option::of(0..CATEGORIES.len()),
        prop::option::of(prop::sample::select(ApprovalStatus::ALL.to_vec())),
        prop::option::of(1u32..=28),
        prop::option::of(1u32..=28),
    )
        .prop_map(|(category, status, from, to)| ListFilter {
            category: category.map(|i| CATEGORIES[i].to_string()),
            approval_status: status,
            date_from: from.and_then(|d| NaiveDate::from_ymd_opt(2026, 4, d)),
            date_to: to.and_then(|d| NaiveDate::from_ymd_opt(2026, 4, d)),
            page: 1,
            page_size: 3,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_summary_matches_unpaged_listing(
        submissions in prop::collection::vec(submission(), 0..20),
        filter in filter(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (summary, listed_total, listed_count) = runtime.block_on(async {
            let top = ActorId::new();
            let admin = ActorId::new();
            let roles = StaticRoleResolver::new().with_top_level(top).with_financial_admin(admin);
            let service = ExpenseService::new(Arc::new(InMemoryExpenseStore::new()), Arc::new(roles));

            for s in &submissions {
                let input = SubmitExpenseInput {
                    title: "Generated".to_string(),
                    amount: s.amount,
                    category: CATEGORIES[s.category].to_string(),
                    expense_date: NaiveDate::from_ymd_opt(2026, 4, s.day),
                    ..Default::default()
                };
                let actor = if s.by_top { top } else { admin };
                let outcome = service.submit(input, actor).await.unwrap();
                if s.reject && outcome.expense.approval_status == ApprovalStatus::Pending {
                    service.reject(outcome.expense.id, top, Some("over budget")).await.unwrap();
                }
            }

            let summary = service.summarize(&filter, top).await.unwrap();

            let mut total = Decimal::ZERO;
            let mut count = 0u64;
            let mut page = filter.clone();
            loop {
                let result = service.list(&page, top).await.unwrap();
                total += result.items.iter().map(|e| e.amount).sum::<Decimal>();
                count += result.items.len() as u64;
                if u64::from(page.page) >= result.total_pages {
                    break;
                }
                page.page += 1;
            }
            (summary, total, count)
        });

        prop_assert_eq!(summary.total_amount, listed_total);
        prop_assert_eq!(summary.total_count, listed_count);

        let by_status: Decimal = ApprovalStatus::ALL
            .iter()
            .map(|s| summary.per_status_amount.get(*s))
            .sum();
        prop_assert_eq!(by_status, summary.total_amount);

        let by_category: Decimal = summary.per_category.iter().map(|c| c.amount).sum();
        prop_assert_eq!(by_category, summary.total_amount);
    }
}
