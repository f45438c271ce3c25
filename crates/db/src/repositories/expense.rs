//! Expense repository.
//!
//! Implements [`ExpenseStore`] on PostgreSQL. Every operation writes the
//! record and its detail inside one database transaction. Status-changing
//! writes are conditional on the status the caller loaded.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Condition;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use expensa_core::expense::{
    ApprovalStatus, EditHistoryEntry, ExpenseAggregate, ExpenseDetail, ExpenseRecord,
    ExpenseStore, ListFilter, StoreError,
};
use expensa_shared::types::{ActorId, ExpenseDetailId, ExpenseId, PageRequest};

use crate::entities::{expense_details, expense_records, sea_orm_active_enums};

/// Expense repository backed by `SeaORM`.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Builds the filter condition shared by listing and summaries.
#[must_use]
pub fn expense_condition(filter: &ListFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(category) = &filter.category {
        condition = condition.add(expense_records::Column::Category.eq(category.as_str()));
    }
    if let Some(status) = filter.approval_status {
        condition = condition.add(
            expense_records::Column::ApprovalStatus
                .eq(sea_orm_active_enums::ApprovalStatus::from(status)),
        );
    }
    if let Some(from) = filter.date_from {
        condition = condition.add(expense_records::Column::RecordDate.gte(from));
    }
    if let Some(to) = filter.date_to {
        condition = condition.add(expense_records::Column::RecordDate.lte(to));
    }

    condition
}

fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn to_utc(value: sea_orm::prelude::DateTimeWithTimeZone) -> chrono::DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn record_from_model(model: expense_records::Model) -> ExpenseRecord {
    ExpenseRecord {
        id: ExpenseId::from_uuid(model.id),
        record_type: model.record_type.into(),
        title: model.title,
        description: model.description,
        amount: model.amount,
        category: model.category,
        record_date: model.record_date,
        approval_status: model.approval_status.into(),
        needs_approval: model.needs_approval,
        created_by: ActorId::from_uuid(model.created_by),
        approved_by: model.approved_by.map(ActorId::from_uuid),
        approved_at: model.approved_at.map(to_utc),
        contractor_id: model.contractor_id.map(ActorId::from_uuid),
        created_at: to_utc(model.created_at),
        updated_at: to_utc(model.updated_at),
    }
}

fn detail_from_model(model: expense_details::Model) -> Result<ExpenseDetail, StoreError> {
    let attachment_urls: Vec<String> = serde_json::from_value(model.attachment_urls)
        .map_err(|e| StoreError::Backend(format!("invalid attachment_urls: {e}")))?;
    let edit_history: Vec<EditHistoryEntry> = serde_json::from_value(model.edit_history)
        .map_err(|e| StoreError::Backend(format!("invalid edit_history: {e}")))?;

    Ok(ExpenseDetail {
        id: ExpenseDetailId::from_uuid(model.id),
        financial_record_id: ExpenseId::from_uuid(model.financial_record_id),
        title: model.title,
        amount: model.amount,
        category: model.category,
        sub_category: model.sub_category,
        expense_date: model.expense_date,
        expense_type: model.expense_type,
        is_recurring: model.is_recurring,
        recurring_cycle: model.recurring_cycle,
        payment_method: model.payment_method,
        invoice_number: model.invoice_number,
        receipt_url: model.receipt_url,
        attachment_urls,
        tax_included: model.tax_included,
        tax_rate: model.tax_rate,
        approval_status: model.approval_status.into(),
        approved_by: model.approved_by.map(ActorId::from_uuid),
        approved_at: model.approved_at.map(to_utc),
        rejection_reason: model.rejection_reason,
        edit_history,
        created_at: to_utc(model.created_at),
        updated_at: to_utc(model.updated_at),
    })
}

fn assemble(
    record: expense_records::Model,
    detail: expense_details::Model,
) -> Result<ExpenseAggregate, StoreError> {
    ExpenseAggregate::from_rows(record_from_model(record), detail_from_model(detail)?)
}

/// Assembles a record joined with its detail. Both rows must come from the
/// same statement.
fn assemble_joined(
    (record, detail): (expense_records::Model, Option<expense_details::Model>),
) -> Result<ExpenseAggregate, StoreError> {
    let detail = detail.ok_or(StoreError::MissingDetail(ExpenseId::from_uuid(record.id)))?;
    assemble(record, detail)
}

async fn find_joined<C: ConnectionTrait>(
    conn: &C,
    id: ExpenseId,
) -> Result<Option<ExpenseAggregate>, StoreError> {
    expense_records::Entity::find_by_id(id.into_inner())
        .find_also_related(expense_details::Entity)
        .one(conn)
        .await
        .map_err(backend)?
        .map(assemble_joined)
        .transpose()
}

fn record_active(record: &ExpenseRecord) -> expense_records::ActiveModel {
    expense_records::ActiveModel {
        id: Set(record.id.into_inner()),
        record_type: Set(record.record_type.into()),
        title: Set(record.title.clone()),
        description: Set(record.description.clone()),
        amount: Set(record.amount),
        category: Set(record.category.clone()),
        record_date: Set(record.record_date),
        approval_status: Set(record.approval_status.into()),
        needs_approval: Set(record.needs_approval),
        created_by: Set(record.created_by.into_inner()),
        approved_by: Set(record.approved_by.map(ActorId::into_inner)),
        approved_at: Set(record.approved_at.map(Into::into)),
        contractor_id: Set(record.contractor_id.map(ActorId::into_inner)),
        created_at: Set(record.created_at.into()),
        updated_at: Set(record.updated_at.into()),
    }
}

fn detail_active(detail: &ExpenseDetail) -> Result<expense_details::ActiveModel, StoreError> {
    let attachment_urls =
        serde_json::to_value(&detail.attachment_urls).map_err(|e| StoreError::Backend(e.to_string()))?;
    let edit_history =
        serde_json::to_value(&detail.edit_history).map_err(|e| StoreError::Backend(e.to_string()))?;

    Ok(expense_details::ActiveModel {
        id: Set(detail.id.into_inner()),
        financial_record_id: Set(detail.financial_record_id.into_inner()),
        title: Set(detail.title.clone()),
        amount: Set(detail.amount),
        category: Set(detail.category.clone()),
        sub_category: Set(detail.sub_category.clone()),
        expense_date: Set(detail.expense_date),
        expense_type: Set(detail.expense_type.clone()),
        is_recurring: Set(detail.is_recurring),
        recurring_cycle: Set(detail.recurring_cycle.clone()),
        payment_method: Set(detail.payment_method.clone()),
        invoice_number: Set(detail.invoice_number.clone()),
        receipt_url: Set(detail.receipt_url.clone()),
        attachment_urls: Set(attachment_urls),
        tax_included: Set(detail.tax_included),
        tax_rate: Set(detail.tax_rate),
        approval_status: Set(detail.approval_status.into()),
        approved_by: Set(detail.approved_by.map(ActorId::into_inner)),
        approved_at: Set(detail.approved_at.map(Into::into)),
        rejection_reason: Set(detail.rejection_reason.clone()),
        edit_history: Set(edit_history),
        created_at: Set(detail.created_at.into()),
        updated_at: Set(detail.updated_at.into()),
    })
}

#[async_trait]
impl ExpenseStore for ExpenseRepository {
    async fn insert(&self, expense: &ExpenseAggregate) -> Result<(), StoreError> {
        let detail = detail_active(expense.detail())?;
        let txn = self.db.begin().await.map_err(backend)?;

        record_active(expense.record())
            .insert(&txn)
            .await
            .map_err(backend)?;
        detail.insert(&txn).await.map_err(backend)?;

        txn.commit().await.map_err(backend)?;
        debug!(expense_id = %expense.id(), "Inserted expense record and detail");
        Ok(())
    }

    async fn find(&self, id: ExpenseId) -> Result<Option<ExpenseAggregate>, StoreError> {
        find_joined(&self.db, id).await
    }

    async fn find_by_detail(
        &self,
        id: ExpenseDetailId,
    ) -> Result<Option<ExpenseAggregate>, StoreError> {
        let Some((detail, record)) = expense_details::Entity::find_by_id(id.into_inner())
            .find_also_related(expense_records::Entity)
            .one(&self.db)
            .await
            .map_err(backend)?
        else {
            return Ok(None);
        };
        let record = record.ok_or(StoreError::OrphanDetail(id))?;
        assemble(record, detail).map(Some)
    }

    async fn update(
        &self,
        expense: &ExpenseAggregate,
        expected: ApprovalStatus,
    ) -> Result<(), StoreError> {
        let mut record = record_active(expense.record());
        record.id = NotSet;
        record.created_at = NotSet;
        record.created_by = NotSet;

        let mut detail = detail_active(expense.detail())?;
        detail.id = NotSet;
        detail.financial_record_id = NotSet;
        detail.created_at = NotSet;

        let record_id = expense.id().into_inner();
        let txn = self.db.begin().await.map_err(backend)?;

        let updated = expense_records::Entity::update_many()
            .set(record)
            .filter(expense_records::Column::Id.eq(record_id))
            .filter(
                expense_records::Column::ApprovalStatus
                    .eq(sea_orm_active_enums::ApprovalStatus::from(expected)),
            )
            .exec(&txn)
            .await
            .map_err(backend)?;

        if updated.rows_affected != 1 {
            let exists = expense_records::Entity::find_by_id(record_id)
                .count(&txn)
                .await
                .map_err(backend)?
                > 0;
            return Err(if exists {
                StoreError::Conflict(expense.id())
            } else {
                StoreError::NotFound(expense.id())
            });
        }

        let updated = expense_details::Entity::update_many()
            .set(detail)
            .filter(expense_details::Column::Id.eq(expense.detail_id().into_inner()))
            .filter(expense_details::Column::FinancialRecordId.eq(record_id))
            .exec(&txn)
            .await
            .map_err(backend)?;

        if updated.rows_affected != 1 {
            return Err(StoreError::MissingDetail(expense.id()));
        }

        txn.commit().await.map_err(backend)?;
        debug!(expense_id = %expense.id(), from = %expected, to = %expense.status(), "Updated expense");
        Ok(())
    }

    async fn delete(&self, id: ExpenseId) -> Result<Option<ExpenseAggregate>, StoreError> {
        let txn = self.db.begin().await.map_err(backend)?;

        // FOR UPDATE cannot cover the nullable side of the join, so the
        // record row is locked first and the pair read afterwards.
        let locked = expense_records::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(backend)?;
        if locked.is_none() {
            return Ok(None);
        }
        let Some(expense) = find_joined(&txn, id).await? else {
            return Ok(None);
        };

        expense_details::Entity::delete_by_id(expense.detail_id().into_inner())
            .exec(&txn)
            .await
            .map_err(backend)?;
        expense_records::Entity::delete_by_id(id.into_inner())
            .exec(&txn)
            .await
            .map_err(backend)?;

        txn.commit().await.map_err(backend)?;
        debug!(expense_id = %id, "Deleted expense detail and record");
        Ok(Some(expense))
    }

    async fn list(
        &self,
        filter: &ListFilter,
        page: PageRequest,
    ) -> Result<(Vec<ExpenseAggregate>, u64), StoreError> {
        let condition = expense_condition(filter);

        let total = expense_records::Entity::find()
            .filter(condition.clone())
            .count(&self.db)
            .await
            .map_err(backend)?;

        let items = expense_records::Entity::find()
            .filter(condition)
            .find_also_related(expense_details::Entity)
            .order_by_desc(expense_records::Column::RecordDate)
            .order_by_desc(expense_records::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(assemble_joined)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((items, total))
    }

    async fn matching_records(&self, filter: &ListFilter) -> Result<Vec<ExpenseRecord>, StoreError> {
        let records = expense_records::Entity::find()
            .filter(expense_condition(filter))
            .all(&self.db)
            .await
            .map_err(backend)?;
        Ok(records.into_iter().map(record_from_model).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sea_orm::{DbBackend, QueryTrait};
    use uuid::Uuid;

    fn sql(filter: &ListFilter) -> String {
        expense_records::Entity::find()
            .filter(expense_condition(filter))
            .build(DbBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_empty_filter_has_no_where_clause() {
        assert!(!sql(&ListFilter::default()).contains("WHERE"));
    }

    #[test]
    fn test_filter_condition_covers_every_field() {
        let filter = ListFilter {
            category: Some("travel".to_string()),
            approval_status: Some(ApprovalStatus::AutoApproved),
            date_from: NaiveDate::from_ymd_opt(2026, 1, 1),
            date_to: NaiveDate::from_ymd_opt(2026, 1, 31),
            ..Default::default()
        };
        let sql = sql(&filter);
        assert!(sql.contains(r#""category" = 'travel'"#), "{sql}");
        assert!(sql.contains("auto_approved"), "{sql}");
        assert!(sql.contains(r#""record_date" >= '2026-01-01'"#), "{sql}");
        assert!(sql.contains(r#""record_date" <= '2026-01-31'"#), "{sql}");
    }

    #[test]
    fn test_find_reads_record_and_detail_in_one_statement() {
        let sql = expense_records::Entity::find_by_id(Uuid::nil())
            .find_also_related(expense_details::Entity)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#"LEFT JOIN "expense_details""#), "{sql}");
        assert!(sql.contains(r#""expense_details"."approval_status""#), "{sql}");
    }

    #[test]
    fn test_list_page_joins_details() {
        let filter = ListFilter {
            category: Some("travel".to_string()),
            ..Default::default()
        };
        let sql = expense_records::Entity::find()
            .filter(expense_condition(&filter))
            .find_also_related(expense_details::Entity)
            .order_by_desc(expense_records::Column::RecordDate)
            .limit(10)
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#"LEFT JOIN "expense_details""#), "{sql}");
        assert!(sql.contains("LIMIT 10"), "{sql}");
    }

    #[test]
    fn test_joined_row_without_detail_is_missing_detail() {
        let now = Utc::now();
        let record = expense_records::Model {
            id: Uuid::now_v7(),
            record_type: sea_orm_active_enums::RecordType::CompanyExpense,
            title: "Taxi".to_string(),
            description: None,
            amount: rust_decimal_macros::dec!(1),
            category: "travel".to_string(),
            record_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            approval_status: sea_orm_active_enums::ApprovalStatus::Pending,
            needs_approval: true,
            created_by: Uuid::now_v7(),
            approved_by: None,
            approved_at: None,
            contractor_id: None,
            created_at: now.into(),
            updated_at: now.into(),
        };
        let id = record.id;
        assert!(matches!(
            assemble_joined((record, None)),
            Err(StoreError::MissingDetail(missing)) if missing.into_inner() == id
        ));
    }

    #[test]
    fn test_detail_json_columns_round_trip() {
        let now = Utc::now();
        let detail = ExpenseDetail {
            id: ExpenseDetailId::new(),
            financial_record_id: ExpenseId::new(),
            title: "Taxi".to_string(),
            amount: rust_decimal_macros::dec!(12.50),
            category: "travel".to_string(),
            sub_category: None,
            expense_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            expense_type: None,
            is_recurring: false,
            recurring_cycle: None,
            payment_method: None,
            invoice_number: None,
            receipt_url: None,
            attachment_urls: vec!["https://files/a.pdf".to_string()],
            tax_included: false,
            tax_rate: None,
            approval_status: ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            edit_history: vec![],
            created_at: now,
            updated_at: now,
        };

        let active = detail_active(&detail).unwrap();
        let model = expense_details::Model {
            id: detail.id.into_inner(),
            financial_record_id: detail.financial_record_id.into_inner(),
            title: detail.title.clone(),
            amount: detail.amount,
            category: detail.category.clone(),
            sub_category: None,
            expense_date: detail.expense_date,
            expense_type: None,
            is_recurring: false,
            recurring_cycle: None,
            payment_method: None,
            invoice_number: None,
            receipt_url: None,
            attachment_urls: active.attachment_urls.unwrap(),
            tax_included: false,
            tax_rate: None,
            approval_status: sea_orm_active_enums::ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            edit_history: active.edit_history.unwrap(),
            created_at: now.into(),
            updated_at: now.into(),
        };

        assert_eq!(detail_from_model(model).unwrap(), detail);
    }

    #[test]
    fn test_malformed_history_is_backend_error() {
        let now = Utc::now();
        let model = expense_details::Model {
            id: Uuid::now_v7(),
            financial_record_id: Uuid::now_v7(),
            title: "Taxi".to_string(),
            amount: rust_decimal_macros::dec!(1),
            category: "travel".to_string(),
            sub_category: None,
            expense_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            expense_type: None,
            is_recurring: false,
            recurring_cycle: None,
            payment_method: None,
            invoice_number: None,
            receipt_url: None,
            attachment_urls: serde_json::json!([]),
            tax_included: false,
            tax_rate: None,
            approval_status: sea_orm_active_enums::ApprovalStatus::Pending,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            edit_history: serde_json::json!({"not": "a list"}),
            created_at: now.into(),
            updated_at: now.into(),
        };
        assert!(matches!(detail_from_model(model), Err(StoreError::Backend(_))));
    }
}
