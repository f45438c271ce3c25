//! `SeaORM` Entity for expense_details table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ApprovalStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub financial_record_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub category: String,
    pub sub_category: Option<String>,
    pub expense_date: Date,
    pub expense_type: Option<String>,
    pub is_recurring: bool,
    pub recurring_cycle: Option<String>,
    pub payment_method: Option<String>,
    pub invoice_number: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub receipt_url: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub attachment_urls: Json,
    pub tax_included: bool,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub tax_rate: Option<Decimal>,
    pub approval_status: ApprovalStatus,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub edit_history: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expense_records::Entity",
        from = "Column::FinancialRecordId",
        to = "super::expense_records::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    ExpenseRecords,
}

impl Related<super::expense_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
