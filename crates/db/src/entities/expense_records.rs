//! `SeaORM` Entity for expense_records table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{ApprovalStatus, RecordType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub record_type: RecordType,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub category: String,
    pub record_date: Date,
    pub approval_status: ApprovalStatus,
    pub needs_approval: bool,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub contractor_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::expense_details::Entity")]
    ExpenseDetails,
    #[sea_orm(
        belongs_to = "super::actors::Entity",
        from = "Column::CreatedBy",
        to = "super::actors::Column::Id"
    )]
    Creator,
}

impl Related<super::expense_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
