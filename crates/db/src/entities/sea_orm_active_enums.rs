//! `SeaORM` active enums for the PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use expensa_core::expense::types as core;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "record_type")]
pub enum RecordType {
    #[sea_orm(string_value = "company_expense")]
    CompanyExpense,
    #[sea_orm(string_value = "contractor_expense")]
    ContractorExpense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "approval_status")]
pub enum ApprovalStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "auto_approved")]
    AutoApproved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "actor_role")]
pub enum ActorRole {
    #[sea_orm(string_value = "top_level_approver")]
    TopLevelApprover,
    #[sea_orm(string_value = "financial_admin")]
    FinancialAdmin,
    #[sea_orm(string_value = "member")]
    Member,
}

impl From<core::RecordType> for RecordType {
    fn from(value: core::RecordType) -> Self {
        match value {
            core::RecordType::CompanyExpense => Self::CompanyExpense,
            core::RecordType::ContractorExpense => Self::ContractorExpense,
        }
    }
}

impl From<RecordType> for core::RecordType {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::CompanyExpense => Self::CompanyExpense,
            RecordType::ContractorExpense => Self::ContractorExpense,
        }
    }
}

impl From<core::ApprovalStatus> for ApprovalStatus {
    fn from(value: core::ApprovalStatus) -> Self {
        match value {
            core::ApprovalStatus::Pending => Self::Pending,
            core::ApprovalStatus::Approved => Self::Approved,
            core::ApprovalStatus::AutoApproved => Self::AutoApproved,
            core::ApprovalStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<ApprovalStatus> for core::ApprovalStatus {
    fn from(value: ApprovalStatus) -> Self {
        match value {
            ApprovalStatus::Pending => Self::Pending,
            ApprovalStatus::Approved => Self::Approved,
            ApprovalStatus::AutoApproved => Self::AutoApproved,
            ApprovalStatus::Rejected => Self::Rejected,
        }
    }
}
