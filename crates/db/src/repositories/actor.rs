//! Actor repository: the role directory behind [`RoleResolver`].

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use expensa_core::expense::{RoleResolver, StoreError};
use expensa_shared::types::ActorId;

use crate::entities::{actors, sea_orm_active_enums::ActorRole};

/// Where to reach an actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContact {
    /// Actor ID.
    pub id: ActorId,
    /// Email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
}

impl From<actors::Model> for ActorContact {
    fn from(model: actors::Model) -> Self {
        Self {
            id: ActorId::from_uuid(model.id),
            email: model.email,
            display_name: model.display_name,
        }
    }
}

/// Actor repository for role and contact lookups.
#[derive(Debug, Clone)]
pub struct ActorRepository {
    db: DatabaseConnection,
}

impl ActorRepository {
    /// Creates a new actor repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new active actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        email: &str,
        display_name: &str,
        role: ActorRole,
    ) -> Result<actors::Model, DbErr> {
        let now = chrono::Utc::now().into();
        let actor = actors::ActiveModel {
            id: Set(uuid::Uuid::now_v7()),
            email: Set(email.to_string()),
            display_name: Set(display_name.to_string()),
            role: Set(role),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        actor.insert(&self.db).await
    }

    /// Returns the role of an active actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn active_role(&self, actor: ActorId) -> Result<Option<ActorRole>, DbErr> {
        Ok(actors::Entity::find_by_id(actor.into_inner())
            .filter(actors::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .map(|a| a.role))
    }

    /// Looks up the contact details of an active actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_contact(&self, actor: ActorId) -> Result<Option<ActorContact>, DbErr> {
        Ok(actors::Entity::find_by_id(actor.into_inner())
            .filter(actors::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .map(ActorContact::from))
    }

    /// Lists every active top-level approver.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn top_level_approvers(&self) -> Result<Vec<ActorContact>, DbErr> {
        Ok(actors::Entity::find()
            .filter(actors::Column::Role.eq(ActorRole::TopLevelApprover))
            .filter(actors::Column::IsActive.eq(true))
            .order_by_asc(actors::Column::Email)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ActorContact::from)
            .collect())
    }
}

/// Top-level approvers also pass the financial-admin check.
const fn grants_financial_admin(role: ActorRole) -> bool {
    matches!(role, ActorRole::FinancialAdmin | ActorRole::TopLevelApprover)
}

#[async_trait]
impl RoleResolver for ActorRepository {
    async fn is_top_level_approver(&self, actor: ActorId) -> Result<bool, StoreError> {
        self.active_role(actor)
            .await
            .map(|role| role == Some(ActorRole::TopLevelApprover))
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn has_financial_admin_access(&self, actor: ActorId) -> Result<bool, StoreError> {
        self.active_role(actor)
            .await
            .map(|role| role.is_some_and(grants_financial_admin))
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
