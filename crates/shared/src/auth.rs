//! Authentication types for JWT access tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ActorId;

/// Issuer written into and required from every access token.
pub const TOKEN_ISSUER: &str = "expensa";

/// JWT claims for access tokens.
///
/// Only the actor identity is carried. Roles are resolved per request,
/// so revoking a role takes effect without reissuing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (actor ID).
    pub sub: Uuid,
    /// Issuer.
    pub iss: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates claims for an actor.
    #[must_use]
    pub fn new(actor: ActorId, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: actor.into_inner(),
            iss: TOKEN_ISSUER.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// The authenticated actor.
    #[must_use]
    pub const fn actor_id(&self) -> ActorId {
        ActorId::from_uuid(self.sub)
    }
}
