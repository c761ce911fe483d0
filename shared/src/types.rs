//! Common types used across the platform

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::UserRole;

/// The caller of an engine operation, as resolved by the session layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }
}

/// Who did something and when
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageStamp {
    pub by: Uuid,
    pub at: DateTime<Utc>,
}

impl StageStamp {
    pub fn new(by: Uuid, at: DateTime<Utc>) -> Self {
        Self { by, at }
    }

    pub fn now(actor: &Actor) -> Self {
        Self {
            by: actor.user_id,
            at: Utc::now(),
        }
    }
}
