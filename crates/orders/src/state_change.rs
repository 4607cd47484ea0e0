use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::UserId;

/// Immutable audit entry appended on every successful transition.
///
/// Records are append-only: they are created by the transition pipeline and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeRecord {
    pub previous_state: String,
    pub next_state: String,
    /// Name of the event that caused the transition (e.g. `next`, `cancel`).
    pub name: String,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}
