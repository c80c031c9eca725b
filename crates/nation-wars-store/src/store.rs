//! Entity store abstraction.
//!
//! The war engine reads and writes six record kinds through [`EntityStore`].
//! Backends are synchronous; retries and backoff are layered on top by
//! [`crate::ResilientStore`].

use nation_wars_core::{
    Alliance, BattleLog, Message, Military, Nation, NationId, UnitType, War, WarStatus,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Storage error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend asked us to slow down.
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// The backend is temporarily unreachable or busy.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// A record required for the operation does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    /// A record with the same identity already exists.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A lock guarding the backend was poisoned.
    #[error("Lock error: {0}")]
    Lock(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::RateLimited(_) | StoreError::Unavailable(_))
    }

    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Filter for war queries. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WarFilter {
    /// Both nations, in either attacker/defender order.
    pub between: Option<(NationId, NationId)>,
    /// A single nation on either side.
    pub involving: Option<NationId>,
    pub status: Option<WarStatus>,
}

impl WarFilter {
    /// Wars between two nations in either direction.
    pub fn between(a: impl Into<NationId>, b: impl Into<NationId>) -> Self {
        Self {
            between: Some((a.into(), b.into())),
            ..Default::default()
        }
    }

    /// Wars a nation takes part in.
    pub fn involving(nation: impl Into<NationId>) -> Self {
        Self {
            involving: Some(nation.into()),
            ..Default::default()
        }
    }

    /// Restrict to a status.
    pub fn with_status(mut self, status: WarStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Check whether a war matches this filter.
    pub fn matches(&self, war: &War) -> bool {
        if let Some((a, b)) = &self.between {
            if !war.is_between(a, b) {
                return false;
            }
        }
        if let Some(nation) = &self.involving {
            if war.side_of(nation).is_none() {
                return false;
            }
        }
        if let Some(status) = self.status {
            if war.status != status {
                return false;
            }
        }
        true
    }
}

/// CRUD and filtered queries over the records the war engine touches.
///
/// `put_*` methods upsert externally owned records. `create_*` methods fail
/// with [`StoreError::Conflict`] when the id already exists.
///
/// Nations and militaries belong to the wider game. The war engine changes
/// them only through the field-scoped [`EntityStore::adjust_treasury`] and
/// [`EntityStore::apply_unit_losses`], which leave every other field of the
/// stored record as it was.
pub trait EntityStore: Send + Sync + 'static {
    fn nations_owned_by(&self, owner: &str) -> Result<Vec<Nation>, StoreError>;
    fn get_nation(&self, id: &str) -> Result<Option<Nation>, StoreError>;
    fn put_nation(&self, nation: &Nation) -> Result<(), StoreError>;
    /// Add `delta` to a nation's treasury, stopping at zero.
    /// [`StoreError::NotFound`] if the nation does not exist.
    fn adjust_treasury(&self, nation_id: &str, delta: i64) -> Result<(), StoreError>;

    fn get_military(&self, nation_id: &str) -> Result<Option<Military>, StoreError>;
    fn put_military(&self, military: &Military) -> Result<(), StoreError>;
    /// Subtract losses from a nation's unit counters, stopping at zero.
    /// A nation without a military record has nothing to lose.
    fn apply_unit_losses(
        &self,
        nation_id: &str,
        losses: &BTreeMap<UnitType, u64>,
    ) -> Result<(), StoreError>;

    fn get_alliance(&self, id: &str) -> Result<Option<Alliance>, StoreError>;
    fn put_alliance(&self, alliance: &Alliance) -> Result<(), StoreError>;

    fn create_war(&self, war: &War) -> Result<(), StoreError>;
    fn get_war(&self, id: &str) -> Result<Option<War>, StoreError>;
    /// Replace an existing war; [`StoreError::NotFound`] if it does not exist.
    fn update_war(&self, war: &War) -> Result<(), StoreError>;
    fn find_wars(&self, filter: &WarFilter) -> Result<Vec<War>, StoreError>;

    fn create_battle_log(&self, log: &BattleLog) -> Result<(), StoreError>;
    /// Logs for a war ordered by battle number.
    fn battle_logs(&self, war_id: &str) -> Result<Vec<BattleLog>, StoreError>;

    fn create_message(&self, message: &Message) -> Result<(), StoreError>;
    /// Messages for a nation, oldest first.
    fn messages_for(&self, nation_id: &str) -> Result<Vec<Message>, StoreError>;
}
