//! Shared service state.
//!
//! [`WarService`] owns everything a command needs: the resilient store, the
//! injected configuration provider, the lock table and the source of battle
//! randomness. Declaration and resolution live in their own modules as
//! further `impl` blocks.

use crate::error::WarError;
use crate::locks::LockTable;
use crate::provider::ConfigProvider;
use chrono::{DateTime, Utc};
use nation_wars_core::{Message, MessageKind, Nation, Rolls};
use nation_wars_store::{EntityStore, ResilientStore, RetryPolicy};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Source of the random draws for one battle action.
pub trait RollSource: Send + Sync {
    fn draw(&self) -> Rolls;
}

/// Rolls from a seedable RNG.
pub struct RngRolls {
    rng: Mutex<StdRng>,
}

impl RngRolls {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RollSource for RngRolls {
    fn draw(&self) -> Rolls {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Rolls::draw(&mut *rng)
    }
}

/// The same rolls every time.
#[derive(Clone, Copy, Debug)]
pub struct FixedRolls(pub Rolls);

impl RollSource for FixedRolls {
    fn draw(&self) -> Rolls {
        self.0
    }
}

/// War declaration and battle resolution over an entity store.
pub struct WarService<S> {
    pub(crate) store: ResilientStore<S>,
    pub(crate) config: Arc<dyn ConfigProvider>,
    pub(crate) locks: LockTable,
    pub(crate) rolls: Arc<dyn RollSource>,
}

impl<S: EntityStore> WarService<S> {
    pub fn new(store: S, config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            store: ResilientStore::new(store, RetryPolicy::default()),
            config,
            locks: LockTable::new(),
            rolls: Arc::new(RngRolls::from_entropy()),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.store = self.store.with_policy(policy);
        self
    }

    pub fn with_rolls(mut self, rolls: Arc<dyn RollSource>) -> Self {
        self.rolls = rolls;
        self
    }

    pub fn store(&self) -> &ResilientStore<S> {
        &self.store
    }

    /// Resolve a caller identity to the single nation it owns.
    pub(crate) async fn caller_nation(&self, caller: &str) -> Result<Nation, WarError> {
        if caller.trim().is_empty() {
            return Err(WarError::Unauthenticated);
        }
        let mut owned = self.store.nations_owned_by(caller).await?;
        match owned.len() {
            0 => Err(WarError::MissingNation),
            1 => Ok(owned.remove(0)),
            n => Err(WarError::MultipleNations(n)),
        }
    }

    /// Create a message, logging instead of failing.
    pub(crate) async fn notify(
        &self,
        recipient: &Nation,
        sender: Option<&Nation>,
        kind: MessageKind,
        subject: String,
        body: String,
        now: DateTime<Utc>,
    ) {
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            recipient_nation_id: recipient.id.clone(),
            sender_nation_id: sender.map(|n| n.id.clone()),
            kind,
            subject,
            body,
            created_at: now,
            read: false,
        };
        if let Err(err) = self.store.create_message(&message).await {
            warn!(
                recipient = %recipient.id,
                kind = ?kind,
                error = %err,
                "Failed to deliver notification"
            );
        }
    }
}
