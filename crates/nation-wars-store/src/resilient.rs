//! Store decorator that routes every call through a [`RetryPolicy`].
//!
//! Backends are synchronous and may block on disk or a mutex, so each
//! attempt runs on tokio's blocking pool rather than on a runtime worker.
//!
//! Retried creates are not idempotent: a create that reached the backend
//! but reported a transient error is sent again. Backends reject the second
//! write with [`StoreError::Conflict`] when the id was already persisted.

use crate::retry::RetryPolicy;
use crate::store::{EntityStore, StoreError, WarFilter};
use nation_wars_core::{Alliance, BattleLog, Message, Military, Nation, UnitType, War};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Async view of an [`EntityStore`] with bounded retries.
pub struct ResilientStore<S> {
    inner: Arc<S>,
    policy: RetryPolicy,
}

impl<S: EntityStore> ResilientStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(inner),
            policy,
        }
    }

    /// The same backend behind a different policy.
    pub fn with_policy(self, policy: RetryPolicy) -> Self {
        Self {
            inner: self.inner,
            policy,
        }
    }

    /// The undecorated store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: Fn(&S) -> Result<T, StoreError> + Send + Sync + 'static,
    {
        let call = Arc::new(call);
        self.policy
            .run(operation, || {
                let store = Arc::clone(&self.inner);
                let call = Arc::clone(&call);
                async move {
                    match tokio::task::spawn_blocking(move || call(&*store)).await {
                        Ok(result) => result,
                        Err(err) => Err(StoreError::Backend(format!(
                            "{operation} task failed: {err}"
                        ))),
                    }
                }
            })
            .await
    }

    pub async fn nations_owned_by(&self, owner: &str) -> Result<Vec<Nation>, StoreError> {
        let owner = owner.to_owned();
        self.call("nations_owned_by", move |s| s.nations_owned_by(&owner))
            .await
    }

    pub async fn get_nation(&self, id: &str) -> Result<Option<Nation>, StoreError> {
        let id = id.to_owned();
        self.call("get_nation", move |s| s.get_nation(&id)).await
    }

    pub async fn put_nation(&self, nation: &Nation) -> Result<(), StoreError> {
        let nation = nation.clone();
        self.call("put_nation", move |s| s.put_nation(&nation)).await
    }

    pub async fn adjust_treasury(&self, nation_id: &str, delta: i64) -> Result<(), StoreError> {
        let nation_id = nation_id.to_owned();
        self.call("adjust_treasury", move |s| s.adjust_treasury(&nation_id, delta))
            .await
    }

    pub async fn get_military(&self, nation_id: &str) -> Result<Option<Military>, StoreError> {
        let nation_id = nation_id.to_owned();
        self.call("get_military", move |s| s.get_military(&nation_id))
            .await
    }

    pub async fn put_military(&self, military: &Military) -> Result<(), StoreError> {
        let military = military.clone();
        self.call("put_military", move |s| s.put_military(&military))
            .await
    }

    pub async fn apply_unit_losses(
        &self,
        nation_id: &str,
        losses: &BTreeMap<UnitType, u64>,
    ) -> Result<(), StoreError> {
        let nation_id = nation_id.to_owned();
        let losses = losses.clone();
        self.call("apply_unit_losses", move |s| {
            s.apply_unit_losses(&nation_id, &losses)
        })
        .await
    }

    pub async fn get_alliance(&self, id: &str) -> Result<Option<Alliance>, StoreError> {
        let id = id.to_owned();
        self.call("get_alliance", move |s| s.get_alliance(&id)).await
    }

    pub async fn put_alliance(&self, alliance: &Alliance) -> Result<(), StoreError> {
        let alliance = alliance.clone();
        self.call("put_alliance", move |s| s.put_alliance(&alliance))
            .await
    }

    pub async fn create_war(&self, war: &War) -> Result<(), StoreError> {
        let war = war.clone();
        self.call("create_war", move |s| s.create_war(&war)).await
    }

    pub async fn get_war(&self, id: &str) -> Result<Option<War>, StoreError> {
        let id = id.to_owned();
        self.call("get_war", move |s| s.get_war(&id)).await
    }

    pub async fn update_war(&self, war: &War) -> Result<(), StoreError> {
        let war = war.clone();
        self.call("update_war", move |s| s.update_war(&war)).await
    }

    pub async fn find_wars(&self, filter: &WarFilter) -> Result<Vec<War>, StoreError> {
        let filter = filter.clone();
        self.call("find_wars", move |s| s.find_wars(&filter)).await
    }

    pub async fn create_battle_log(&self, log: &BattleLog) -> Result<(), StoreError> {
        let log = log.clone();
        self.call("create_battle_log", move |s| s.create_battle_log(&log))
            .await
    }

    pub async fn battle_logs(&self, war_id: &str) -> Result<Vec<BattleLog>, StoreError> {
        let war_id = war_id.to_owned();
        self.call("battle_logs", move |s| s.battle_logs(&war_id)).await
    }

    pub async fn create_message(&self, message: &Message) -> Result<(), StoreError> {
        let message = message.clone();
        self.call("create_message", move |s| s.create_message(&message))
            .await
    }

    pub async fn messages_for(&self, nation_id: &str) -> Result<Vec<Message>, StoreError> {
        let nation_id = nation_id.to_owned();
        self.call("messages_for", move |s| s.messages_for(&nation_id))
            .await
    }
}
