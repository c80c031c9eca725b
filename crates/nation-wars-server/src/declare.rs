//! War declaration.

use crate::error::WarError;
use crate::locks::LockKey;
use crate::state::WarService;
use chrono::Utc;
use nation_wars_core::{MessageKind, War, WarDeclaration, WarStatus};
use nation_wars_store::{EntityStore, WarFilter};
use serde::Deserialize;
use tracing::info;

/// Payload of a declaration command.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeclareWar {
    #[serde(default)]
    pub defender_nation_id: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub war_name: Option<String>,
}

impl<S: EntityStore> WarService<S> {
    /// Declare war on another nation on behalf of the caller.
    pub async fn declare_war(&self, caller: &str, request: DeclareWar) -> Result<War, WarError> {
        let attacker = self.caller_nation(caller).await?;

        let mut missing = Vec::new();
        if request.defender_nation_id.trim().is_empty() {
            missing.push("defender_nation_id");
        }
        if request.reason.trim().is_empty() {
            missing.push("reason");
        }
        if !missing.is_empty() {
            return Err(WarError::MissingFields(missing.join(", ")));
        }

        let defender_id = request.defender_nation_id.trim();
        if defender_id == attacker.id {
            return Err(WarError::SelfTarget);
        }
        let defender = self
            .store
            .get_nation(defender_id)
            .await?
            .ok_or_else(|| WarError::NationNotFound(defender_id.to_string()))?;

        let _locks = self
            .locks
            .acquire([LockKey::pair(attacker.id.as_str(), defender.id.as_str())])
            .await;

        let active = self
            .store
            .find_wars(&WarFilter::between(attacker.id.as_str(), defender.id.as_str()).with_status(WarStatus::Active))
            .await?;
        if !active.is_empty() {
            return Err(WarError::AlreadyAtWar(attacker.id, defender.id));
        }
        if attacker.shares_alliance_with(&defender) {
            return Err(WarError::AllianceProtected(attacker.id, defender.id));
        }

        let config = self.config.current();
        let now = Utc::now();
        let war = War::declare(
            uuid::Uuid::new_v4().to_string(),
            WarDeclaration {
                attacker: &attacker,
                defender: &defender,
                reason: &request.reason,
                war_name: request.war_name.as_deref(),
            },
            &config,
            now,
        );
        self.store.create_war(&war).await?;

        info!(
            war_id = %war.id,
            attacker = %attacker.id,
            defender = %defender.id,
            config_version = config.version,
            "War declared"
        );

        self.notify(
            &defender,
            Some(&attacker),
            MessageKind::WarDeclared,
            format!("{} has declared war on you", attacker.display_name()),
            format!("{}\n\nReason: {}", war.war_name, war.war_reason),
            now,
        )
        .await;
        self.notify(
            &attacker,
            None,
            MessageKind::WarDeclared,
            format!("You have declared war on {}", defender.display_name()),
            format!("{}\n\nReason: {}", war.war_name, war.war_reason),
            now,
        )
        .await;

        Ok(war)
    }
}
