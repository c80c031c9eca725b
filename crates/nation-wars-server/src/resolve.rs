//! Battle resolution against stored records.
//!
//! The pure math lives in `nation_wars_core::battle`; this module loads the
//! records under lock, applies the resolution in a fixed order and records
//! the battle log.

use crate::error::WarError;
use crate::locks::LockKey;
use crate::state::WarService;
use chrono::Utc;
use nation_wars_core::{
    resolve_with_rolls, AttackType, BattleContext, BattleLog, BattleRecord, BattleRole,
    MessageKind, UnitType, WarUpdate,
};
use nation_wars_store::{EntityStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Payload of a battle command.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResolveBattle {
    #[serde(default)]
    pub war_id: String,
    #[serde(default)]
    pub attack_type: Option<AttackType>,
    #[serde(default)]
    pub units_committed: BTreeMap<UnitType, u64>,
    #[serde(default)]
    pub selected_target: Option<String>,
}

/// What a successful battle produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BattleOutcome {
    pub battle_log: BattleLog,
    pub war_update: WarUpdate,
}

/// Tracks which writes of a battle have landed.
#[derive(Default)]
struct Progress {
    applied: Vec<&'static str>,
}

impl Progress {
    fn step(&mut self, stage: &'static str, result: Result<(), StoreError>) -> Result<(), WarError> {
        match result {
            Ok(()) => {
                self.applied.push(stage);
                Ok(())
            }
            Err(source) if self.applied.is_empty() => Err(WarError::Store(source)),
            Err(source) => {
                error!(
                    stage,
                    applied = ?self.applied,
                    error = %source,
                    "Battle partially applied; manual reconciliation required"
                );
                Err(WarError::ReconciliationRequired { stage, source })
            }
        }
    }
}

impl<S: EntityStore> WarService<S> {
    /// Resolve one battle action launched by the caller's nation.
    pub async fn resolve_battle(&self, caller: &str, request: ResolveBattle) -> Result<BattleOutcome, WarError> {
        let caller_nation = self.caller_nation(caller).await?;

        let mut missing = Vec::new();
        if request.war_id.trim().is_empty() {
            missing.push("war_id");
        }
        if request.attack_type.is_none() {
            missing.push("attack_type");
        }
        if !request.units_committed.values().any(|n| *n > 0) {
            missing.push("units_committed");
        }
        let attack_type = match request.attack_type {
            Some(attack_type) if missing.is_empty() => attack_type,
            _ => return Err(WarError::MissingFields(missing.join(", "))),
        };
        let war_id = request.war_id.trim();

        let war = self
            .store
            .get_war(war_id)
            .await?
            .ok_or_else(|| WarError::WarNotFound(war_id.to_string()))?;
        let _locks = self
            .locks
            .acquire([
                LockKey::war(war.id.as_str()),
                LockKey::nation(war.attacker_nation_id.as_str()),
                LockKey::nation(war.defender_nation_id.as_str()),
            ])
            .await;

        // Re-read everything now that no other battle can touch it.
        let mut war = self
            .store
            .get_war(war_id)
            .await?
            .ok_or_else(|| WarError::WarNotFound(war_id.to_string()))?;
        if !war.is_active() {
            return Err(WarError::WarNotActive {
                war_id: war.id,
                status: war.status,
            });
        }
        let roles = war.roles_for(&caller_nation.id).ok_or_else(|| WarError::NotCombatant {
            war_id: war.id.clone(),
            nation_id: caller_nation.id.clone(),
        })?;

        let acting_id = war.nation_id(roles.side(BattleRole::Acting)).clone();
        let target_id = war.nation_id(roles.side(BattleRole::Target)).clone();
        let acting = self
            .store
            .get_nation(&acting_id)
            .await?
            .ok_or_else(|| WarError::NationNotFound(acting_id.clone()))?;
        let target = self
            .store
            .get_nation(&target_id)
            .await?
            .ok_or_else(|| WarError::NationNotFound(target_id.clone()))?;
        let acting_military = self.store.get_military(&acting_id).await?;
        let target_military = self.store.get_military(&target_id).await?;

        let config = self.config.current();
        let resolution = resolve_with_rolls(
            &BattleContext {
                attack_type,
                units_committed: &request.units_committed,
                acting_military: acting_military.as_ref(),
                target_military: target_military.as_ref(),
                target_treasury: target.treasury,
            },
            &config,
            self.rolls.draw(),
        )?;
        if resolution.outcome_fallback {
            warn!(
                attack_type = %attack_type,
                final_roll = resolution.final_roll,
                outcome = %resolution.outcome,
                "No success level covers the roll; used the first level"
            );
        }

        // Nation and military records belong to the game, so only the
        // counters and balances a battle moves are written back.
        let mut progress = Progress::default();

        if !resolution.acting_losses.is_empty() && acting_military.is_some() {
            let result = self
                .store
                .apply_unit_losses(&acting_id, &resolution.acting_losses)
                .await;
            progress.step("acting_military", result)?;
        }
        if !resolution.target_losses.is_empty() && target_military.is_some() {
            let result = self
                .store
                .apply_unit_losses(&target_id, &resolution.target_losses)
                .await;
            progress.step("target_military", result)?;
        }

        let loot = resolution.loot.amount.min(target.treasury);
        if loot > 0 {
            let delta = i64::try_from(loot).unwrap_or(i64::MAX);
            let result = self.store.adjust_treasury(&target_id, -delta).await;
            progress.step("target_treasury", result)?;
            let result = self.store.adjust_treasury(&acting_id, delta).await;
            progress.step("acting_treasury", result)?;
        }

        let war_update = war.apply_battle(roles, &resolution);
        progress.step("war", self.store.update_war(&war).await)?;

        let now = Utc::now();
        let battle_log = BattleLog::record(
            uuid::Uuid::new_v4().to_string(),
            BattleRecord {
                war_id: &war.id,
                battle_number: war.total_battles,
                acting: &acting,
                target: &target,
                selected_target: request.selected_target.as_deref(),
                timestamp: now,
            },
            &resolution,
        );
        progress.step("battle_log", self.store.create_battle_log(&battle_log).await)?;

        info!(
            war_id = %war.id,
            battle_number = battle_log.battle_number,
            acting = %acting.id,
            target = %target.id,
            attack_type = %attack_type,
            outcome = %battle_log.outcome,
            final_roll = battle_log.final_roll,
            resistance_damage = war_update.resistance_damage,
            loot = battle_log.loot_gained,
            "Battle resolved"
        );

        self.notify(
            &target,
            Some(&acting),
            MessageKind::BattleReport,
            format!("{} launched a {} against you", acting.display_name(), attack_type),
            battle_log.summary(),
            now,
        )
        .await;

        Ok(BattleOutcome {
            battle_log,
            war_update,
        })
    }
}
