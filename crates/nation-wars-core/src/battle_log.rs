//! Immutable record of one resolved battle action.

use crate::battle::{BattleResolution, PowerBand};
use crate::nation::Nation;
use crate::types::{AttackType, BattleLogId, NationId, UnitType, WarId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Append-only log entry for a battle.
///
/// `attacker_*` fields describe the nation that acted in this battle, which
/// may be the war's recorded defender.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleLog {
    pub id: BattleLogId,
    pub war_id: WarId,
    /// 1-based and monotonic within a war.
    pub battle_number: u32,
    pub timestamp: DateTime<Utc>,
    pub attack_type: AttackType,
    pub attacker_nation_id: NationId,
    pub attacker_nation_name: String,
    pub defender_nation_id: NationId,
    pub defender_nation_name: String,
    pub attacker_power: f64,
    pub defender_power: f64,
    pub power_ratio: f64,
    pub power_band: PowerBand,
    pub roll_modifier: i32,
    pub base_roll: i32,
    pub final_roll: i32,
    pub outcome: String,
    pub outcome_multiplier: f64,
    pub resistance_damage: f64,
    pub attacker_losses: BTreeMap<UnitType, u64>,
    pub defender_losses: BTreeMap<UnitType, u64>,
    pub loot_gained: u64,
    pub units_committed: BTreeMap<UnitType, u64>,
    #[serde(default)]
    pub selected_target: Option<String>,
}

/// Participants and bookkeeping for a log entry.
#[derive(Clone, Copy, Debug)]
pub struct BattleRecord<'a> {
    pub war_id: &'a str,
    pub battle_number: u32,
    pub acting: &'a Nation,
    pub target: &'a Nation,
    pub selected_target: Option<&'a str>,
    pub timestamp: DateTime<Utc>,
}

impl BattleLog {
    /// Capture every computed value of a resolution.
    pub fn record(id: impl Into<BattleLogId>, record: BattleRecord<'_>, resolution: &BattleResolution) -> Self {
        Self {
            id: id.into(),
            war_id: record.war_id.to_string(),
            battle_number: record.battle_number,
            timestamp: record.timestamp,
            attack_type: resolution.attack_type,
            attacker_nation_id: record.acting.id.clone(),
            attacker_nation_name: record.acting.display_name().to_string(),
            defender_nation_id: record.target.id.clone(),
            defender_nation_name: record.target.display_name().to_string(),
            attacker_power: resolution.acting_power,
            defender_power: resolution.target_power,
            power_ratio: resolution.power_ratio,
            power_band: resolution.power_band,
            roll_modifier: resolution.roll_modifier,
            base_roll: resolution.base_roll,
            final_roll: resolution.final_roll,
            outcome: resolution.outcome.clone(),
            outcome_multiplier: resolution.outcome_multiplier,
            resistance_damage: resolution.resistance_damage,
            attacker_losses: resolution.acting_losses.clone(),
            defender_losses: resolution.target_losses.clone(),
            loot_gained: resolution.loot.amount,
            units_committed: resolution.units_committed.clone(),
            selected_target: record.selected_target.map(str::to_string),
        }
    }

    /// One-line human readable summary for notifications.
    pub fn summary(&self) -> String {
        format!(
            "Battle #{}: {} launched a {} against {} ({}, roll {}). Resistance damage {:.1}, loot {}.",
            self.battle_number,
            self.attacker_nation_name,
            self.attack_type,
            self.defender_nation_name,
            self.outcome,
            self.final_roll,
            self.resistance_damage,
            self.loot_gained,
        )
    }
}
