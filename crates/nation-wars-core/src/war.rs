//! The war aggregate.
//!
//! A war is created once by a declaration and afterwards only changed by
//! battle actions (resistance, tactical points, counters) or by diplomacy
//! outside this crate (status, end date). Resistance and tactical pools only
//! ever go down after creation and never below zero.

use crate::battle::BattleResolution;
use crate::config::BalanceConfig;
use crate::losses::total_losses;
use crate::nation::Nation;
use crate::types::{AllianceId, BattleRole, NationId, RoleAssignment, WarId, WarSide, WarStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conflict between two nations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct War {
    pub id: WarId,
    pub attacker_nation_id: NationId,
    pub defender_nation_id: NationId,
    #[serde(default)]
    pub attacker_alliance_id: Option<AllianceId>,
    #[serde(default)]
    pub defender_alliance_id: Option<AllianceId>,
    pub status: WarStatus,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub war_reason: String,
    pub war_name: String,
    pub starting_resistance: f64,
    pub attacker_resistance_points: f64,
    pub defender_resistance_points: f64,
    pub attacker_tactical_points: u32,
    pub defender_tactical_points: u32,
    pub total_battles: u32,
    pub total_casualties_attacker: u64,
    pub total_casualties_defender: u64,
}

/// Inputs for creating a war.
#[derive(Clone, Copy, Debug)]
pub struct WarDeclaration<'a> {
    pub attacker: &'a Nation,
    pub defender: &'a Nation,
    pub reason: &'a str,
    pub war_name: Option<&'a str>,
}

/// Summary of how a battle changed the war.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WarUpdate {
    pub resistance_damage: f64,
    pub new_resistance: f64,
    pub tactical_points_remaining: u32,
}

impl War {
    /// Create a fresh active war with both sides at full strength.
    pub fn declare(
        id: impl Into<WarId>,
        declaration: WarDeclaration<'_>,
        config: &BalanceConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let war_name = match declaration.war_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "{} - {} War",
                declaration.attacker.display_name(),
                declaration.defender.display_name()
            ),
        };
        let resistance = config.initial_resistance;
        let tactical = config.starting_tactical_points();
        Self {
            id: id.into(),
            attacker_nation_id: declaration.attacker.id.clone(),
            defender_nation_id: declaration.defender.id.clone(),
            attacker_alliance_id: declaration.attacker.alliance_id.clone(),
            defender_alliance_id: declaration.defender.alliance_id.clone(),
            status: WarStatus::Active,
            start_date: now,
            end_date: None,
            war_reason: declaration.reason.trim().to_string(),
            war_name,
            starting_resistance: resistance,
            attacker_resistance_points: resistance,
            defender_resistance_points: resistance,
            attacker_tactical_points: tactical,
            defender_tactical_points: tactical,
            total_battles: 0,
            total_casualties_attacker: 0,
            total_casualties_defender: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == WarStatus::Active
    }

    /// Whether this war is between the two nations, in either direction.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.attacker_nation_id == a && self.defender_nation_id == b)
            || (self.attacker_nation_id == b && self.defender_nation_id == a)
    }

    /// Which recorded side a nation fights on.
    pub fn side_of(&self, nation_id: &str) -> Option<WarSide> {
        if self.attacker_nation_id == nation_id {
            Some(WarSide::Attacker)
        } else if self.defender_nation_id == nation_id {
            Some(WarSide::Defender)
        } else {
            None
        }
    }

    /// Resolve per-action roles for a caller's nation.
    pub fn roles_for(&self, nation_id: &str) -> Option<RoleAssignment> {
        self.side_of(nation_id).map(RoleAssignment::new)
    }

    pub fn nation_id(&self, side: WarSide) -> &NationId {
        match side {
            WarSide::Attacker => &self.attacker_nation_id,
            WarSide::Defender => &self.defender_nation_id,
        }
    }

    pub fn resistance(&self, side: WarSide) -> f64 {
        match side {
            WarSide::Attacker => self.attacker_resistance_points,
            WarSide::Defender => self.defender_resistance_points,
        }
    }

    pub fn tactical_points(&self, side: WarSide) -> u32 {
        match side {
            WarSide::Attacker => self.attacker_tactical_points,
            WarSide::Defender => self.defender_tactical_points,
        }
    }

    pub fn casualties(&self, side: WarSide) -> u64 {
        match side {
            WarSide::Attacker => self.total_casualties_attacker,
            WarSide::Defender => self.total_casualties_defender,
        }
    }

    fn resistance_mut(&mut self, side: WarSide) -> &mut f64 {
        match side {
            WarSide::Attacker => &mut self.attacker_resistance_points,
            WarSide::Defender => &mut self.defender_resistance_points,
        }
    }

    fn tactical_mut(&mut self, side: WarSide) -> &mut u32 {
        match side {
            WarSide::Attacker => &mut self.attacker_tactical_points,
            WarSide::Defender => &mut self.defender_tactical_points,
        }
    }

    fn casualties_mut(&mut self, side: WarSide) -> &mut u64 {
        match side {
            WarSide::Attacker => &mut self.total_casualties_attacker,
            WarSide::Defender => &mut self.total_casualties_defender,
        }
    }

    /// Apply a resolved battle to the counters.
    pub fn apply_battle(&mut self, roles: RoleAssignment, resolution: &BattleResolution) -> WarUpdate {
        let acting = roles.side(BattleRole::Acting);
        let target = roles.side(BattleRole::Target);

        let damage = resolution.resistance_damage.max(0.0);
        let resistance = self.resistance_mut(target);
        *resistance = (*resistance - damage).max(0.0);
        let new_resistance = *resistance;

        let tactical = self.tactical_mut(acting);
        *tactical = tactical.saturating_sub(resolution.action_cost);
        let tactical_points_remaining = *tactical;

        self.total_battles += 1;
        *self.casualties_mut(acting) += total_losses(&resolution.acting_losses);
        *self.casualties_mut(target) += total_losses(&resolution.target_losses);

        WarUpdate {
            resistance_damage: damage,
            new_resistance,
            tactical_points_remaining,
        }
    }

    /// A side whose resistance has collapsed to zero, if any.
    pub fn collapsed_side(&self) -> Option<WarSide> {
        [WarSide::Attacker, WarSide::Defender]
            .into_iter()
            .find(|side| self.resistance(*side) <= 0.0)
    }
}
