//! Core type aliases and enums used throughout the crate.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Unique identifier for a nation.
pub type NationId = String;

/// Unique identifier for a war.
pub type WarId = String;

/// Unique identifier for an alliance.
pub type AllianceId = String;

/// Unique identifier for a military record.
pub type MilitaryId = String;

/// Unique identifier for a battle log entry.
pub type BattleLogId = String;

/// Unique identifier for a message.
pub type MessageId = String;

/// Identity of an authenticated caller (the owner of a nation).
pub type CallerId = String;

/// The six fixed unit categories every military tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Soldiers,
    Tanks,
    Aircraft,
    Warships,
    Artillery,
    NuclearWeapons,
}

impl UnitType {
    /// Get all unit type variants.
    pub const fn all() -> &'static [UnitType] {
        &[
            UnitType::Soldiers,
            UnitType::Tanks,
            UnitType::Aircraft,
            UnitType::Warships,
            UnitType::Artillery,
            UnitType::NuclearWeapons,
        ]
    }

    /// Get the storage key for this unit type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            UnitType::Soldiers => "soldiers",
            UnitType::Tanks => "tanks",
            UnitType::Aircraft => "aircraft",
            UnitType::Warships => "warships",
            UnitType::Artillery => "artillery",
            UnitType::NuclearWeapons => "nuclear_weapons",
        }
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("unit type", s))
    }
}

/// Kinds of battle action a nation can launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    GroundBattle,
    AirStrike,
    NavalBattle,
    Bombardment,
    NuclearStrike,
}

impl AttackType {
    /// Get all attack type variants.
    pub const fn all() -> &'static [AttackType] {
        &[
            AttackType::GroundBattle,
            AttackType::AirStrike,
            AttackType::NavalBattle,
            AttackType::Bombardment,
            AttackType::NuclearStrike,
        ]
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AttackType::GroundBattle => "ground_battle",
            AttackType::AirStrike => "air_strike",
            AttackType::NavalBattle => "naval_battle",
            AttackType::Bombardment => "bombardment",
            AttackType::NuclearStrike => "nuclear_strike",
        }
    }
}

impl std::fmt::Display for AttackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttackType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttackType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("attack type", s))
    }
}

/// Lifecycle status of a war.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WarStatus {
    #[default]
    Active,
    AttackerVictory,
    DefenderVictory,
    PeaceTreaty,
    Stalemate,
    Ceasefire,
}

impl WarStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            WarStatus::Active => "active",
            WarStatus::AttackerVictory => "attacker_victory",
            WarStatus::DefenderVictory => "defender_victory",
            WarStatus::PeaceTreaty => "peace_treaty",
            WarStatus::Stalemate => "stalemate",
            WarStatus::Ceasefire => "ceasefire",
        }
    }
}

impl std::fmt::Display for WarStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WarStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            WarStatus::Active,
            WarStatus::AttackerVictory,
            WarStatus::DefenderVictory,
            WarStatus::PeaceTreaty,
            WarStatus::Stalemate,
            WarStatus::Ceasefire,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| UnknownVariant::new("war status", s))
    }
}

/// A side as recorded on the war aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarSide {
    Attacker,
    Defender,
}

impl WarSide {
    /// The other side of the war.
    pub const fn opposite(&self) -> WarSide {
        match self {
            WarSide::Attacker => WarSide::Defender,
            WarSide::Defender => WarSide::Attacker,
        }
    }
}

/// Role a combatant plays in a single battle action.
///
/// Roles are resolved fresh for every action from the caller's identity, so
/// either recorded side of a war may act against the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleRole {
    Acting,
    Target,
}

/// Maps the per-action roles onto the war's recorded sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleAssignment {
    acting: WarSide,
}

impl RoleAssignment {
    pub const fn new(acting: WarSide) -> Self {
        Self { acting }
    }

    /// The recorded war side playing the given role.
    pub const fn side(&self, role: BattleRole) -> WarSide {
        match role {
            BattleRole::Acting => self.acting,
            BattleRole::Target => self.acting.opposite(),
        }
    }
}

/// Error for a name that does not match any known variant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
