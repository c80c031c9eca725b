//! Nation, military, alliance and message records.
//!
//! These records are owned by the wider game and only read or adjusted by the
//! war engine. Counters go through [`crate::coerce`] on the way in.

use crate::coerce::deserialize_count;
use crate::types::{AllianceId, CallerId, MessageId, MilitaryId, NationId, UnitType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A player-owned nation.
///
/// Fields the war engine does not model are kept in `extra` so a full
/// round trip through the store never drops them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nation {
    #[serde(default)]
    pub id: NationId,
    #[serde(default)]
    pub name: String,
    /// Identity of the caller that owns this nation.
    #[serde(default)]
    pub owner: CallerId,
    /// Alliance membership, if any.
    #[serde(default)]
    pub alliance_id: Option<AllianceId>,
    /// Whole currency units held by the nation.
    #[serde(default, deserialize_with = "deserialize_count")]
    pub treasury: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Nation {
    pub fn new(id: impl Into<NationId>, name: impl Into<String>, owner: impl Into<CallerId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: owner.into(),
            alliance_id: None,
            treasury: 0,
            extra: Map::new(),
        }
    }

    /// Fill the id from the storage key when the row lacks one.
    pub fn keyed_to(mut self, id: &str) -> Self {
        if self.id.is_empty() {
            self.id = id.to_string();
        }
        self
    }

    /// Name for messages and war titles; the id when the name is blank.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Builder-style alliance membership.
    pub fn with_alliance(mut self, alliance_id: impl Into<AllianceId>) -> Self {
        self.alliance_id = Some(alliance_id.into());
        self
    }

    /// Builder-style starting treasury.
    pub fn with_treasury(mut self, treasury: u64) -> Self {
        self.treasury = treasury;
        self
    }

    /// Whether two nations belong to the same alliance.
    pub fn shares_alliance_with(&self, other: &Nation) -> bool {
        matches!(
            (&self.alliance_id, &other.alliance_id),
            (Some(a), Some(b)) if a == b
        )
    }
}

/// Unit counters for one nation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Military {
    #[serde(default)]
    pub id: MilitaryId,
    #[serde(default)]
    pub nation_id: NationId,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub soldiers: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub tanks: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub aircraft: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub warships: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub artillery: u64,
    #[serde(default, deserialize_with = "deserialize_count")]
    pub nuclear_weapons: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Military {
    /// Create an empty military for a nation.
    pub fn new(id: impl Into<MilitaryId>, nation_id: impl Into<NationId>) -> Self {
        Self {
            id: id.into(),
            nation_id: nation_id.into(),
            ..Default::default()
        }
    }

    /// Fill identity fields a loosely written row may lack. The military id
    /// falls back to the nation id.
    pub fn keyed_to(mut self, nation_id: &str) -> Self {
        if self.nation_id.is_empty() {
            self.nation_id = nation_id.to_string();
        }
        if self.id.is_empty() {
            self.id = self.nation_id.clone();
        }
        self
    }

    /// Builder-style unit count.
    pub fn with(mut self, unit: UnitType, count: u64) -> Self {
        *self.count_mut(unit) = count;
        self
    }

    /// Current count of a unit type.
    pub fn count(&self, unit: UnitType) -> u64 {
        match unit {
            UnitType::Soldiers => self.soldiers,
            UnitType::Tanks => self.tanks,
            UnitType::Aircraft => self.aircraft,
            UnitType::Warships => self.warships,
            UnitType::Artillery => self.artillery,
            UnitType::NuclearWeapons => self.nuclear_weapons,
        }
    }

    fn count_mut(&mut self, unit: UnitType) -> &mut u64 {
        match unit {
            UnitType::Soldiers => &mut self.soldiers,
            UnitType::Tanks => &mut self.tanks,
            UnitType::Aircraft => &mut self.aircraft,
            UnitType::Warships => &mut self.warships,
            UnitType::Artillery => &mut self.artillery,
            UnitType::NuclearWeapons => &mut self.nuclear_weapons,
        }
    }

    /// All six counters in fixed order.
    pub fn counts(&self) -> impl Iterator<Item = (UnitType, u64)> + '_ {
        UnitType::all().iter().map(move |unit| (*unit, self.count(*unit)))
    }

    /// Subtract losses, never going below zero.
    pub fn apply_losses(&mut self, losses: &BTreeMap<UnitType, u64>) {
        for (unit, lost) in losses {
            let slot = self.count_mut(*unit);
            *slot = slot.saturating_sub(*lost);
        }
    }

    /// Total units across all types.
    pub fn total_units(&self) -> u64 {
        self.counts().map(|(_, n)| n).sum()
    }
}

/// An alliance nations may belong to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alliance {
    pub id: AllianceId,
    pub name: String,
}

/// Category of an in-game message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    WarDeclared,
    BattleReport,
}

/// A notification delivered to a nation's inbox.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub recipient_nation_id: NationId,
    #[serde(default)]
    pub sender_nation_id: Option<NationId>,
    pub kind: MessageKind,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}
