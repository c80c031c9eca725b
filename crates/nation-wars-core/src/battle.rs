//! Battle resolution math.
//!
//! A battle action compares the power the acting nation commits against the
//! whole standing military of the target. The ratio selects a power band,
//! the band modifies a d100 roll, and the final roll picks a named success
//! level whose multiplier scales resistance damage, losses and loot.
//!
//! Everything here is pure: callers supply the records and the random draws
//! and receive a [`BattleResolution`] describing what should change.

use crate::config::{AttackProfile, BalanceConfig, SuccessLevel, MAX_FINAL_ROLL, MIN_FINAL_ROLL};
use crate::error::BattleError;
use crate::loot::{draw_loot, LootDraw};
use crate::losses::{acting_losses, target_losses};
use crate::nation::Military;
use crate::types::{AttackType, UnitType};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Ratio reported when the target fields no power at all.
pub const OVERWHELMING_RATIO: f64 = 999.0;

/// Band of the acting/target power ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerBand {
    SeverelyOutgunned,
    SignificantlyOutgunned,
    SlightlyOutgunned,
    EvenMatch,
    SlightAdvantage,
    SignificantAdvantage,
    OverwhelmingAdvantage,
}

impl PowerBand {
    /// All bands from weakest to strongest.
    pub const fn all() -> &'static [PowerBand] {
        &[
            PowerBand::SeverelyOutgunned,
            PowerBand::SignificantlyOutgunned,
            PowerBand::SlightlyOutgunned,
            PowerBand::EvenMatch,
            PowerBand::SlightAdvantage,
            PowerBand::SignificantAdvantage,
            PowerBand::OverwhelmingAdvantage,
        ]
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PowerBand::SeverelyOutgunned => "severely_outgunned",
            PowerBand::SignificantlyOutgunned => "significantly_outgunned",
            PowerBand::SlightlyOutgunned => "slightly_outgunned",
            PowerBand::EvenMatch => "even_match",
            PowerBand::SlightAdvantage => "slight_advantage",
            PowerBand::SignificantAdvantage => "significant_advantage",
            PowerBand::OverwhelmingAdvantage => "overwhelming_advantage",
        }
    }

    /// Roll modifier used when the configuration omits this band.
    pub const fn default_modifier(&self) -> i32 {
        match self {
            PowerBand::SeverelyOutgunned => -25,
            PowerBand::SignificantlyOutgunned => -15,
            PowerBand::SlightlyOutgunned => -8,
            PowerBand::EvenMatch => 0,
            PowerBand::SlightAdvantage => 8,
            PowerBand::SignificantAdvantage => 15,
            PowerBand::OverwhelmingAdvantage => 25,
        }
    }

    /// Classify a power ratio.
    pub fn from_ratio(ratio: f64) -> PowerBand {
        if ratio < 0.3 {
            PowerBand::SeverelyOutgunned
        } else if ratio < 0.6 {
            PowerBand::SignificantlyOutgunned
        } else if ratio < 0.9 {
            PowerBand::SlightlyOutgunned
        } else if ratio <= 1.1 {
            PowerBand::EvenMatch
        } else if ratio <= 2.0 {
            PowerBand::SlightAdvantage
        } else if ratio <= 4.0 {
            PowerBand::SignificantAdvantage
        } else {
            PowerBand::OverwhelmingAdvantage
        }
    }
}

impl std::fmt::Display for PowerBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerBand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PowerBand::all()
            .iter()
            .copied()
            .find(|band| band.as_str() == s)
            .ok_or(())
    }
}

/// Power of the units committed to an action.
pub fn committed_power(units: &BTreeMap<UnitType, u64>, config: &BalanceConfig) -> f64 {
    units
        .iter()
        .map(|(unit, quantity)| *quantity as f64 * config.unit_strength(*unit))
        .sum()
}

/// Power of an entire standing military; a missing record counts as empty.
pub fn standing_power(military: Option<&Military>, config: &BalanceConfig) -> f64 {
    military
        .map(|m| {
            m.counts()
                .map(|(unit, count)| count as f64 * config.unit_strength(unit))
                .sum()
        })
        .unwrap_or(0.0)
}

/// Acting power divided by target power, [`OVERWHELMING_RATIO`] against nothing.
pub fn power_ratio(acting_power: f64, target_power: f64) -> f64 {
    if target_power <= 0.0 {
        OVERWHELMING_RATIO
    } else {
        acting_power / target_power
    }
}

/// Apply the band modifier to a base roll and clamp to the valid range.
pub fn final_roll(base_roll: i32, modifier: i32) -> i32 {
    base_roll
        .saturating_add(modifier)
        .clamp(MIN_FINAL_ROLL, MAX_FINAL_ROLL)
}

/// The success level chosen for a roll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutcomeSelection<'a> {
    pub level: &'a SuccessLevel,
    /// True when no band matched and the first band was used instead.
    pub fallback: bool,
}

/// Pick the first success level containing the roll.
///
/// Returns `None` only for an empty level list, which validated profiles
/// never have.
pub fn select_outcome(levels: &[SuccessLevel], roll: i32) -> Option<OutcomeSelection<'_>> {
    match levels.iter().find(|level| level.contains(roll)) {
        Some(level) => Some(OutcomeSelection {
            level,
            fallback: false,
        }),
        None => levels.first().map(|level| OutcomeSelection {
            level,
            fallback: true,
        }),
    }
}

/// Resistance damage for an outcome multiplier, capped per attack type.
pub fn resistance_damage(profile: &AttackProfile, multiplier: f64) -> f64 {
    let effective = profile.base_damage * multiplier;
    match profile.damage_cap {
        Some(cap) => effective.min(cap),
        None => effective,
    }
}

/// Random inputs to a battle, drawn once per action.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rolls {
    /// Uniform integer in `[1, 100]`.
    pub base_roll: i32,
    /// Uniform position in `[0, 1]` within the outcome's loot range.
    pub loot_draw: f64,
}

impl Rolls {
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            base_roll: rng.gen_range(1..=100),
            loot_draw: rng.gen_range(0.0..=1.0),
        }
    }
}

/// Records an action is resolved against.
#[derive(Clone, Copy, Debug)]
pub struct BattleContext<'a> {
    pub attack_type: AttackType,
    pub units_committed: &'a BTreeMap<UnitType, u64>,
    pub acting_military: Option<&'a Military>,
    pub target_military: Option<&'a Military>,
    pub target_treasury: u64,
}

/// Everything computed for one battle action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleResolution {
    pub attack_type: AttackType,
    pub units_committed: BTreeMap<UnitType, u64>,
    pub acting_power: f64,
    pub target_power: f64,
    pub power_ratio: f64,
    pub power_band: PowerBand,
    pub roll_modifier: i32,
    pub base_roll: i32,
    pub final_roll: i32,
    pub outcome: String,
    pub outcome_multiplier: f64,
    /// The roll matched no band and the first band was used.
    pub outcome_fallback: bool,
    pub resistance_damage: f64,
    pub acting_losses: BTreeMap<UnitType, u64>,
    pub target_losses: BTreeMap<UnitType, u64>,
    pub loot: LootDraw,
    pub action_cost: u32,
}

/// Check a commitment against the acting military.
///
/// Zero entries are dropped; an empty commitment is rejected.
pub fn validate_commitment(
    units_committed: &BTreeMap<UnitType, u64>,
    acting_military: Option<&Military>,
) -> Result<BTreeMap<UnitType, u64>, BattleError> {
    let committed: BTreeMap<UnitType, u64> = units_committed
        .iter()
        .filter(|(_, quantity)| **quantity > 0)
        .map(|(unit, quantity)| (*unit, *quantity))
        .collect();
    if committed.is_empty() {
        return Err(BattleError::MissingFields("units_committed".to_string()));
    }
    for (unit, requested) in &committed {
        let available = acting_military.map(|m| m.count(*unit)).unwrap_or(0);
        if *requested > available {
            return Err(BattleError::InsufficientUnits {
                unit_type: *unit,
                available,
                requested: *requested,
            });
        }
    }
    Ok(committed)
}

/// Resolve an action with freshly drawn randomness.
pub fn resolve_battle<R: Rng + ?Sized>(
    ctx: &BattleContext<'_>,
    config: &BalanceConfig,
    rng: &mut R,
) -> Result<BattleResolution, BattleError> {
    resolve_with_rolls(ctx, config, Rolls::draw(rng))
}

/// Resolve an action with the given random draws.
pub fn resolve_with_rolls(
    ctx: &BattleContext<'_>,
    config: &BalanceConfig,
    rolls: Rolls,
) -> Result<BattleResolution, BattleError> {
    let profile = config.attack(ctx.attack_type)?;
    let committed = validate_commitment(ctx.units_committed, ctx.acting_military)?;

    let acting_power = committed_power(&committed, config);
    let target_power = standing_power(ctx.target_military, config);
    let ratio = power_ratio(acting_power, target_power);
    let band = PowerBand::from_ratio(ratio);
    let modifier = config.ratio_modifier(band);
    let roll = final_roll(rolls.base_roll, modifier);

    let selection = select_outcome(&profile.success_levels, roll).ok_or_else(|| {
        BattleError::MisconfiguredAttackType {
            attack_type: ctx.attack_type,
            reason: "no success levels configured".to_string(),
        }
    })?;
    let multiplier = selection.level.multiplier;

    let loot = draw_loot(
        ctx.target_treasury,
        &config.loot,
        &selection.level.name,
        rolls.loot_draw,
    );

    Ok(BattleResolution {
        attack_type: ctx.attack_type,
        acting_power,
        target_power,
        power_ratio: ratio,
        power_band: band,
        roll_modifier: modifier,
        base_roll: rolls.base_roll,
        final_roll: roll,
        outcome: selection.level.name.clone(),
        outcome_multiplier: multiplier,
        outcome_fallback: selection.fallback,
        resistance_damage: resistance_damage(profile, multiplier),
        acting_losses: acting_losses(&committed, profile, multiplier),
        target_losses: target_losses(ctx.target_military, multiplier),
        loot,
        action_cost: profile.action_cost,
        units_committed: committed,
    })
}
