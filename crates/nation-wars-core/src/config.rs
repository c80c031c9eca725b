//! Balance configuration for wars and battles.
//!
//! The configuration arrives as a loosely structured JSON document edited by
//! game designers. It is parsed into [`RawBalanceConfig`], then validated and
//! default-filled exactly once into [`BalanceConfig`]. Battle math only ever
//! sees the typed form.

use crate::battle::PowerBand;
use crate::error::{BattleError, ConfigError};
use crate::types::{AttackType, UnitType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Highest roll reachable after modifiers.
pub const MAX_FINAL_ROLL: i32 = 200;
/// Lowest roll reachable after modifiers.
pub const MIN_FINAL_ROLL: i32 = 1;

const DEFAULT_INITIAL_RESISTANCE: f64 = 100.0;
const DEFAULT_TACTICAL_START: u32 = 10;
const DEFAULT_TACTICAL_MAX: u32 = 20;
const DEFAULT_BASE_POOL_PERCENT: f64 = 1.0;

/// A named outcome band on the final roll.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuccessLevel {
    pub name: String,
    pub min_roll: i32,
    pub max_roll: i32,
    pub multiplier: f64,
}

impl SuccessLevel {
    /// Whether a final roll falls inside this band (inclusive).
    pub fn contains(&self, roll: i32) -> bool {
        (self.min_roll..=self.max_roll).contains(&roll)
    }
}

/// Acting-side loss rates for one unit type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LossRate {
    #[serde(default = "LossRate::default_base")]
    pub base_rate: f64,
    #[serde(default = "LossRate::default_max")]
    pub max_rate: f64,
}

impl LossRate {
    const fn default_base() -> f64 {
        0.1
    }

    const fn default_max() -> f64 {
        0.5
    }
}

impl Default for LossRate {
    fn default() -> Self {
        Self {
            base_rate: Self::default_base(),
            max_rate: Self::default_max(),
        }
    }
}

/// Inclusive percentage range used for loot draws.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PercentRange {
    pub min_percent: f64,
    pub max_percent: f64,
}

impl Default for PercentRange {
    fn default() -> Self {
        Self {
            min_percent: 1.0,
            max_percent: 5.0,
        }
    }
}

/// Raw loot settings as written by designers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLootSettings {
    pub base_pool_percent: Option<f64>,
    pub outcome_ranges: BTreeMap<String, PercentRange>,
}

/// The configuration document exactly as stored.
///
/// Maps are keyed by plain strings so unknown names can be reported instead
/// of failing the whole parse.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBalanceConfig {
    pub version: u32,
    pub initial_resistance: Option<f64>,
    pub tactical_points_on_war_start: Option<u32>,
    pub max_tactical_points: Option<u32>,
    pub unit_combat_strengths: BTreeMap<String, f64>,
    pub power_ratio_modifiers: BTreeMap<String, i32>,
    pub success_levels: BTreeMap<String, Vec<SuccessLevel>>,
    pub max_resistance_damage_per_attack: BTreeMap<String, f64>,
    pub final_resistance_damage_caps: BTreeMap<String, f64>,
    pub attacker_loss_config: BTreeMap<String, BTreeMap<String, LossRate>>,
    pub action_point_costs: BTreeMap<String, u32>,
    pub loot_settings: RawLootSettings,
}

/// Everything needed to resolve one attack type.
#[derive(Clone, Debug, PartialEq)]
pub struct AttackProfile {
    pub success_levels: Vec<SuccessLevel>,
    /// Resistance damage before the outcome multiplier.
    pub base_damage: f64,
    /// Hard cap on resistance damage per action, if any.
    pub damage_cap: Option<f64>,
    /// Tactical points spent by the acting side.
    pub action_cost: u32,
    loss_rates: BTreeMap<UnitType, LossRate>,
}

impl AttackProfile {
    /// Acting-side loss rate for a unit type, falling back to the defaults.
    pub fn loss_rate(&self, unit: UnitType) -> LossRate {
        self.loss_rates.get(&unit).copied().unwrap_or_default()
    }

    /// Final rolls not covered by any success level.
    pub fn coverage_gaps(&self) -> Vec<RangeInclusive<i32>> {
        let mut gaps = Vec::new();
        let mut gap_start: Option<i32> = None;
        for roll in MIN_FINAL_ROLL..=MAX_FINAL_ROLL {
            let covered = self.success_levels.iter().any(|level| level.contains(roll));
            match (covered, gap_start) {
                (false, None) => gap_start = Some(roll),
                (true, Some(start)) => {
                    gaps.push(start..=roll - 1);
                    gap_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = gap_start {
            gaps.push(start..=MAX_FINAL_ROLL);
        }
        gaps
    }
}

/// Validated loot settings.
#[derive(Clone, Debug, PartialEq)]
pub struct LootSettings {
    /// Share of the target treasury eligible for plunder, in percent.
    pub base_pool_percent: f64,
    outcome_ranges: BTreeMap<String, PercentRange>,
}

impl LootSettings {
    /// Loot percentage range for an outcome name, `[1, 5]` when unmapped.
    pub fn range_for(&self, outcome: &str) -> PercentRange {
        self.outcome_ranges.get(outcome).copied().unwrap_or_default()
    }
}

impl Default for LootSettings {
    fn default() -> Self {
        Self {
            base_pool_percent: DEFAULT_BASE_POOL_PERCENT,
            outcome_ranges: BTreeMap::new(),
        }
    }
}

/// Strongly typed, validated balance configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceConfig {
    pub version: u32,
    pub initial_resistance: f64,
    pub tactical_points_on_war_start: u32,
    pub max_tactical_points: u32,
    pub loot: LootSettings,
    unit_strengths: BTreeMap<UnitType, f64>,
    ratio_modifiers: BTreeMap<PowerBand, i32>,
    attacks: BTreeMap<AttackType, AttackProfile>,
    /// Why attack types without a usable profile were rejected.
    misconfigured: BTreeMap<AttackType, String>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        let mut misconfigured = BTreeMap::new();
        for attack in AttackType::all() {
            misconfigured.insert(*attack, "no success levels configured".to_string());
        }
        Self {
            version: 0,
            initial_resistance: DEFAULT_INITIAL_RESISTANCE,
            tactical_points_on_war_start: DEFAULT_TACTICAL_START,
            max_tactical_points: DEFAULT_TACTICAL_MAX,
            loot: LootSettings::default(),
            unit_strengths: default_unit_strengths(),
            ratio_modifiers: PowerBand::all()
                .iter()
                .map(|band| (*band, band.default_modifier()))
                .collect(),
            attacks: BTreeMap::new(),
            misconfigured,
        }
    }
}

impl BalanceConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawBalanceConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Validate a raw configuration and fill in defaults.
    pub fn from_raw(raw: RawBalanceConfig) -> Result<Self, ConfigError> {
        let mut config = BalanceConfig {
            version: raw.version,
            ..Default::default()
        };

        if let Some(resistance) = raw.initial_resistance {
            if !resistance.is_finite() || resistance <= 0.0 {
                return Err(ConfigError::invalid("initial_resistance", "must be positive"));
            }
            config.initial_resistance = resistance;
        }
        if let Some(max) = raw.max_tactical_points {
            config.max_tactical_points = max;
        }
        if let Some(start) = raw.tactical_points_on_war_start {
            config.tactical_points_on_war_start = start;
        }
        if config.tactical_points_on_war_start > config.max_tactical_points {
            return Err(ConfigError::invalid(
                "tactical_points_on_war_start",
                format!("exceeds max_tactical_points ({})", config.max_tactical_points),
            ));
        }

        for (key, strength) in &raw.unit_combat_strengths {
            let unit = parse_key::<UnitType>("unit_combat_strengths", "unit type", key)?;
            if !strength.is_finite() || *strength < 0.0 {
                return Err(ConfigError::invalid(
                    format!("unit_combat_strengths.{key}"),
                    "must be a non-negative number",
                ));
            }
            config.unit_strengths.insert(unit, *strength);
        }

        for (key, modifier) in &raw.power_ratio_modifiers {
            let band = parse_key::<PowerBand>("power_ratio_modifiers", "power band", key)?;
            config.ratio_modifiers.insert(band, *modifier);
        }

        config.loot = build_loot(&raw.loot_settings)?;
        config.build_attack_profiles(&raw)?;

        Ok(config)
    }

    fn build_attack_profiles(&mut self, raw: &RawBalanceConfig) -> Result<(), ConfigError> {
        // Reject unknown attack names in every per-attack table up front.
        let per_attack_keys = raw
            .success_levels
            .keys()
            .map(|k| ("success_levels", k))
            .chain(raw.max_resistance_damage_per_attack.keys().map(|k| ("max_resistance_damage_per_attack", k)))
            .chain(raw.final_resistance_damage_caps.keys().map(|k| ("final_resistance_damage_caps", k)))
            .chain(raw.attacker_loss_config.keys().map(|k| ("attacker_loss_config", k)))
            .chain(raw.action_point_costs.keys().map(|k| ("action_point_costs", k)));
        for (section, key) in per_attack_keys {
            parse_key::<AttackType>(section, "attack type", key)?;
        }

        for attack in AttackType::all() {
            let name = attack.as_str();

            let levels = raw.success_levels.get(name).cloned().unwrap_or_default();
            for (index, level) in levels.iter().enumerate() {
                validate_success_level(name, index, level)?;
            }

            let base_damage = raw.max_resistance_damage_per_attack.get(name).copied();
            if let Some(damage) = base_damage {
                if !damage.is_finite() || damage < 0.0 {
                    return Err(ConfigError::invalid(
                        format!("max_resistance_damage_per_attack.{name}"),
                        "must be a non-negative number",
                    ));
                }
            }

            let damage_cap = raw.final_resistance_damage_caps.get(name).copied();
            if let Some(cap) = damage_cap {
                if !cap.is_finite() || cap < 0.0 {
                    return Err(ConfigError::invalid(
                        format!("final_resistance_damage_caps.{name}"),
                        "must be a non-negative number",
                    ));
                }
            }

            let mut loss_rates = BTreeMap::new();
            if let Some(table) = raw.attacker_loss_config.get(name) {
                for (unit_key, rate) in table {
                    let unit = parse_key::<UnitType>("attacker_loss_config", "unit type", unit_key)?;
                    validate_loss_rate(name, unit_key, rate)?;
                    loss_rates.insert(unit, *rate);
                }
            }

            let action_cost = raw.action_point_costs.get(name).copied();

            let missing = if levels.is_empty() {
                Some("no success levels configured")
            } else if base_damage.is_none() {
                Some("no base resistance damage configured")
            } else if action_cost.is_none() {
                Some("no action point cost configured")
            } else {
                None
            };

            match (missing, base_damage, action_cost) {
                (None, Some(base_damage), Some(action_cost)) => {
                    self.misconfigured.remove(attack);
                    self.attacks.insert(
                        *attack,
                        AttackProfile {
                            success_levels: levels,
                            base_damage,
                            damage_cap,
                            action_cost,
                            loss_rates,
                        },
                    );
                }
                (reason, _, _) => {
                    let reason = reason.unwrap_or("incomplete tables");
                    self.misconfigured.insert(*attack, reason.to_string());
                }
            }
        }
        Ok(())
    }

    /// Combat strength of one unit of the given type.
    pub fn unit_strength(&self, unit: UnitType) -> f64 {
        self.unit_strengths.get(&unit).copied().unwrap_or(0.0)
    }

    /// Roll modifier for a power band.
    pub fn ratio_modifier(&self, band: PowerBand) -> i32 {
        self.ratio_modifiers
            .get(&band)
            .copied()
            .unwrap_or_else(|| band.default_modifier())
    }

    /// The resolution profile for an attack type.
    pub fn attack(&self, attack: AttackType) -> Result<&AttackProfile, BattleError> {
        self.attacks
            .get(&attack)
            .ok_or_else(|| BattleError::MisconfiguredAttackType {
                attack_type: attack,
                reason: self
                    .misconfigured
                    .get(&attack)
                    .cloned()
                    .unwrap_or_else(|| "not configured".to_string()),
            })
    }

    /// Attack types that can be resolved with this configuration.
    pub fn configured_attacks(&self) -> impl Iterator<Item = AttackType> + '_ {
        self.attacks.keys().copied()
    }

    /// Starting tactical points, never above the configured maximum.
    pub fn starting_tactical_points(&self) -> u32 {
        self.tactical_points_on_war_start.min(self.max_tactical_points)
    }
}

fn default_unit_strengths() -> BTreeMap<UnitType, f64> {
    BTreeMap::from([
        (UnitType::Soldiers, 1.0),
        (UnitType::Tanks, 10.0),
        (UnitType::Aircraft, 15.0),
        (UnitType::Warships, 20.0),
        (UnitType::Artillery, 8.0),
        (UnitType::NuclearWeapons, 500.0),
    ])
}

fn parse_key<T: FromStr>(section: &'static str, kind: &'static str, key: &str) -> Result<T, ConfigError> {
    key.parse::<T>().map_err(|_| ConfigError::UnknownKey {
        section,
        kind,
        key: key.to_string(),
    })
}

fn validate_success_level(attack: &str, index: usize, level: &SuccessLevel) -> Result<(), ConfigError> {
    let field = format!("success_levels.{attack}[{index}]");
    if level.name.trim().is_empty() {
        return Err(ConfigError::invalid(field, "name must not be empty"));
    }
    if level.min_roll > level.max_roll {
        return Err(ConfigError::invalid(
            field,
            format!("min_roll {} exceeds max_roll {}", level.min_roll, level.max_roll),
        ));
    }
    if !level.multiplier.is_finite() || level.multiplier < 0.0 {
        return Err(ConfigError::invalid(field, "multiplier must be non-negative"));
    }
    Ok(())
}

fn validate_loss_rate(attack: &str, unit: &str, rate: &LossRate) -> Result<(), ConfigError> {
    let in_unit_range = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if !in_unit_range(rate.base_rate) || !in_unit_range(rate.max_rate) {
        return Err(ConfigError::invalid(
            format!("attacker_loss_config.{attack}.{unit}"),
            "rates must be between 0 and 1",
        ));
    }
    Ok(())
}

fn build_loot(raw: &RawLootSettings) -> Result<LootSettings, ConfigError> {
    let mut loot = LootSettings::default();
    if let Some(percent) = raw.base_pool_percent {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(ConfigError::invalid(
                "loot_settings.base_pool_percent",
                "must be between 0 and 100",
            ));
        }
        loot.base_pool_percent = percent;
    }
    for (outcome, range) in &raw.outcome_ranges {
        let valid = range.min_percent.is_finite()
            && range.max_percent.is_finite()
            && 0.0 <= range.min_percent
            && range.min_percent <= range.max_percent
            && range.max_percent <= 100.0;
        if !valid {
            return Err(ConfigError::invalid(
                format!("loot_settings.outcome_ranges.{outcome}"),
                "expected 0 <= min_percent <= max_percent <= 100",
            ));
        }
        loot.outcome_ranges.insert(outcome.clone(), *range);
    }
    Ok(loot)
}
