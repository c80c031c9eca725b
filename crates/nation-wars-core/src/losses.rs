//! Unit loss calculators for both sides of a battle action.

use crate::config::AttackProfile;
use crate::nation::Military;
use crate::types::UnitType;
use std::collections::BTreeMap;

/// Target-side loss rate per point of outcome multiplier.
///
/// Flat across unit and attack types, unlike the acting side's tables.
pub const TARGET_LOSS_RATE: f64 = 0.05;

/// Acting-side loss rate for one unit type.
///
/// Better outcomes (higher multipliers) cost fewer units; at a multiplier of
/// two or more the acting side loses nothing.
pub fn acting_loss_rate(profile: &AttackProfile, unit: UnitType, multiplier: f64) -> f64 {
    let rate = profile.loss_rate(unit);
    (rate.base_rate * (2.0 - multiplier).max(0.0)).min(rate.max_rate)
}

/// Losses among the committed units. Zero entries are omitted.
pub fn acting_losses(
    committed: &BTreeMap<UnitType, u64>,
    profile: &AttackProfile,
    multiplier: f64,
) -> BTreeMap<UnitType, u64> {
    committed
        .iter()
        .filter_map(|(unit, quantity)| {
            let rate = acting_loss_rate(profile, *unit, multiplier);
            let lost = (*quantity as f64 * rate).floor() as u64;
            (lost > 0).then_some((*unit, lost.min(*quantity)))
        })
        .collect()
}

/// Losses across the target's whole standing military. Zero entries are omitted.
pub fn target_losses(military: Option<&Military>, multiplier: f64) -> BTreeMap<UnitType, u64> {
    let Some(military) = military else {
        return BTreeMap::new();
    };
    let rate = TARGET_LOSS_RATE * multiplier;
    military
        .counts()
        .filter(|(_, count)| *count > 0)
        .filter_map(|(unit, count)| {
            let lost = (count as f64 * rate).floor() as u64;
            (lost > 0).then_some((unit, lost.min(count)))
        })
        .collect()
}

/// Sum of all entries in a loss map.
pub fn total_losses(losses: &BTreeMap<UnitType, u64>) -> u64 {
    losses.values().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BalanceConfig;
    use crate::types::AttackType;
    use serde_json::json;

    fn profile_config() -> BalanceConfig {
        let doc = json!({
            "success_levels": {
                "air_strike": [{"name": "hit", "min_roll": 1, "max_roll": 200, "multiplier": 1.0}]
            },
            "max_resistance_damage_per_attack": {"air_strike": 8},
            "action_point_costs": {"air_strike": 4},
            "attacker_loss_config": {
                "air_strike": {"aircraft": {"base_rate": 0.2, "max_rate": 0.3}}
            }
        });
        BalanceConfig::from_json(&doc.to_string()).unwrap()
    }

    #[test]
    fn test_acting_rate_uses_table_and_cap() {
        let config = profile_config();
        let profile = config.attack(AttackType::AirStrike).unwrap();
        // 0.2 * (2 - 0) = 0.4, capped at 0.3
        assert_eq!(acting_loss_rate(profile, UnitType::Aircraft, 0.0), 0.3);
        // defaults for unlisted units: 0.1 * 1 = 0.1
        assert_eq!(acting_loss_rate(profile, UnitType::Tanks, 1.0), 0.1);
        // multiplier above two never produces negative losses
        assert_eq!(acting_loss_rate(profile, UnitType::Tanks, 3.0), 0.0);
    }

    #[test]
    fn test_acting_losses_omit_zero_entries() {
        let config = profile_config();
        let profile = config.attack(AttackType::AirStrike).unwrap();
        let committed = BTreeMap::from([(UnitType::Aircraft, 20), (UnitType::Soldiers, 5)]);
        let losses = acting_losses(&committed, profile, 1.0);
        // aircraft: min(0.2, 0.3) * 20 = 4; soldiers: 0.1 * 5 = 0.5 -> 0
        assert_eq!(losses, BTreeMap::from([(UnitType::Aircraft, 4)]));
    }

    #[test]
    fn test_target_losses_scale_with_multiplier() {
        let military = Military::new("m", "n")
            .with(UnitType::Soldiers, 1000)
            .with(UnitType::Tanks, 10)
            .with(UnitType::Warships, 0);
        let losses = target_losses(Some(&military), 2.0);
        assert_eq!(losses.get(&UnitType::Soldiers), Some(&100));
        assert_eq!(losses.get(&UnitType::Tanks), Some(&1));
        assert!(!losses.contains_key(&UnitType::Warships));
        assert_eq!(total_losses(&losses), 101);
    }

    #[test]
    fn test_target_losses_never_exceed_holdings() {
        let military = Military::new("m", "n").with(UnitType::Soldiers, 10);
        let losses = target_losses(Some(&military), 40.0);
        assert_eq!(losses.get(&UnitType::Soldiers), Some(&10));
        assert!(target_losses(None, 2.0).is_empty());
    }
}
