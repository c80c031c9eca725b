//! Treasury plunder after a battle action.

use crate::config::LootSettings;
use serde::{Deserialize, Serialize};

/// Result of a loot draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LootDraw {
    /// Portion of the target treasury eligible for plunder.
    pub pool: f64,
    /// Percent of the pool taken.
    pub percent: f64,
    /// Whole currency units transferred.
    pub amount: u64,
}

/// Size of the plunderable pool for a treasury.
pub fn loot_pool(treasury: u64, settings: &LootSettings) -> f64 {
    treasury as f64 * settings.base_pool_percent / 100.0
}

/// Draw loot for an outcome.
///
/// `draw` in `[0, 1]` picks a point in the outcome's percent range. The
/// amount never exceeds the treasury.
pub fn draw_loot(treasury: u64, settings: &LootSettings, outcome: &str, draw: f64) -> LootDraw {
    let range = settings.range_for(outcome);
    let draw = if draw.is_finite() { draw.clamp(0.0, 1.0) } else { 0.0 };
    let percent = range.min_percent + draw * (range.max_percent - range.min_percent);
    let pool = loot_pool(treasury, settings);
    let amount = ((pool * percent / 100.0).floor() as u64).min(treasury);
    LootDraw {
        pool,
        percent,
        amount,
    }
}
