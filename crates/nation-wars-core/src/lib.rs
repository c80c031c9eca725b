//! Nation Wars Core Library
//!
//! This crate contains the core war logic for Nation Wars: declaring wars
//! between nations and resolving the battle actions they trade afterwards.
//!
//! # Design Principles
//!
//! - **No IO**: This crate is purely game logic; storage lives elsewhere
//! - **Injected randomness**: Battle math takes its random draws as inputs
//! - **Typed configuration**: Balance data is validated once, at load
//! - **Serializable**: All records can be stored via serde

// Shared types
pub mod coerce;
pub mod error;
pub mod types;

// Records
pub mod battle_log;
pub mod nation;
pub mod war;

// Balance configuration
pub mod config;

// Battle resolution
pub mod battle;
pub mod loot;
pub mod losses;

// Re-exports for convenience
pub use battle::{
    resolve_battle, resolve_with_rolls, BattleContext, BattleResolution, PowerBand, Rolls,
    OVERWHELMING_RATIO,
};
pub use battle_log::{BattleLog, BattleRecord};
pub use config::{AttackProfile, BalanceConfig, LossRate, PercentRange, RawBalanceConfig, SuccessLevel};
pub use error::{BattleError, ConfigError};
pub use loot::LootDraw;
pub use nation::{Alliance, Message, MessageKind, Military, Nation};
pub use types::*;
pub use war::{War, WarDeclaration, WarUpdate};
