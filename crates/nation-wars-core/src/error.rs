//! Error types for configuration and battle computation.

use crate::types::{AttackType, UnitType};
use thiserror::Error;

/// Problems found while loading or validating a balance configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The configuration document is not valid JSON for the expected shape.
    #[error("Failed to parse balance configuration: {0}")]
    Parse(String),

    /// A key names a unit type, attack type or band that does not exist.
    #[error("Unknown {kind} '{key}' in {section}")]
    UnknownKey {
        section: &'static str,
        kind: &'static str,
        key: String,
    },

    /// A value is outside its permitted range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The configuration source could not be read.
    #[error("Failed to read balance configuration from {path}: {message}")]
    Io { path: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Pre-mutation failures while resolving a battle action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BattleError {
    /// Required request data is absent or empty.
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    /// The acting nation does not have enough units to commit.
    #[error("Insufficient {unit_type}: {available} available, {requested} requested")]
    InsufficientUnits {
        unit_type: UnitType,
        available: u64,
        requested: u64,
    },

    /// The attack type lacks success levels, damage or cost tables.
    #[error("Attack type {attack_type} is misconfigured: {reason}")]
    MisconfiguredAttackType {
        attack_type: AttackType,
        reason: String,
    },
}
