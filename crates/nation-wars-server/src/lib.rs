//! Nation Wars Services
//!
//! Orchestrates war declaration and battle resolution on top of the pure
//! core and the entity store.
//!
//! # Modules
//!
//! - [`provider`]: Injected balance configuration providers
//! - [`locks`]: Per-aggregate async lock table
//! - [`state`]: The [`WarService`] and its randomness sources
//! - [`declare`]: War declaration
//! - [`resolve`]: Battle resolution and mutation ordering
//! - [`commands`]: JSON command dispatch
//! - [`error`]: Error taxonomy with HTTP-equivalent statuses

pub mod commands;
pub mod declare;
pub mod error;
pub mod locks;
pub mod provider;
pub mod resolve;
pub mod state;

pub use commands::{CommandRequest, CommandResponse};
pub use declare::DeclareWar;
pub use error::{ErrorKind, WarError};
pub use locks::{LockKey, LockTable};
pub use provider::{ConfigProvider, FileConfigProvider, StaticConfigProvider};
pub use resolve::{BattleOutcome, ResolveBattle};
pub use state::{FixedRolls, RngRolls, RollSource, WarService};
