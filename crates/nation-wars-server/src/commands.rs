//! JSON command surface.
//!
//! Requests look like `{"caller": "...", "command": "...", "payload": {...}}`
//! and every request yields exactly one response carrying `success` and an
//! HTTP-equivalent `status`.

use crate::declare::DeclareWar;
use crate::error::{ErrorKind, WarError};
use crate::resolve::{BattleOutcome, ResolveBattle};
use crate::state::WarService;
use nation_wars_core::{BattleLog, War, WarUpdate};
use nation_wars_store::EntityStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const DECLARE_WAR: &str = "declare_war";
pub const RESOLVE_BATTLE: &str = "resolve_battle";

/// One incoming command.
#[derive(Clone, Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub caller: String,
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

/// One outgoing response.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub war: Option<War>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battle_log: Option<BattleLog>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub war_update: Option<WarUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            status: 200,
            war: None,
            battle_log: None,
            war_update: None,
            error: None,
            error_kind: None,
        }
    }

    pub fn declared(war: War) -> Self {
        Self {
            war: Some(war),
            ..Self::ok()
        }
    }

    pub fn battle(outcome: BattleOutcome) -> Self {
        Self {
            battle_log: Some(outcome.battle_log),
            war_update: Some(outcome.war_update),
            ..Self::ok()
        }
    }

    pub fn failure(err: &WarError) -> Self {
        Self {
            success: false,
            status: err.http_status(),
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            ..Self::ok()
        }
    }
}

impl<S: EntityStore> WarService<S> {
    /// Run a parsed command.
    pub async fn dispatch(&self, request: CommandRequest) -> CommandResponse {
        debug!(command = %request.command, caller = %request.caller, "Dispatching command");
        let result = match request.command.as_str() {
            DECLARE_WAR => match parse_payload::<DeclareWar>(request.payload) {
                Ok(payload) => self
                    .declare_war(&request.caller, payload)
                    .await
                    .map(CommandResponse::declared),
                Err(err) => Err(err),
            },
            RESOLVE_BATTLE => match parse_payload::<ResolveBattle>(request.payload) {
                Ok(payload) => self
                    .resolve_battle(&request.caller, payload)
                    .await
                    .map(CommandResponse::battle),
                Err(err) => Err(err),
            },
            other => Err(WarError::InvalidRequest(format!("unknown command '{other}'"))),
        };
        result.unwrap_or_else(|err| CommandResponse::failure(&err))
    }

    /// Handle one line of newline-delimited JSON and return the response line.
    pub async fn handle_line(&self, line: &str) -> String {
        let response = match serde_json::from_str::<CommandRequest>(line) {
            Ok(request) => self.dispatch(request).await,
            Err(err) => CommandResponse::failure(&WarError::from(err)),
        };
        serde_json::to_string(&response).unwrap_or_else(|err| {
            format!(r#"{{"success":false,"status":500,"error":"{}"}}"#, err.to_string().replace('"', "'"))
        })
    }
}

fn parse_payload<T: for<'de> Deserialize<'de> + Default>(payload: Value) -> Result<T, WarError> {
    if payload.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(payload)?)
}
