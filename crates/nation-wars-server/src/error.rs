//! Service errors and their HTTP-equivalent classification.

use nation_wars_core::{BattleError, ConfigError, NationId, UnknownVariant, WarId, WarStatus};
use nation_wars_store::StoreError;
use serde::Serialize;

/// Broad error classes surfaced to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Authentication,
    Validation,
    NotFound,
    Conflict,
    TransientInfra,
    Unexpected,
}

impl ErrorKind {
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Authentication => 401,
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::TransientInfra | ErrorKind::Unexpected => 500,
        }
    }
}

/// Errors from war declaration and battle resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WarError {
    #[error("Caller is not authenticated")]
    Unauthenticated,
    #[error("Caller does not own a nation")]
    MissingNation,
    #[error("Caller owns {0} nations; exactly one is required")]
    MultipleNations(usize),
    #[error("Missing required fields: {0}")]
    MissingFields(String),
    #[error("A nation cannot declare war on itself")]
    SelfTarget,
    #[error("Nation not found: {0}")]
    NationNotFound(NationId),
    #[error("Nations {0} and {1} are already at war")]
    AlreadyAtWar(NationId, NationId),
    #[error("Nations {0} and {1} share an alliance")]
    AllianceProtected(NationId, NationId),
    #[error("War not found: {0}")]
    WarNotFound(WarId),
    #[error("War {war_id} is not active (status: {status})")]
    WarNotActive { war_id: WarId, status: WarStatus },
    #[error("Nation {nation_id} is not a combatant in war {war_id}")]
    NotCombatant { war_id: WarId, nation_id: NationId },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Battle(#[from] BattleError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A mutation sequence stopped part way; earlier writes were kept.
    #[error("Battle partially applied, reconciliation required after {stage}: {source}")]
    ReconciliationRequired {
        stage: &'static str,
        #[source]
        source: StoreError,
    },
}

impl WarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WarError::Unauthenticated => ErrorKind::Authentication,
            WarError::MissingNation
            | WarError::MultipleNations(_)
            | WarError::MissingFields(_)
            | WarError::SelfTarget
            | WarError::WarNotActive { .. }
            | WarError::NotCombatant { .. }
            | WarError::InvalidRequest(_)
            | WarError::Battle(_) => ErrorKind::Validation,
            WarError::NationNotFound(_) | WarError::WarNotFound(_) => ErrorKind::NotFound,
            WarError::AlreadyAtWar(..) | WarError::AllianceProtected(..) => ErrorKind::Conflict,
            WarError::Store(err) if err.is_retryable() => ErrorKind::TransientInfra,
            WarError::Store(StoreError::NotFound { .. }) => ErrorKind::NotFound,
            WarError::Store(StoreError::Conflict(_)) => ErrorKind::Conflict,
            WarError::Store(_) | WarError::Config(_) | WarError::ReconciliationRequired { .. } => {
                ErrorKind::Unexpected
            }
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}

impl From<UnknownVariant> for WarError {
    fn from(err: UnknownVariant) -> Self {
        WarError::InvalidRequest(err.to_string())
    }
}

impl From<serde_json::Error> for WarError {
    fn from(err: serde_json::Error) -> Self {
        WarError::InvalidRequest(err.to_string())
    }
}

impl Serialize for WarError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
