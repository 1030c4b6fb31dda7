//! Error taxonomy shared across the workspace.
//!
//! Each failure class gets its own typed error; [`OvenError`] is the umbrella
//! that layers above match on exhaustively. Validation failures are detected
//! as early as possible (construction time) and never reach the transport
//! layer; transport failures are retried inside the session and only escalate
//! to [`CommandError`] once the retry budget is exhausted.

use crate::device::{DeviceState, HardwareRevision};

/// Umbrella error for the whole system.
#[derive(Debug, thiserror::Error)]
pub enum OvenError {
    /// Bad recipe, stage, or temperature data. Never retried.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// The requested device id is not among the last discovery result.
    #[error("device not found")]
    DeviceNotFound(#[from] DeviceNotFoundError),

    /// The requested recipe id is not in the loaded library.
    #[error("recipe not found")]
    RecipeNotFound(#[from] RecipeNotFoundError),

    /// The device rejected a command, or the transport exhausted its retries.
    #[error("command failed")]
    Command(#[from] CommandError),

    /// Missing or invalid connection credentials. Fatal, never retried.
    #[error("configuration error")]
    Configuration(#[from] ConfigurationError),
}

impl OvenError {
    /// Process exit code for this error class.
    ///
    /// `0` success, `1` general, `2` configuration, `3` device,
    /// `4` command/validation, `130` interrupted.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::RecipeNotFound(_) | Self::Command(_) => 4,
            Self::DeviceNotFound(_) => 3,
            Self::Configuration(_) => 2,
        }
    }
}

/// Structural or compatibility validation failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Temperature outside the appliance's safe operating envelope.
    #[error("temperature {celsius}°C outside safe envelope {min}°C..={max}°C")]
    TemperatureOutOfRange { celsius: f64, min: f64, max: f64 },

    /// Probe target outside the probe-specific safe range.
    #[error("probe target {celsius}°C outside probe range {min}°C..={max}°C")]
    ProbeTargetOutOfRange { celsius: f64, min: f64, max: f64 },

    /// Top, bottom, and rear heating elements may not all be active at once.
    #[error("top and bottom elements may not be combined with the rear element")]
    AllElementsActive,

    /// A percentage field left the 0..=100 range.
    #[error("{field} must be between 0 and 100, got {value}")]
    PercentOutOfRange { field: &'static str, value: u8 },

    /// A device or recipe name was empty.
    #[error("name must not be empty")]
    EmptyName,

    /// A cook plan must contain at least one stage.
    #[error("cook plan must contain at least one stage")]
    EmptyPlan,

    /// A stage violates a hardware-revision-dependent rule.
    #[error("stage {stage} incompatible with device: {rule}")]
    StageIncompatible {
        stage: usize,
        rule: CompatibilityRule,
    },

    /// The plan has more stages than the device revision supports.
    #[error("plan has {count} stages, device supports at most {max}")]
    TooManyStages { count: usize, max: usize },

    /// The plan targets a different hardware revision than the device.
    #[error("plan targets {plan} but device is {device}")]
    RevisionMismatch {
        plan: HardwareRevision,
        device: HardwareRevision,
    },

    /// Two recipes in the same document share an identifier.
    #[error("duplicate recipe id {0:?}")]
    DuplicateRecipeId(String),

    /// The recipe document itself could not be parsed.
    #[error("malformed recipe document: {0}")]
    Document(String),
}

/// The hardware-revision rule a stage broke.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompatibilityRule {
    /// Steam configured on a dry-mode stage, but the revision has no
    /// dry-mode steam injection.
    #[error("dry-mode steam injection is not supported by this revision")]
    DrySteamUnsupported,

    /// Stage timer exceeds the revision's maximum duration.
    #[error("timer exceeds the maximum of {max_secs}s for this revision")]
    TimerTooLong { max_secs: u32 },
}

/// Unknown or unbound device id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no device with id {id:?} in the last discovery result")]
pub struct DeviceNotFoundError {
    pub id: String,
}

/// Unknown recipe id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no recipe with id {id:?} in the library")]
pub struct RecipeNotFoundError {
    pub id: String,
}

/// A command could not be delivered or was refused by the appliance.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The appliance refused the command outright. Not retriable.
    #[error("device rejected command: {reason}")]
    Rejected { reason: String },

    /// The device is not in a state that accepts new cook commands.
    #[error("device is {state}, not accepting new cook commands")]
    Busy { state: DeviceState },

    /// The transport failed transiently. Retried by the session.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The retry budget is spent; the session has gone back to disconnected.
    #[error("command failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// The caller's deadline elapsed or the operation was cancelled.
    #[error("command cancelled")]
    Cancelled,
}

impl CommandError {
    /// Whether the session's retry loop may attempt this command again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Missing or invalid process configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// No API token configured.
    #[error("no API token configured (set connection.token or OVENCTL_TOKEN)")]
    MissingToken,

    /// The connection URL could not be parsed.
    #[error("invalid connection url {url:?}")]
    InvalidUrl { url: String },
}
