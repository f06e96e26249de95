use crate::scripting::vars::VarType;

/// Convenience result type used across Mirava.
pub type MiravaResult<T> = Result<T, MiravaError>;

/// Top-level error taxonomy used by session APIs.
///
/// Every asynchronous operation reports failures to its own caller only;
/// there is no global error channel, and none of these are fatal to the
/// per-frame tick.
#[derive(thiserror::Error, Debug)]
pub enum MiravaError {
    /// Invalid caller-provided data or state.
    #[error("validation error: {0}")]
    Validation(String),

    /// An effect failed to fetch, decode, or construct in the engine. The
    /// target slot is left unchanged.
    #[error("effect load failed: {0}")]
    EffectLoadFailed(String),

    /// A pending effect load was superseded by a newer `switch_effect` or a
    /// `clear_effect` on the same slot. Benign replacement, not a failure.
    #[error("switch effect canceled")]
    SwitchEffectCanceled,

    /// No variable with this name in the requested scope.
    #[error("variable '{0}' not found")]
    VariableNotFound(String),

    /// The variable exists but holds a different type than the accessor asked for.
    #[error("variable '{name}' holds {actual:?}, requested {requested:?}")]
    VariableTypeMismatch {
        /// Variable name.
        name: String,
        /// Type the accessor asked for.
        requested: VarType,
        /// Type the variable actually holds.
        actual: VarType,
    },

    /// A recording session is already active; at most one may run at a time.
    #[error("video recording is already active")]
    RecordingAlreadyActive,

    /// `finish_video_recording` was called with no active recording.
    #[error("no video recording in progress")]
    NotRecording,

    /// Microphone access was requested and denied.
    #[error("audio permission denied")]
    AudioPermissionDenied,

    /// A capture backend failed to ingest or assemble media.
    #[error("capture error: {0}")]
    Capture(String),

    /// The native tracking engine rejected a call.
    #[error("engine error: {0}")]
    Engine(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MiravaError {
    /// Build a [`MiravaError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MiravaError::EffectLoadFailed`] value.
    pub fn effect_load(msg: impl Into<String>) -> Self {
        Self::EffectLoadFailed(msg.into())
    }

    /// Build a [`MiravaError::Capture`] value.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Build a [`MiravaError::Engine`] value.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// True for [`MiravaError::SwitchEffectCanceled`], which signals benign
    /// supersession rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::SwitchEffectCanceled)
    }
}
