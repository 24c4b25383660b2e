use thiserror::Error;

/// Rejected `mission.json` values.
///
/// Every variant names the field that failed so the console message is enough
/// to fix the file.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("mission.target_count must be at least 1")]
    ZeroTargets,

    #[error("mission.tick_interval_ms must be greater than zero")]
    ZeroTickInterval,

    #[error("mission.spawn_delay_ms must be greater than zero")]
    ZeroSpawnDelay,

    #[error("mission.proximity_threshold must be a positive number, got {0}")]
    NonPositiveThreshold(f64),

    #[error("mission.speed must be a finite number, got {0}")]
    NonFiniteSpeed(f64),

    #[error("mission.target_assets must name at least one image")]
    NoTargetAssets,

    #[error("log_level '{0}' is not one of off, error, warn, info, debug, trace")]
    InvalidLogLevel(String),
}

/// Failures of the recording session and its save/share handoff.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordingError {
    /// `begin` was called without a live stream.
    #[error("no live stream available to record")]
    NoStream,

    /// Sessions are single-use; a restart builds a new one.
    #[error("recording session already started")]
    AlreadyStarted,

    #[error("capture collaborator failed: {0}")]
    Recorder(String),

    #[error("could not assemble recording: {0}")]
    Assemble(String),

    /// Share and the direct save fallback both failed.
    #[error("could not save recording: {0}")]
    SaveFailed(String),
}
