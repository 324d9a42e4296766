use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a cooking session is already running")]
    AlreadyRunning,
    #[error("cooking duration must be positive and within the configured limit")]
    InvalidDuration,
    /// Pause or resume with nothing to act on. The controller swallows this.
    #[error("no cooking session is active")]
    NoActiveSession,
    #[error("tick activity fault: {0}")]
    TickFault(&'static str),
}

/// Failure to convert a control panel string into a core type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown power level '{0}'")]
    UnknownPowerLevel(String),
    #[error("power {0}% is outside 0-100")]
    PowerOutOfRange(i64),
    #[error("unknown cooking stage '{0}'")]
    UnknownStage(String),
}
