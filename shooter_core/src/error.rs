use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ShooterError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid update: {0}")]
    Update(String),
    #[error("update channel closed")]
    ChannelClosed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing actuator: {0}")]
    MissingActuator(String),
    #[error("missing flywheel drive")]
    MissingDrive,
    #[error("missing trigger actuator")]
    MissingTrigger,
    #[error("missing exchanges")]
    MissingExchanges,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
