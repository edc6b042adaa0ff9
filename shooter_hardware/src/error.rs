use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("unknown joint: {0}")]
    UnknownJoint(String),
    #[error("joint already claimed: {0}")]
    AlreadyClaimed(String),
}

pub type Result<T> = std::result::Result<T, HwError>;
