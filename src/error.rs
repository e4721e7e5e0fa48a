use thiserror::Error;

/// Errors from the checked, non-primitive entry points.
///
/// Packet primitives are total and never produce these.
#[derive(Error, Debug)]
pub enum PacketError {
    #[error("Length mismatch: expected {expected} elements, found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("Built with target feature `{0}` but the running CPU does not support it")]
    MissingCpuFeature(&'static str),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, PacketError>;
