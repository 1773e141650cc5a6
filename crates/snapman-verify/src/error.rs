#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("invalid sha256 hex '{value}': {reason}")]
    InvalidHex { value: String, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, VerificationError>;
