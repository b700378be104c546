use crate::{capture::CaptureError, pattern::PatternError, shadow::ShadowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Shadow(#[from] ShadowError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
