use thiserror::Error;

use openkis_core::{ApiError, ErrorKind, ValidationError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingEnv(_) | Self::InvalidArgument(_) | Self::Validation(_) => 2,
            Self::Api(error) => match error.kind() {
                ErrorKind::Authentication | ErrorKind::TokenExpired => 3,
                ErrorKind::RateLimited => 4,
                _ => 10,
            },
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
