use thiserror::Error;

use crate::application::repository::RepositoryError;
use crate::infra::error::InfraError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("cache verification failed: {0}")]
    Verification(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
