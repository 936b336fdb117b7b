use common::StorageError;
use sea_orm::DbErr;
use thiserror::Error;

use super::graph::EntityRef;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{0} not found")]
    NotFound(EntityRef),

    #[error("not allowed to delete {0}")]
    Unauthorized(EntityRef),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("file system error: {0}")]
    FileSystem(#[from] StorageError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Why an item or file could not be processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureReason {
    NotFound,
    Unauthorized,
    DatabaseError,
    FileSystemError,
    ConfigError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::FileSystemError => "FILE_SYSTEM_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl LifecycleError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::NotFound(_) => FailureReason::NotFound,
            Self::Unauthorized(_) => FailureReason::Unauthorized,
            Self::Database(_) => FailureReason::DatabaseError,
            Self::FileSystem(_) => FailureReason::FileSystemError,
            Self::Config(_) => FailureReason::ConfigError,
        }
    }
}
