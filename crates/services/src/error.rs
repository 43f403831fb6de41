//! Shared error types for the services crate.

use thiserror::Error;

use edu_core::error::Error as DomainError;
use edu_core::scoring::ScoringError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Failure categories every service call reports.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// Only the read-only demo catalog is available.
    #[error("database not configured")]
    NotConfigured,
    #[error("unauthorized")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error(transparent)]
    Storage(StorageError),
}

impl ServiceError {
    pub(crate) fn invalid(err: impl Into<DomainError>) -> Self {
        ServiceError::InvalidInput(err.into().to_string())
    }

    /// Map a storage failure, naming the entity a `NotFound` refers to.
    pub(crate) fn storage(entity: &'static str) -> impl Fn(StorageError) -> Self {
        move |err| match err {
            StorageError::NotFound => ServiceError::NotFound(entity),
            other => ServiceError::from(other),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotConfigured => ServiceError::NotConfigured,
            StorageError::NotFound => ServiceError::NotFound("record"),
            StorageError::Conflict => ServiceError::Conflict("record already exists"),
            other => ServiceError::Storage(other),
        }
    }
}

impl From<ScoringError> for ServiceError {
    fn from(err: ScoringError) -> Self {
        ServiceError::invalid(err)
    }
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error("dashboard stats unavailable: {0}")]
    StatsUnavailable(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
