use thiserror::Error;

use crate::{config::validation::ValidationError, ports::admin_client::AdminClientError};

/// Error surfaced by the reconciler.
///
/// Admin API failures pass through untouched so callers can match on the exact
/// transport error that aborted a run.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum KongError {
    /// The configuration cannot be used; raised before any request is sent
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Admin(#[from] AdminClientError),
}

/// Result type alias for reconciler operations
pub type KongResult<T> = Result<T, KongError>;
