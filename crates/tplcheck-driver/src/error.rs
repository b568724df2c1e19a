use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("provision failed: {0}")]
    ProvisionFailed(String),

    #[error("teardown failed: {0}")]
    TeardownFailed(String),

    #[error("terraform output '{0}' is missing")]
    MissingOutput(String),

    #[error("compute client initialisation failed: {0}")]
    ClientInit(String),

    #[error("instance template {0} not found")]
    NotFound(String),

    #[error("compute API error: {0}")]
    Api(String),

    #[error("compute API request timed out after {0:?}")]
    Timeout(Duration),

    #[error("decode compute API response: {0}")]
    Decode(String),

    #[error("internal driver error: {0}")]
    Internal(String),

    #[error(transparent)]
    Domain(#[from] tplcheck_domain::DomainError),
}
