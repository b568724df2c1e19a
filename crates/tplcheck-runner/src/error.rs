use thiserror::Error;

use tplcheck_config::ConfigError;
use tplcheck_domain::DomainError;
use tplcheck_driver::DriverError;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}
