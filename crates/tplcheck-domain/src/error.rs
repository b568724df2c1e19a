use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid name prefix '{0}': must start with a lowercase letter and contain only [a-z0-9-]")]
    InvalidNamePrefix(String),

    #[error("invalid template reference: {0}")]
    InvalidTemplateRef(String),

    #[error("unknown case '{0}' (expected simple, confidential, shielded, sole-tenancy or advanced)")]
    UnknownCase(String),

    #[error("invalid variables: {0}")]
    InvalidVars(String),
}
