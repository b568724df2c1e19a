pub mod error;
pub mod snapshot;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::DomainError;
pub use snapshot::*;
pub use types::*;
