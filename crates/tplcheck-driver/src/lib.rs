pub mod error;
pub mod gcp;
pub mod lifecycle;
pub mod terraform;

pub use error::DriverError;
pub use gcp::{ComputeClient, StaticToken, TemplateReader, TokenProvider};
pub use lifecycle::{with_provisioned, Provisioned};
pub use terraform::{TerraformOutputs, TerraformRunner, Workspace};
