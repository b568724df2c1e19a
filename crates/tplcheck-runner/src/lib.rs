pub mod case;
pub mod check;
pub mod error;
pub mod harness;
pub mod report;

pub use case::CaseSpec;
pub use check::{check_template, Assertion, Expected};
pub use error::RunError;
pub use harness::{destroy_case, Harness};
pub use report::CaseReport;
