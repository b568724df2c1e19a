use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tplcheck_domain::CaseKind;
use uuid::Uuid;

use crate::check::Assertion;

/// Outcome of one provision → verify → destroy cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub case: CaseKind,
    pub run_id: Uuid,
    /// Resolved template address, once the `template_id` output was read.
    pub template: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub assertions: Vec<Assertion>,
    /// Provisioning, output or verification failure. When set, the
    /// assertions did not run.
    pub error: Option<String>,
    /// Destroy failure. The template may still exist.
    pub teardown_error: Option<String>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.error.is_none()
            && self.teardown_error.is_none()
            && self.assertions.iter().all(|a| a.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Assertion> {
        self.assertions.iter().filter(|a| !a.passed)
    }

    /// One line per problem; empty when the case passed.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(e) = &self.error {
            out.push(format!("error: {}", e));
        }
        out.extend(self.failures().map(|a| a.to_string()));
        if let Some(e) = &self.teardown_error {
            out.push(format!("teardown: {}", e));
        }
        out
    }

    /// Panic with every recorded problem. For use at the end of a test.
    pub fn assert_passed(&self) {
        if !self.passed() {
            panic!(
                "case {} (run {}) failed:\n  {}",
                self.case,
                self.run_id,
                self.problems().join("\n  ")
            );
        }
    }
}
