//! A stand-in `terraform` binary: a shell script that appends each
//! invocation to a log file and prints canned outputs.

#![allow(dead_code)]

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tplcheck_driver::TerraformRunner;

const SCRIPT: &str = r#"#!/bin/sh
echo "$*" >> "$FAKE_TF_LOG"
if [ "$1" = "$FAKE_TF_FAIL" ]; then
  echo "Error: simulated $1 failure" >&2
  exit 1
fi
if [ "$1" = "output" ]; then
  cat "$FAKE_TF_OUTPUTS"
fi
exit 0
"#;

pub struct FakeTerraform {
    pub root: tempfile::TempDir,
    pub config_dir: PathBuf,
    binary: PathBuf,
    log: PathBuf,
    outputs: PathBuf,
}

impl FakeTerraform {
    pub fn new(outputs_json: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let binary = root.path().join("terraform");
        std::fs::write(&binary, SCRIPT).unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config_dir = root.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();

        let outputs = root.path().join("outputs.json");
        std::fs::write(&outputs, outputs_json).unwrap();

        let log = root.path().join("calls.log");
        Self { root, config_dir, binary, log, outputs }
    }

    pub fn binary(&self) -> String {
        path_str(&self.binary)
    }

    /// Environment that makes `command` (init, apply, output or destroy) exit 1.
    pub fn env(&self, command: Option<&str>) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("FAKE_TF_LOG".to_string(), path_str(&self.log));
        env.insert("FAKE_TF_OUTPUTS".to_string(), path_str(&self.outputs));
        env.insert("FAKE_TF_FAIL".to_string(), command.unwrap_or("none").to_string());
        env
    }

    /// Replace what `terraform output -json` prints.
    pub fn set_outputs(&self, outputs_json: &str) {
        std::fs::write(&self.outputs, outputs_json).unwrap();
    }

    /// Runner whose `command` (init, apply, output or destroy) exits 1.
    pub fn runner_failing(&self, command: Option<&str>) -> TerraformRunner {
        TerraformRunner::new(self.binary(), self.env(command), Duration::from_secs(30))
    }

    pub fn runner(&self) -> TerraformRunner {
        self.runner_failing(None)
    }

    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(command))
            .count()
    }
}

fn path_str(p: &Path) -> String {
    p.display().to_string()
}

pub const OUTPUTS: &str = r#"{
  "name": { "sensitive": false, "type": "string", "value": "test-vm-simple-vm-template" },
  "template_id": { "sensitive": false, "type": "string",
                   "value": "projects/test-proj/global/instanceTemplates/test-vm-simple-vm-template" }
}"#;
