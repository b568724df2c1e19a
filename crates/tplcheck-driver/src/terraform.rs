use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tplcheck_domain::TemplateVars;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DriverError;

/// Lines of combined output kept in error messages.
const LOG_TAIL_LINES: usize = 20;

// ── Workspace ─────────────────────────────────────────────────────────────────

/// One provisioning run against a configuration directory.
///
/// Variables are written to a per-run `tplcheck.tfvars.json` under the system
/// temp dir rather than into the configuration directory, so the module
/// checkout is never modified by the harness. The run directory is removed on
/// drop.
#[derive(Debug)]
pub struct Workspace {
    pub run_id: Uuid,
    /// The Terraform configuration directory (`terraform -chdir` target).
    pub dir: PathBuf,
    run_dir: PathBuf,
    var_file: PathBuf,
}

impl Workspace {
    pub fn prepare(dir: &Path, vars: &TemplateVars) -> Result<Self, DriverError> {
        vars.validate()?;
        if !dir.is_dir() {
            return Err(DriverError::ProvisionFailed(format!(
                "configuration directory {} does not exist",
                dir.display()
            )));
        }

        let run_id = Uuid::new_v4();
        let run_dir = std::env::temp_dir().join("tplcheck").join(run_id.to_string());
        std::fs::create_dir_all(&run_dir)
            .map_err(|e| DriverError::Internal(format!("create run dir {}: {}", run_dir.display(), e)))?;

        let var_file = run_dir.join("tplcheck.tfvars.json");
        std::fs::write(&var_file, vars.to_tfvars_json()?)
            .map_err(|e| DriverError::Internal(format!("write {}: {}", var_file.display(), e)))?;

        debug!(%run_id, dir = %dir.display(), "prepared terraform workspace");
        Ok(Self { run_id, dir: dir.to_path_buf(), run_dir, var_file })
    }

    pub fn var_file(&self) -> &Path {
        &self.var_file
    }

    fn var_file_arg(&self) -> String {
        format!("-var-file={}", self.var_file.display())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.run_dir) {
            debug!(run_dir = %self.run_dir.display(), error = %e, "failed to remove run dir");
        }
    }
}

// ── Outputs ───────────────────────────────────────────────────────────────────

/// Named outputs of an applied configuration, as read once from
/// `terraform output -json`.
#[derive(Debug, Clone, Default)]
pub struct TerraformOutputs {
    values: HashMap<String, serde_json::Value>,
}

impl TerraformOutputs {
    /// Parse the `{"name": {"value": ..., "type": ..., "sensitive": ...}}`
    /// document printed by `terraform output -json`.
    pub fn parse(json: &str) -> Result<Self, DriverError> {
        let doc: HashMap<String, serde_json::Value> = serde_json::from_str(json.trim())
            .map_err(|e| DriverError::ProvisionFailed(format!("parse terraform output: {}", e)))?;

        let values = doc
            .into_iter()
            .filter_map(|(key, entry)| entry.get("value").cloned().map(|v| (key, v)))
            .collect();
        Ok(Self { values })
    }

    /// String value of output `name`. Non-string values are rendered as
    /// compact JSON.
    pub fn get(&self, name: &str) -> Result<String, DriverError> {
        match self.values.get(name) {
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(serde_json::Value::Null) | None => Err(DriverError::MissingOutput(name.to_string())),
            Some(other) => Ok(other.to_string()),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ── TerraformRunner ───────────────────────────────────────────────────────────

/// Combined result of one terraform invocation.
struct CommandOutput {
    exit_code: i32,
    stdout: String,
    log: String,
}

/// Drives the `terraform` (or `tofu`) binary through init, apply, output and
/// destroy for a [`Workspace`].
///
/// The subprocess environment is exactly the inherited environment plus
/// `env` plus the automation flags; nothing else is read implicitly.
#[derive(Debug, Clone)]
pub struct TerraformRunner {
    pub binary: String,
    pub env: HashMap<String, String>,
    /// Hard limit per subprocess; the child is killed when exceeded.
    pub timeout: Duration,
}

impl TerraformRunner {
    pub fn new(binary: impl Into<String>, env: HashMap<String, String>, timeout: Duration) -> Self {
        Self { binary: binary.into(), env, timeout }
    }

    /// `terraform init` followed by `terraform apply`.
    pub async fn init_and_apply(&self, ws: &Workspace) -> Result<(), DriverError> {
        let init = self
            .run_tf(&ws.dir, &["init", "-input=false", "-no-color"])
            .await
            .map_err(|e| DriverError::ProvisionFailed(format!("terraform init: {}", e)))?;
        if init.exit_code != 0 {
            return Err(DriverError::ProvisionFailed(format!(
                "terraform init exited with code {}\n{}",
                init.exit_code,
                tail(&init.log)
            )));
        }

        let var_file = ws.var_file_arg();
        let apply = self
            .run_tf(&ws.dir, &["apply", "-auto-approve", "-input=false", "-no-color", &var_file])
            .await
            .map_err(|e| DriverError::ProvisionFailed(format!("terraform apply: {}", e)))?;
        if apply.exit_code != 0 {
            return Err(DriverError::ProvisionFailed(format!(
                "terraform apply exited with code {}\n{}",
                apply.exit_code,
                tail(&apply.log)
            )));
        }

        info!(run_id = %ws.run_id, dir = %ws.dir.display(), "terraform apply complete");
        Ok(())
    }

    /// Run `terraform output -json` once and parse every output.
    pub async fn outputs(&self, ws: &Workspace) -> Result<TerraformOutputs, DriverError> {
        let out = self.run_tf(&ws.dir, &["output", "-json", "-no-color"]).await?;
        if out.exit_code != 0 {
            return Err(DriverError::ProvisionFailed(format!(
                "terraform output exited with code {}\n{}",
                out.exit_code,
                tail(&out.log)
            )));
        }
        TerraformOutputs::parse(&out.stdout)
    }

    /// `terraform destroy` with the same variables the workspace was applied with.
    pub async fn destroy(&self, ws: &Workspace) -> Result<(), DriverError> {
        let var_file = ws.var_file_arg();
        let destroy = self
            .run_tf(&ws.dir, &["destroy", "-auto-approve", "-input=false", "-no-color", &var_file])
            .await
            .map_err(|e| DriverError::TeardownFailed(format!("terraform destroy: {}", e)))?;
        if destroy.exit_code != 0 {
            return Err(DriverError::TeardownFailed(format!(
                "terraform destroy exited with code {}\n{}",
                destroy.exit_code,
                tail(&destroy.log)
            )));
        }

        info!(run_id = %ws.run_id, dir = %ws.dir.display(), "terraform destroy complete");
        Ok(())
    }

    // ── Process execution ─────────────────────────────────────────────────────

    /// Run a terraform sub-command in `dir`, capturing stdout on its own and
    /// stdout+stderr interleaved as they arrive.
    async fn run_tf(&self, dir: &Path, args: &[&str]) -> Result<CommandOutput, DriverError> {
        info!(binary = %self.binary, ?args, dir = %dir.display(), "running terraform command");

        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(dir)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .envs(&self.env)
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| DriverError::Internal(format!("spawn {}: {}", self.binary, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::Internal("child stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DriverError::Internal("child stderr not captured".into()))?;

        // (is_stdout, line)
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<(bool, String)>();

        let tx1 = tx.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx1.send((true, line));
            }
        });

        let tx2 = tx.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = tx2.send((false, line));
            }
        });

        drop(tx);

        let mut log = String::new();
        let mut out = String::new();
        let collect = async {
            while let Some((is_stdout, line)) = rx.recv().await {
                debug!(target: "tplcheck::iac", "{}", line);
                if is_stdout {
                    out.push_str(&line);
                    out.push('\n');
                }
                log.push_str(&line);
                log.push('\n');
            }
        };
        let timed_out = tokio::time::timeout(self.timeout, collect).await.is_err();

        if timed_out {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            return Err(DriverError::Internal(format!(
                "{} {} timed out after {:?}",
                self.binary,
                args.first().copied().unwrap_or(""),
                self.timeout,
            )));
        }

        stdout_task.await.ok();
        stderr_task.await.ok();

        let status = child
            .wait()
            .await
            .map_err(|e| DriverError::Internal(format!("wait {}: {}", self.binary, e)))?;

        let exit_code = status.code().unwrap_or(-1);
        if exit_code != 0 {
            warn!(binary = %self.binary, exit_code, ?args, "terraform command exited non-zero");
        }
        Ok(CommandOutput { exit_code, stdout: out, log })
    }
}

fn tail(log: &str) -> String {
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_parse_terraform_json() {
        let outputs = TerraformOutputs::parse(
            r#"{
                "name": { "sensitive": false, "type": "string", "value": "test-vm-simple-vm-template" },
                "template_id": { "sensitive": false, "type": "string",
                                 "value": "projects/p/global/instanceTemplates/test-vm-simple-vm-template" },
                "tags": { "sensitive": false, "type": ["list", "string"], "value": ["a", "b"] }
            }"#,
        )
        .unwrap();

        assert_eq!(outputs.get("name").unwrap(), "test-vm-simple-vm-template");
        assert_eq!(outputs.get("tags").unwrap(), r#"["a","b"]"#);
        assert_eq!(outputs.names(), vec!["name", "tags", "template_id"]);
    }

    #[test]
    fn missing_output_is_an_error() {
        let outputs = TerraformOutputs::parse(r#"{ "name": { "value": null } }"#).unwrap();
        assert!(matches!(outputs.get("name"), Err(DriverError::MissingOutput(n)) if n == "name"));
        assert!(matches!(outputs.get("template_id"), Err(DriverError::MissingOutput(_))));
    }

    #[test]
    fn empty_output_document_has_no_names() {
        let outputs = TerraformOutputs::parse("{}\n").unwrap();
        assert!(outputs.names().is_empty());
    }

    #[test]
    fn malformed_output_is_provision_failure() {
        assert!(matches!(
            TerraformOutputs::parse("Warning: no outputs"),
            Err(DriverError::ProvisionFailed(_))
        ));
    }

    #[test]
    fn workspace_writes_var_file_outside_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let vars = TemplateVars::new("test-vm", "us-central1");
        let ws = Workspace::prepare(dir.path(), &vars).unwrap();

        assert!(!ws.var_file().starts_with(dir.path()));
        let written: TemplateVars =
            serde_json::from_str(&std::fs::read_to_string(ws.var_file()).unwrap()).unwrap();
        assert_eq!(written, vars);

        let var_file = ws.var_file().to_path_buf();
        drop(ws);
        assert!(!var_file.exists(), "run dir should be removed on drop");
    }

    #[test]
    fn workspace_rejects_missing_dir() {
        let vars = TemplateVars::new("test-vm", "us-central1");
        let err = Workspace::prepare(Path::new("/nonexistent/tplcheck"), &vars).unwrap_err();
        assert!(matches!(err, DriverError::ProvisionFailed(_)));
    }

    #[test]
    fn workspace_rejects_invalid_vars() {
        let dir = tempfile::tempdir().unwrap();
        let vars = TemplateVars::new("Bad_Prefix", "us-central1");
        assert!(matches!(Workspace::prepare(dir.path(), &vars), Err(DriverError::Domain(_))));
    }

    #[test]
    fn tail_keeps_last_lines() {
        let log: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let t = tail(&log);
        assert!(t.starts_with("line 10"));
        assert!(t.ends_with("line 29"));
    }
}
