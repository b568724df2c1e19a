use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tplcheck_domain::{validate_name_prefix, CaseKind};
use tracing::debug;

use crate::error::ConfigError;
use crate::raw::RawConfig;

/// Environment variable naming the config file used by `HarnessConfig::from_env`.
pub const ENV_CONFIG: &str = "TPLCHECK_CONFIG";

const ENV_PROJECT: &str = "TPLCHECK_PROJECT";
const ENV_REGION: &str = "TPLCHECK_REGION";
const ENV_MODULE_ROOT: &str = "TPLCHECK_MODULE_ROOT";
const ENV_KMS_KEY: &str = "TPLCHECK_KMS_KEY";
const ENV_TOOL: &str = "TPLCHECK_TOOL";

const DEFAULT_VERIFY_TIMEOUT_SECS: u64 = 300;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 1800;

/// Resolved harness settings. Project and region are always explicit; the
/// harness never falls back to ambient gcloud defaults.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub project: String,
    pub region: String,
    /// Directory holding the instance template module and its `examples/`.
    pub module_root: PathBuf,
    pub tool: String,
    pub name_prefix: String,
    pub verify_timeout: Duration,
    pub command_timeout: Duration,
    /// CMEK key for the advanced case. Absent means the case runs without
    /// disk encryption and skips the key assertion.
    pub kms_key: Option<String>,
    pub network: String,
    pub subnetwork: String,
    pub case_dirs: HashMap<CaseKind, PathBuf>,
    pub env: HashMap<String, String>,
}

impl HarnessConfig {
    /// Load from the file named by `TPLCHECK_CONFIG`, or from environment
    /// variables alone when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        match lookup(ENV_CONFIG) {
            Some(path) => load_config_with(Path::new(&path), lookup),
            None => {
                let cwd = std::env::current_dir().map_err(|e| ConfigError::Io {
                    path: ".".into(),
                    source: e,
                })?;
                convert(RawConfig::default(), &cwd, lookup)
            }
        }
    }

    /// Build a config purely from `lookup`, resolving relative paths against `base`.
    pub fn from_lookup(
        base: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        convert(RawConfig::default(), base, lookup)
    }

    /// Configuration directory for `case`.
    pub fn case_dir(&self, case: CaseKind) -> PathBuf {
        self.case_dirs
            .get(&case)
            .cloned()
            .unwrap_or_else(|| self.module_root.join(case.default_dir()))
    }

    /// Environment for the terraform subprocess. The provider reads project
    /// and region from here, so they are pinned to the harness settings.
    pub fn terraform_env(&self) -> HashMap<String, String> {
        let mut env = self.env.clone();
        env.insert("GOOGLE_PROJECT".into(), self.project.clone());
        env.insert("GOOGLE_REGION".into(), self.region.clone());
        env
    }
}

/// Load `tplcheck.yml` from `path`, applying `TPLCHECK_*` environment overrides.
pub fn load_config(path: &Path) -> Result<HarnessConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

/// Like [`load_config`] but with an injected environment lookup.
pub fn load_config_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<HarnessConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw: RawConfig = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path.display().to_string(),
        source: e,
    })?;
    debug!("Loaded harness config from {}", path.display());

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    convert(raw, base, lookup)
}

fn convert(
    raw: RawConfig,
    base: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<HarnessConfig, ConfigError> {
    let project = lookup(ENV_PROJECT)
        .or(raw.project)
        .ok_or(ConfigError::Missing { key: "project", env: ENV_PROJECT })?;
    reject_placeholder("project", &project)?;

    let region = lookup(ENV_REGION)
        .or(raw.region)
        .ok_or(ConfigError::Missing { key: "region", env: ENV_REGION })?;
    reject_placeholder("region", &region)?;

    let module_root = lookup(ENV_MODULE_ROOT)
        .or(raw.module_root)
        .map(|p| base.join(p))
        .unwrap_or_else(|| base.to_path_buf());

    let tool = lookup(ENV_TOOL)
        .or(raw.tool)
        .unwrap_or_else(|| "terraform".into());

    let name_prefix = raw.name_prefix.unwrap_or_else(|| "test-vm".into());
    validate_name_prefix(&name_prefix)?;

    let verify_timeout = positive_secs(
        "verify_timeout_secs",
        raw.verify_timeout_secs.unwrap_or(DEFAULT_VERIFY_TIMEOUT_SECS),
    )?;
    let command_timeout = positive_secs(
        "command_timeout_secs",
        raw.command_timeout_secs.unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
    )?;

    let kms_key = lookup(ENV_KMS_KEY).or(raw.kms_key);
    if let Some(key) = &kms_key {
        if !key.starts_with("projects/") || !key.contains("/cryptoKeys/") {
            return Err(ConfigError::Invalid {
                key: "kms_key".into(),
                message: format!(
                    "'{}' is not a KMS key resource name (projects/.../cryptoKeys/...)",
                    key
                ),
            });
        }
    }

    let mut case_dirs = HashMap::new();
    for (name, dir) in raw.cases {
        let case: CaseKind = name.parse()?;
        case_dirs.insert(case, module_root.join(dir));
    }

    Ok(HarnessConfig {
        project,
        region,
        module_root,
        tool,
        name_prefix,
        verify_timeout,
        command_timeout,
        kms_key,
        network: raw.network.unwrap_or_else(|| "default".into()),
        subnetwork: raw.subnetwork.unwrap_or_else(|| "default".into()),
        case_dirs,
        env: raw.env,
    })
}

fn reject_placeholder(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("your-") {
        return Err(ConfigError::Invalid {
            key: key.into(),
            message: format!("'{}' looks like a placeholder", value),
        });
    }
    Ok(())
}

fn positive_secs(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key: key.into(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}
