use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw YAML representation of `tplcheck.yml`. Every field is optional here;
/// required settings are enforced during conversion so environment
/// overrides can fill the gaps.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub project: Option<String>,
    pub region: Option<String>,
    /// Relative paths resolve against the config file's directory.
    pub module_root: Option<String>,
    /// "terraform" (default) or "tofu", or an absolute path to either.
    pub tool: Option<String>,
    pub name_prefix: Option<String>,
    pub verify_timeout_secs: Option<u64>,
    pub command_timeout_secs: Option<u64>,
    pub kms_key: Option<String>,
    pub network: Option<String>,
    pub subnetwork: Option<String>,
    /// Per-case directory overrides keyed by case name.
    #[serde(default)]
    pub cases: HashMap<String, String>,
    /// Extra environment for the terraform subprocess.
    #[serde(default)]
    pub env: HashMap<String, String>,
}
