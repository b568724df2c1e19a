use serde::{Deserialize, Serialize};

use crate::error::DomainError;

// ── Cases ─────────────────────────────────────────────────────────────────────

/// One of the example configurations shipped with the instance template module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseKind {
    Simple,
    Confidential,
    Shielded,
    SoleTenancy,
    Advanced,
}

impl CaseKind {
    pub const ALL: [CaseKind; 5] = [
        CaseKind::Simple,
        CaseKind::Confidential,
        CaseKind::Shielded,
        CaseKind::SoleTenancy,
        CaseKind::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseKind::Simple => "simple",
            CaseKind::Confidential => "confidential",
            CaseKind::Shielded => "shielded",
            CaseKind::SoleTenancy => "sole-tenancy",
            CaseKind::Advanced => "advanced",
        }
    }

    /// Literal the module's `name` output must contain for this case.
    pub fn name_suffix(&self) -> &'static str {
        match self {
            CaseKind::Simple => "simple-vm-template",
            CaseKind::Confidential => "confidential-vm-template",
            CaseKind::Shielded => "shielded-vm-template",
            CaseKind::SoleTenancy => "sole-tenancy-vm-template",
            CaseKind::Advanced => "advanced-vm-template",
        }
    }

    /// Configuration directory relative to the module root.
    pub fn default_dir(&self) -> &'static str {
        match self {
            CaseKind::Simple => "examples/simple-vm",
            CaseKind::Confidential => "examples/confidential-vm",
            CaseKind::Shielded => "examples/shielded-vm",
            CaseKind::SoleTenancy => "examples/sole-tenancy-vm",
            CaseKind::Advanced => "examples/advanced-vm",
        }
    }
}

impl std::fmt::Display for CaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CaseKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(CaseKind::Simple),
            "confidential" => Ok(CaseKind::Confidential),
            "shielded" => Ok(CaseKind::Shielded),
            "sole-tenancy" | "sole_tenancy" => Ok(CaseKind::SoleTenancy),
            "advanced" => Ok(CaseKind::Advanced),
            other => Err(DomainError::UnknownCase(other.to_string())),
        }
    }
}

// ── Terraform input variables ─────────────────────────────────────────────────

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldedInstanceConfig {
    pub enable_secure_boot: bool,
    pub enable_vtpm: bool,
    pub enable_integrity_monitoring: bool,
}

impl ShieldedInstanceConfig {
    pub fn all_enabled() -> Self {
        Self {
            enable_secure_boot: true,
            enable_vtpm: true,
            enable_integrity_monitoring: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub email: String,
    pub scopes: Vec<String>,
}

/// Input variables handed to the instance template module.
///
/// Serialized as a Terraform JSON variable file. Optional variables that are
/// `None` are left out so the module's own defaults apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVars {
    pub name_prefix: String,
    pub machine_type: String,
    pub region: String,
    /// Empty string exercises the module's image-family fallback.
    pub source_image: String,
    pub source_image_family: String,
    pub source_image_project: String,
    pub enable_shielded_vm: bool,
    pub enable_confidential_vm: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidential_instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_cpu_platform: Option<String>,
    pub on_host_maintenance: String,
    pub preemptible: bool,
    pub spot: bool,
    pub disk_size_gb: u32,
    pub disk_type: String,
    pub enable_sole_tenancy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shielded_instance_config: Option<ShieldedInstanceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<ServiceAccount>,
    pub network: String,
    pub subnetwork: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_encryption_key: Option<String>,
}

impl TemplateVars {
    /// Baseline variables: a small Debian VM with a 50 GB balanced disk and
    /// every optional feature switched off.
    pub fn new(name_prefix: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            machine_type: "n1-standard-1".into(),
            region: region.into(),
            source_image: String::new(),
            source_image_family: "debian-11".into(),
            source_image_project: "debian-cloud".into(),
            enable_shielded_vm: false,
            enable_confidential_vm: false,
            confidential_instance_type: None,
            min_cpu_platform: None,
            on_host_maintenance: "MIGRATE".into(),
            preemptible: false,
            spot: false,
            disk_size_gb: 50,
            disk_type: "pd-balanced".into(),
            enable_sole_tenancy: false,
            shielded_instance_config: None,
            service_account: None,
            network: "default".into(),
            subnetwork: "default".into(),
            disk_encryption_key: None,
        }
    }

    /// Reject combinations the Compute API would refuse before spending
    /// minutes in `terraform apply`.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name_prefix(&self.name_prefix)?;
        if self.region.is_empty() {
            return Err(DomainError::InvalidVars("region must not be empty".into()));
        }
        if self.disk_size_gb < 10 {
            return Err(DomainError::InvalidVars(format!(
                "disk_size_gb must be at least 10, got {}",
                self.disk_size_gb
            )));
        }
        match self.on_host_maintenance.as_str() {
            "MIGRATE" | "TERMINATE" => {}
            other => {
                return Err(DomainError::InvalidVars(format!(
                    "on_host_maintenance must be MIGRATE or TERMINATE, got '{}'",
                    other
                )))
            }
        }
        if (self.preemptible || self.spot) && self.on_host_maintenance == "MIGRATE" {
            return Err(DomainError::InvalidVars(
                "preemptible and spot instances require on_host_maintenance = TERMINATE".into(),
            ));
        }
        if self.confidential_instance_type.is_some() && !self.enable_confidential_vm {
            return Err(DomainError::InvalidVars(
                "confidential_instance_type is set but enable_confidential_vm is false".into(),
            ));
        }
        if let Some(sa) = &self.service_account {
            if sa.email.is_empty() {
                return Err(DomainError::InvalidVars("service_account.email must not be empty".into()));
            }
            if sa.scopes.is_empty() {
                return Err(DomainError::InvalidVars("service_account.scopes must not be empty".into()));
            }
        }
        Ok(())
    }

    /// Render the Terraform JSON variable file (`*.tfvars.json`).
    pub fn to_tfvars_json(&self) -> Result<String, DomainError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DomainError::InvalidVars(format!("serialize variables: {}", e)))
    }
}

/// GCP resource names allow at most 63 characters; the module appends a
/// case suffix, so the prefix is capped well below that.
pub fn validate_name_prefix(s: &str) -> Result<(), DomainError> {
    let mut chars = s.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {
            s.len() <= 32
                && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidNamePrefix(s.to_string()))
    }
}

// ── Template reference ────────────────────────────────────────────────────────

/// Fully resolved address of an instance template in the Compute API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub project: String,
    /// `Some` for regional instance templates, `None` for global ones.
    pub region: Option<String>,
    pub name: String,
}

impl TemplateRef {
    /// Parse a `template_id` output.
    ///
    /// Accepts `projects/{p}/global/instanceTemplates/{n}`,
    /// `projects/{p}/regions/{r}/instanceTemplates/{n}` (optionally behind a
    /// full self-link URL) or a bare template name, which resolves against
    /// `default_project` as a global template.
    pub fn parse(id: &str, default_project: &str) -> Result<Self, DomainError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DomainError::InvalidTemplateRef("empty identifier".into()));
        }

        let Some(idx) = id.find("projects/") else {
            if id.contains('/') {
                return Err(DomainError::InvalidTemplateRef(id.to_string()));
            }
            return Ok(Self {
                project: default_project.to_string(),
                region: None,
                name: id.to_string(),
            });
        };

        let segments: Vec<&str> = id[idx..].split('/').collect();
        match segments.as_slice() {
            ["projects", p, "global", "instanceTemplates", n] if !p.is_empty() && !n.is_empty() => {
                Ok(Self { project: p.to_string(), region: None, name: n.to_string() })
            }
            ["projects", p, "regions", r, "instanceTemplates", n]
                if !p.is_empty() && !r.is_empty() && !n.is_empty() =>
            {
                Ok(Self {
                    project: p.to_string(),
                    region: Some(r.to_string()),
                    name: n.to_string(),
                })
            }
            _ => Err(DomainError::InvalidTemplateRef(id.to_string())),
        }
    }

    /// Path of the template below the Compute API root.
    pub fn api_path(&self) -> String {
        match &self.region {
            Some(region) => format!(
                "compute/v1/projects/{}/regions/{}/instanceTemplates/{}",
                self.project, region, self.name
            ),
            None => format!(
                "compute/v1/projects/{}/global/instanceTemplates/{}",
                self.project, self.name
            ),
        }
    }
}

impl std::fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.region {
            Some(region) => write!(
                f,
                "projects/{}/regions/{}/instanceTemplates/{}",
                self.project, region, self.name
            ),
            None => write!(f, "projects/{}/global/instanceTemplates/{}", self.project, self.name),
        }
    }
}
