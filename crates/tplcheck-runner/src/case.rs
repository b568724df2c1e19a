use std::path::PathBuf;

use tplcheck_config::HarnessConfig;
use tplcheck_domain::{
    CaseKind, ServiceAccount, ShieldedInstanceConfig, TemplateVars, CLOUD_PLATFORM_SCOPE,
};
use uuid::Uuid;

/// Everything needed to provision one case.
#[derive(Debug, Clone)]
pub struct CaseSpec {
    pub kind: CaseKind,
    pub dir: PathBuf,
    pub vars: TemplateVars,
}

impl CaseSpec {
    /// Build the case with a run-unique name prefix so parallel runs of the
    /// same case never collide on resource names.
    pub fn build(kind: CaseKind, config: &HarnessConfig) -> Self {
        let prefix = unique_prefix(&config.name_prefix, Uuid::new_v4());
        Self::with_prefix(kind, config, &prefix)
    }

    pub fn with_prefix(kind: CaseKind, config: &HarnessConfig, name_prefix: &str) -> Self {
        Self {
            kind,
            dir: config.case_dir(kind),
            vars: case_vars(kind, config, name_prefix),
        }
    }
}

/// `{prefix}-{6 hex}`, shortening `prefix` so the result stays a valid prefix.
fn unique_prefix(prefix: &str, run_id: Uuid) -> String {
    let short: String = run_id.simple().to_string().chars().take(6).collect();
    let base: String = prefix.chars().take(24).collect();
    format!("{}-{}", base.trim_end_matches('-'), short)
}

/// Variables for `kind` on top of the baseline.
pub fn case_vars(kind: CaseKind, config: &HarnessConfig, name_prefix: &str) -> TemplateVars {
    let mut vars = TemplateVars::new(name_prefix, &config.region);
    vars.network = config.network.clone();
    vars.subnetwork = config.subnetwork.clone();

    match kind {
        CaseKind::Simple => {}
        CaseKind::Confidential => {
            // SEV-SNP needs an N2D shape and cannot live-migrate.
            vars.machine_type = "n2d-standard-2".into();
            vars.enable_confidential_vm = true;
            vars.confidential_instance_type = Some("SEV_SNP".into());
            vars.min_cpu_platform = Some("AMD Milan".into());
            vars.on_host_maintenance = "TERMINATE".into();
        }
        CaseKind::Shielded => {
            vars.enable_shielded_vm = true;
            vars.shielded_instance_config = Some(ShieldedInstanceConfig::all_enabled());
        }
        CaseKind::SoleTenancy => {
            // Instances on sole-tenant nodes cannot live-migrate.
            vars.enable_sole_tenancy = true;
            vars.on_host_maintenance = "TERMINATE".into();
        }
        CaseKind::Advanced => {
            vars.enable_shielded_vm = true;
            vars.shielded_instance_config = Some(ShieldedInstanceConfig::all_enabled());
            vars.enable_confidential_vm = true;
            vars.confidential_instance_type = Some("SEV_SNP".into());
            vars.min_cpu_platform = Some("AMD Milan".into());
            vars.service_account = Some(ServiceAccount {
                email: "default".into(),
                scopes: vec![CLOUD_PLATFORM_SCOPE.into()],
            });
            vars.disk_encryption_key = config.kms_key.clone();
        }
    }
    vars
}
