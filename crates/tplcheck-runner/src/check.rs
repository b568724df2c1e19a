//! Flat comparison of a live instance template against the variables it was
//! provisioned from.
//!
//! Every check runs; a mismatch is recorded as a failed [`Assertion`] and
//! never short-circuits the rest. Absent booleans read as `false`, matching
//! the API's proto3 defaults. Absent strings read as `<missing>`.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tplcheck_domain::{InstanceTemplate, ServiceAccount, ShieldedInstanceConfig, TemplateVars};

const MISSING: &str = "<missing>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub label: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
}

impl std::fmt::Display for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.passed {
            write!(f, "ok   {}", self.label)
        } else {
            write!(f, "FAIL {}: expected {}, got {}", self.label, self.expected, self.actual)
        }
    }
}

/// Properties the live template must have.
#[derive(Debug, Clone, PartialEq)]
pub struct Expected {
    pub name_suffix: String,
    pub machine_type: String,
    pub min_cpu_platform: Option<String>,
    pub disk_size_gb: i64,
    pub disk_type: String,
    /// `Some` only when shielded VM is enabled.
    pub shielded: Option<ShieldedInstanceConfig>,
    pub confidential: bool,
    pub confidential_instance_type: Option<String>,
    pub service_account: Option<ServiceAccount>,
    pub kms_key: Option<String>,
    pub on_host_maintenance: String,
    pub preemptible: bool,
    pub spot: bool,
    pub sole_tenancy: bool,
}

impl Expected {
    pub fn from_vars(vars: &TemplateVars, name_suffix: &str) -> Self {
        let shielded = if vars.enable_shielded_vm {
            Some(
                vars.shielded_instance_config
                    .clone()
                    .unwrap_or_else(ShieldedInstanceConfig::all_enabled),
            )
        } else {
            None
        };

        Self {
            name_suffix: name_suffix.to_string(),
            machine_type: vars.machine_type.clone(),
            min_cpu_platform: vars.min_cpu_platform.clone(),
            disk_size_gb: i64::from(vars.disk_size_gb),
            disk_type: vars.disk_type.clone(),
            shielded,
            confidential: vars.enable_confidential_vm,
            confidential_instance_type: vars.confidential_instance_type.clone(),
            service_account: vars.service_account.clone(),
            kms_key: vars.disk_encryption_key.clone(),
            on_host_maintenance: vars.on_host_maintenance.clone(),
            preemptible: vars.preemptible,
            spot: vars.spot,
            sole_tenancy: vars.enable_sole_tenancy,
        }
    }
}

/// Run every applicable check against `template`. `name_output` is the
/// module's `name` output.
pub fn check_template(
    expected: &Expected,
    name_output: &str,
    template: &InstanceTemplate,
) -> Vec<Assertion> {
    let mut c = Checker::default();

    c.contains("Template name should contain case suffix", &expected.name_suffix, Some(name_output));

    let props = template.properties.as_ref();
    let disk = template.first_disk();
    let init = disk.and_then(|d| d.initialize_params.as_ref());

    c.equal(
        "Machine type should match",
        &expected.machine_type,
        props.and_then(|p| p.machine_type.as_ref()),
    );
    if let Some(platform) = &expected.min_cpu_platform {
        c.equal(
            "Minimum CPU platform should match",
            platform,
            props.and_then(|p| p.min_cpu_platform.as_ref()),
        );
    }
    c.equal(
        "Disk size should match",
        &expected.disk_size_gb,
        init.and_then(|i| i.disk_size_gb.as_ref()),
    );
    c.equal(
        "Disk type should match",
        &expected.disk_type,
        init.and_then(|i| i.disk_type.as_ref()),
    );

    if let Some(shielded) = &expected.shielded {
        let actual = props.and_then(|p| p.shielded_instance_config.as_ref());
        c.flag(
            "Secure Boot should be enabled",
            shielded.enable_secure_boot,
            actual.and_then(|s| s.enable_secure_boot),
        );
        c.flag(
            "vTPM should be enabled",
            shielded.enable_vtpm,
            actual.and_then(|s| s.enable_vtpm),
        );
        c.flag(
            "Integrity Monitoring should be enabled",
            shielded.enable_integrity_monitoring,
            actual.and_then(|s| s.enable_integrity_monitoring),
        );
    }

    if expected.confidential {
        let actual = props.and_then(|p| p.confidential_instance_config.as_ref());
        c.flag(
            "Confidential Compute should be enabled",
            true,
            actual.and_then(|cfg| cfg.enable_confidential_compute),
        );
        if let Some(kind) = &expected.confidential_instance_type {
            c.equal(
                "Confidential instance type should match",
                kind,
                actual.and_then(|cfg| cfg.confidential_instance_type.as_ref()),
            );
        }
    }

    if let Some(sa) = &expected.service_account {
        let accounts = props.map(|p| p.service_accounts.as_slice()).unwrap_or_default();
        c.record(
            "Service account should be set",
            "at least one service account",
            format!("{} service account(s)", accounts.len()),
            !accounts.is_empty(),
        );
        let first = template.first_service_account();
        c.equal(
            "Service account email should match",
            &sa.email,
            first.and_then(|a| a.email.as_ref()),
        );
        let scopes = first.map(|a| a.scopes.as_slice()).unwrap_or_default();
        for scope in &sa.scopes {
            c.record(
                "Service account scope should include configured scope",
                scope.clone(),
                format!("{:?}", scopes),
                scopes.contains(scope),
            );
        }
    }

    if let Some(key) = &expected.kms_key {
        c.equal(
            "CMEK encryption key should match",
            key,
            disk.and_then(|d| d.disk_encryption_key.as_ref())
                .and_then(|k| k.kms_key_name.as_ref()),
        );
    }

    let scheduling = props.and_then(|p| p.scheduling.as_ref());
    c.equal(
        "On-host maintenance should match",
        &expected.on_host_maintenance,
        scheduling.and_then(|s| s.on_host_maintenance.as_ref()),
    );
    c.flag(
        "Preemptible should match",
        expected.preemptible,
        scheduling.and_then(|s| s.preemptible),
    );
    if expected.spot {
        c.equal(
            "Provisioning model should be SPOT",
            "SPOT",
            scheduling.and_then(|s| s.provisioning_model.as_deref()),
        );
    }
    if expected.sole_tenancy {
        let affinities = scheduling.map(|s| s.node_affinities.len()).unwrap_or(0);
        c.record(
            "Sole-tenancy node affinity should be set",
            "at least one node affinity",
            format!("{} node affinity(ies)", affinities),
            affinities > 0,
        );
    }

    c.results
}

#[derive(Default)]
struct Checker {
    results: Vec<Assertion>,
}

impl Checker {
    fn record(
        &mut self,
        label: &str,
        expected: impl Into<String>,
        actual: impl Into<String>,
        passed: bool,
    ) {
        self.results.push(Assertion {
            label: label.to_string(),
            expected: expected.into(),
            actual: actual.into(),
            passed,
        });
    }

    fn equal<T>(&mut self, label: &str, expected: &T, actual: Option<&T>)
    where
        T: PartialEq + Display + ?Sized,
    {
        let passed = actual == Some(expected);
        let actual = actual.map_or_else(|| MISSING.to_string(), |a| a.to_string());
        self.record(label, expected.to_string(), actual, passed);
    }

    fn flag(&mut self, label: &str, expected: bool, actual: Option<bool>) {
        let actual = actual.unwrap_or(false);
        self.record(label, expected.to_string(), actual.to_string(), actual == expected);
    }

    fn contains(&mut self, label: &str, needle: &str, haystack: Option<&str>) {
        let passed = haystack.is_some_and(|h| h.contains(needle));
        self.record(
            label,
            format!("contains {:?}", needle),
            haystack.unwrap_or(MISSING),
            passed,
        );
    }
}
