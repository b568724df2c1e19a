use serde_json::json;

use crate::error::DomainError;
use crate::snapshot::*;
use crate::types::*;

#[test]
fn case_kind_parses_and_displays() {
    for case in CaseKind::ALL {
        let parsed: CaseKind = case.as_str().parse().unwrap();
        assert_eq!(parsed, case);
    }
    assert_eq!("sole_tenancy".parse::<CaseKind>().unwrap(), CaseKind::SoleTenancy);
    assert!(matches!("gpu".parse::<CaseKind>(), Err(DomainError::UnknownCase(_))));
}

#[test]
fn case_suffixes_match_module_names() {
    assert_eq!(CaseKind::Simple.name_suffix(), "simple-vm-template");
    assert_eq!(CaseKind::Confidential.name_suffix(), "confidential-vm-template");
    assert_eq!(CaseKind::Shielded.name_suffix(), "shielded-vm-template");
    assert_eq!(CaseKind::SoleTenancy.name_suffix(), "sole-tenancy-vm-template");
    assert_eq!(CaseKind::Advanced.name_suffix(), "advanced-vm-template");
}

#[test]
fn tfvars_omit_unset_optionals() {
    let vars = TemplateVars::new("test-vm", "us-central1");
    let value: serde_json::Value = serde_json::from_str(&vars.to_tfvars_json().unwrap()).unwrap();

    assert_eq!(value["machine_type"], "n1-standard-1");
    assert_eq!(value["disk_size_gb"], 50);
    assert_eq!(value["source_image"], "");
    assert!(value.get("min_cpu_platform").is_none());
    assert!(value.get("service_account").is_none());
    assert!(value.get("disk_encryption_key").is_none());
}

#[test]
fn tfvars_nest_shielded_and_service_account() {
    let mut vars = TemplateVars::new("test-vm", "us-central1");
    vars.enable_shielded_vm = true;
    vars.shielded_instance_config = Some(ShieldedInstanceConfig::all_enabled());
    vars.service_account = Some(ServiceAccount {
        email: "default".into(),
        scopes: vec![CLOUD_PLATFORM_SCOPE.into()],
    });

    let value: serde_json::Value = serde_json::from_str(&vars.to_tfvars_json().unwrap()).unwrap();
    assert_eq!(
        value["shielded_instance_config"],
        json!({
            "enable_secure_boot": true,
            "enable_vtpm": true,
            "enable_integrity_monitoring": true,
        })
    );
    assert_eq!(value["service_account"]["email"], "default");
    assert_eq!(value["service_account"]["scopes"][0], CLOUD_PLATFORM_SCOPE);
}

#[test]
fn validate_rejects_bad_prefix() {
    for prefix in ["", "Test-vm", "1vm", "vm_under", "a-very-long-prefix-that-exceeds-the-cap"] {
        let vars = TemplateVars::new(prefix, "us-central1");
        assert!(
            matches!(vars.validate(), Err(DomainError::InvalidNamePrefix(_))),
            "prefix {:?} should be rejected",
            prefix
        );
    }
    assert!(TemplateVars::new("test-vm-1a2b", "us-central1").validate().is_ok());
}

#[test]
fn validate_rejects_spot_with_migrate() {
    let mut vars = TemplateVars::new("test-vm", "us-central1");
    vars.spot = true;
    assert!(vars.validate().is_err());
    vars.on_host_maintenance = "TERMINATE".into();
    assert!(vars.validate().is_ok());
}

#[test]
fn validate_rejects_confidential_type_without_flag() {
    let mut vars = TemplateVars::new("test-vm", "us-central1");
    vars.confidential_instance_type = Some("SEV_SNP".into());
    assert!(vars.validate().is_err());
    vars.enable_confidential_vm = true;
    assert!(vars.validate().is_ok());
}

#[test]
fn validate_rejects_service_account_without_scopes() {
    let mut vars = TemplateVars::new("test-vm", "us-central1");
    vars.service_account = Some(ServiceAccount { email: "default".into(), scopes: vec![] });
    assert!(vars.validate().is_err());
}

#[test]
fn template_ref_parses_global_id() {
    let r = TemplateRef::parse("projects/p1/global/instanceTemplates/tpl-a", "fallback").unwrap();
    assert_eq!(r.project, "p1");
    assert_eq!(r.region, None);
    assert_eq!(r.name, "tpl-a");
    assert_eq!(r.api_path(), "compute/v1/projects/p1/global/instanceTemplates/tpl-a");
}

#[test]
fn template_ref_parses_regional_self_link() {
    let r = TemplateRef::parse(
        "https://www.googleapis.com/compute/v1/projects/p1/regions/us-central1/instanceTemplates/tpl-b",
        "fallback",
    )
    .unwrap();
    assert_eq!(r.region.as_deref(), Some("us-central1"));
    assert_eq!(r.name, "tpl-b");
    assert_eq!(r.to_string(), "projects/p1/regions/us-central1/instanceTemplates/tpl-b");
}

#[test]
fn template_ref_bare_name_uses_default_project() {
    let r = TemplateRef::parse("tpl-c", "my-project").unwrap();
    assert_eq!(r.project, "my-project");
    assert_eq!(r.name, "tpl-c");
}

#[test]
fn template_ref_rejects_garbage() {
    assert!(TemplateRef::parse("", "p").is_err());
    assert!(TemplateRef::parse("zones/us-central1-a/instances/x", "p").is_err());
    assert!(TemplateRef::parse("projects/p/global/instances/x", "p").is_err());
}

#[test]
fn disk_size_accepts_string_and_number() {
    let from_str: DiskInitializeParams =
        serde_json::from_value(json!({ "diskSizeGb": "50" })).unwrap();
    let from_num: DiskInitializeParams =
        serde_json::from_value(json!({ "diskSizeGb": 50 })).unwrap();
    assert_eq!(from_str.disk_size_gb, Some(50));
    assert_eq!(from_str, from_num);

    let absent: DiskInitializeParams = serde_json::from_value(json!({})).unwrap();
    assert_eq!(absent.disk_size_gb, None);
}

#[test]
fn snapshot_decodes_compute_response() {
    let tpl: InstanceTemplate = serde_json::from_value(json!({
        "kind": "compute#instanceTemplate",
        "name": "test-vm-advanced-vm-template",
        "properties": {
            "machineType": "n1-standard-1",
            "minCpuPlatform": "AMD Milan",
            "disks": [{
                "boot": true,
                "initializeParams": { "diskSizeGb": "50", "diskType": "pd-balanced" },
                "diskEncryptionKey": { "kmsKeyName": "projects/p/locations/global/keyRings/r/cryptoKeys/k" },
            }],
            "shieldedInstanceConfig": {
                "enableSecureBoot": true,
                "enableVtpm": true,
                "enableIntegrityMonitoring": true,
            },
            "confidentialInstanceConfig": { "enableConfidentialCompute": true },
            "serviceAccounts": [{ "email": "default", "scopes": [CLOUD_PLATFORM_SCOPE] }],
            "scheduling": { "onHostMaintenance": "MIGRATE", "preemptible": false },
        },
    }))
    .unwrap();

    let disk = tpl.first_disk().unwrap();
    assert_eq!(disk.initialize_params.as_ref().unwrap().disk_size_gb, Some(50));
    assert_eq!(
        disk.disk_encryption_key.as_ref().unwrap().kms_key_name.as_deref(),
        Some("projects/p/locations/global/keyRings/r/cryptoKeys/k")
    );
    assert_eq!(tpl.first_service_account().unwrap().email.as_deref(), Some("default"));
}

#[test]
fn snapshot_tolerates_missing_properties() {
    let tpl: InstanceTemplate = serde_json::from_value(json!({ "name": "bare" })).unwrap();
    assert!(tpl.first_disk().is_none());
    assert!(tpl.first_service_account().is_none());
}
