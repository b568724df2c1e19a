//! Typed projection of the Compute API `InstanceTemplate` resource.
//!
//! Only the fields the harness compares are modelled; everything is optional
//! because the API omits unset fields instead of sending defaults.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceTemplate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub self_link: Option<String>,
    #[serde(default)]
    pub properties: Option<InstanceProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProperties {
    #[serde(default)]
    pub machine_type: Option<String>,
    #[serde(default)]
    pub min_cpu_platform: Option<String>,
    #[serde(default)]
    pub disks: Vec<AttachedDisk>,
    #[serde(default)]
    pub shielded_instance_config: Option<ShieldedInstanceSettings>,
    #[serde(default)]
    pub confidential_instance_config: Option<ConfidentialInstanceSettings>,
    #[serde(default)]
    pub service_accounts: Vec<ServiceAccountSettings>,
    #[serde(default)]
    pub scheduling: Option<Scheduling>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    #[serde(default)]
    pub boot: Option<bool>,
    #[serde(default)]
    pub initialize_params: Option<DiskInitializeParams>,
    #[serde(default)]
    pub disk_encryption_key: Option<DiskEncryptionKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskInitializeParams {
    /// int64 in the API, so the JSON encoding is a string.
    #[serde(default, deserialize_with = "int64_from_string_or_number")]
    pub disk_size_gb: Option<i64>,
    #[serde(default)]
    pub disk_type: Option<String>,
    #[serde(default)]
    pub source_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskEncryptionKey {
    #[serde(default)]
    pub kms_key_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShieldedInstanceSettings {
    #[serde(default)]
    pub enable_secure_boot: Option<bool>,
    #[serde(default)]
    pub enable_vtpm: Option<bool>,
    #[serde(default)]
    pub enable_integrity_monitoring: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidentialInstanceSettings {
    #[serde(default)]
    pub enable_confidential_compute: Option<bool>,
    #[serde(default)]
    pub confidential_instance_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountSettings {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheduling {
    #[serde(default)]
    pub on_host_maintenance: Option<String>,
    #[serde(default)]
    pub preemptible: Option<bool>,
    #[serde(default)]
    pub provisioning_model: Option<String>,
    #[serde(default)]
    pub node_affinities: Vec<serde_json::Value>,
}

impl InstanceTemplate {
    pub fn first_disk(&self) -> Option<&AttachedDisk> {
        self.properties.as_ref().and_then(|p| p.disks.first())
    }

    pub fn first_service_account(&self) -> Option<&ServiceAccountSettings> {
        self.properties.as_ref().and_then(|p| p.service_accounts.first())
    }
}

fn int64_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Num(i64),
        Str(String),
    }

    match Option::<Int64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Int64::Num(n)) => Ok(Some(n)),
        Some(Int64::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
