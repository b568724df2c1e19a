//! A module root whose case directories are all present, driven by the
//! driver crate's shell-script `terraform`.

#![allow(dead_code)]

#[path = "../../../tplcheck-driver/tests/common/mod.rs"]
mod fake_terraform;

use tplcheck_config::HarnessConfig;
use tplcheck_domain::CaseKind;

use fake_terraform::FakeTerraform;

pub struct FakeModule {
    tf: FakeTerraform,
}

impl FakeModule {
    /// A module root with every case directory present.
    pub fn new() -> Self {
        let tf = FakeTerraform::new("{}");
        for kind in CaseKind::ALL {
            std::fs::create_dir_all(tf.root.path().join(kind.default_dir())).unwrap();
        }
        Self { tf }
    }

    pub fn root(&self) -> &std::path::Path {
        self.tf.root.path()
    }

    /// Outputs the module reports for `kind` after apply.
    pub fn set_outputs(&self, kind: CaseKind) {
        let name = format!("test-vm-{}", kind.name_suffix());
        let doc = serde_json::json!({
            "name": { "sensitive": false, "type": "string", "value": name },
            "template_id": {
                "sensitive": false,
                "type": "string",
                "value": format!("projects/test-proj/global/instanceTemplates/{}", name),
            },
        });
        self.tf.set_outputs(&doc.to_string());
    }

    pub fn set_raw_outputs(&self, json: &str) {
        self.tf.set_outputs(json);
    }

    /// Harness config whose terraform is the fake and whose `fail` command
    /// (init, apply, output or destroy) exits 1.
    pub fn config(&self, fail: Option<&str>) -> HarnessConfig {
        let binary = self.tf.binary();
        let mut cfg = HarnessConfig::from_lookup(self.root(), |k| match k {
            "TPLCHECK_PROJECT" => Some("test-proj".into()),
            "TPLCHECK_REGION" => Some("us-central1".into()),
            "TPLCHECK_TOOL" => Some(binary.clone()),
            "TPLCHECK_KMS_KEY" => {
                Some("projects/test-proj/locations/global/keyRings/ring/cryptoKeys/key".into())
            }
            _ => None,
        })
        .unwrap();
        cfg.env.extend(self.tf.env(fail));
        cfg
    }

    pub fn calls(&self) -> Vec<String> {
        self.tf.calls()
    }

    pub fn count(&self, command: &str) -> usize {
        self.tf.count(command)
    }
}
