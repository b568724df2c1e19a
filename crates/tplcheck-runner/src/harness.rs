use std::sync::Arc;

use chrono::Utc;
use tplcheck_config::HarnessConfig;
use tplcheck_domain::{CaseKind, InstanceTemplate, TemplateRef};
use tplcheck_driver::{
    with_provisioned, ComputeClient, DriverError, TemplateReader, TerraformOutputs,
    TerraformRunner, Workspace,
};
use tracing::{error, info, warn};

use crate::case::CaseSpec;
use crate::check::{check_template, Assertion, Expected};
use crate::error::RunError;
use crate::report::CaseReport;

/// Runs cases end to end: provision, read outputs, fetch the live template,
/// compare, destroy.
pub struct Harness {
    config: HarnessConfig,
    terraform: TerraformRunner,
    reader: Arc<dyn TemplateReader>,
}

/// What the checks produced while the template was alive.
struct Verified {
    template: String,
    assertions: Vec<Assertion>,
}

impl Harness {
    /// Build a harness that reads templates through Application Default Credentials.
    pub async fn from_config(config: HarnessConfig) -> Result<Self, RunError> {
        let reader = ComputeClient::from_adc(config.verify_timeout).await?;
        Ok(Self::with_reader(config, Arc::new(reader)))
    }

    pub fn with_reader(config: HarnessConfig, reader: Arc<dyn TemplateReader>) -> Self {
        let terraform = terraform_runner(&config);
        Self { config, terraform, reader }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Provision, verify and destroy `kind` with a fresh name prefix.
    pub async fn run_case(&self, kind: CaseKind) -> Result<CaseReport, RunError> {
        self.run_spec(CaseSpec::build(kind, &self.config)).await
    }

    /// Run an explicit case.
    ///
    /// Returns `Err` only when the case cannot start (invalid variables,
    /// missing configuration directory). Once provisioning has begun every
    /// outcome, including destroy failures, lands in the [`CaseReport`].
    pub async fn run_spec(&self, spec: CaseSpec) -> Result<CaseReport, RunError> {
        let started_at = Utc::now();
        let workspace = Workspace::prepare(&spec.dir, &spec.vars)?;
        let run_id = workspace.run_id;
        info!(case = %spec.kind, %run_id, dir = %spec.dir.display(), "starting case");

        let expected = Expected::from_vars(&spec.vars, spec.kind.name_suffix());
        let reader = Arc::clone(&self.reader);
        let project = self.config.project.clone();

        let result = with_provisioned(&self.terraform, workspace, move |outputs| async move {
            verify(reader.as_ref(), &project, &expected, &outputs).await
        })
        .await;

        let mut report = CaseReport {
            case: spec.kind,
            run_id,
            template: None,
            started_at,
            finished_at: Utc::now(),
            assertions: Vec::new(),
            error: None,
            teardown_error: None,
        };

        match result {
            Ok(provisioned) => {
                match provisioned.value {
                    Ok(verified) => {
                        report.template = Some(verified.template);
                        report.assertions = verified.assertions;
                    }
                    Err(e) => report.error = Some(e.to_string()),
                }
                report.teardown_error = provisioned.teardown.err().map(|e| e.to_string());
            }
            Err(e) => report.error = Some(e.to_string()),
        }

        let failed = report.failures().count();
        if report.passed() {
            info!(case = %spec.kind, %run_id, checks = report.assertions.len(), "case passed");
        } else if let Some(e) = &report.error {
            error!(case = %spec.kind, %run_id, error = %e, "case failed");
        } else {
            warn!(case = %spec.kind, %run_id, failed, "case failed");
        }
        Ok(report)
    }

    /// Fetch a live template by `template_id` output or bare name.
    pub async fn inspect(&self, template_id: &str) -> Result<InstanceTemplate, RunError> {
        let template = TemplateRef::parse(template_id, &self.config.project)?;
        Ok(self.reader.get_instance_template(&template).await?)
    }
}

/// Destroy whatever state a case directory holds. For cleaning up after an
/// interrupted run. Runs terraform only; no compute client is built.
pub async fn destroy_case(config: &HarnessConfig, kind: CaseKind) -> Result<(), RunError> {
    let spec = CaseSpec::build(kind, config);
    let workspace = Workspace::prepare(&spec.dir, &spec.vars)?;
    info!(case = %kind, dir = %spec.dir.display(), "destroying case");
    terraform_runner(config).destroy(&workspace).await?;
    Ok(())
}

fn terraform_runner(config: &HarnessConfig) -> TerraformRunner {
    TerraformRunner::new(
        config.tool.clone(),
        config.terraform_env(),
        config.command_timeout,
    )
}

async fn verify(
    reader: &dyn TemplateReader,
    project: &str,
    expected: &Expected,
    outputs: &TerraformOutputs,
) -> Result<Verified, DriverError> {
    let name = outputs.get("name")?;
    let template_id = outputs.get("template_id")?;
    let template = TemplateRef::parse(&template_id, project)?;
    if template.project != project {
        warn!(template = %template, project, "template lives outside the configured project");
    }

    let snapshot = reader.get_instance_template(&template).await?;
    Ok(Verified {
        template: template.to_string(),
        assertions: check_template(expected, &name, &snapshot),
    })
}
