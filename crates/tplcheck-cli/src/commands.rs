use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tplcheck_config::{load_config_with, HarnessConfig};
use tplcheck_domain::CaseKind;
use tplcheck_runner::{destroy_case, CaseReport, CaseSpec, Harness};

use crate::cli::ReportOutput;
use crate::output;

// ── Config ────────────────────────────────────────────────────────────────────

/// Resolve the harness config. Flags win over `TPLCHECK_*` variables, which
/// win over the file.
pub fn load(
    config: Option<PathBuf>,
    project: Option<String>,
    region: Option<String>,
) -> Result<HarnessConfig> {
    let lookup = |key: &str| match key {
        "TPLCHECK_PROJECT" if project.is_some() => project.clone(),
        "TPLCHECK_REGION" if region.is_some() => region.clone(),
        other => std::env::var(other).ok().filter(|v| !v.is_empty()),
    };

    match config {
        Some(path) => load_config_with(&path, lookup)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            HarnessConfig::from_lookup(&cwd, lookup)
                .context("No config file given (--config or TPLCHECK_CONFIG) and environment is incomplete")
        }
    }
}

fn parse_case(case: &str) -> Result<CaseKind> {
    case.parse::<CaseKind>().map_err(anyhow::Error::from)
}

fn parse_cases(cases: &[String], all: bool) -> Result<Vec<CaseKind>> {
    if all {
        return Ok(CaseKind::ALL.to_vec());
    }
    if cases.is_empty() {
        anyhow::bail!("name at least one case or pass --all");
    }
    cases.iter().map(|c| parse_case(c)).collect()
}

// ── Run ───────────────────────────────────────────────────────────────────────

pub async fn run(
    config: HarnessConfig,
    cases: Vec<String>,
    all: bool,
    format: ReportOutput,
) -> Result<()> {
    let kinds = parse_cases(&cases, all)?;
    let harness = Harness::from_config(config)
        .await
        .context("Failed to create compute client")?;

    let mut reports: Vec<CaseReport> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let report = harness
            .run_case(kind)
            .await
            .with_context(|| format!("case {} could not start", kind))?;
        if let ReportOutput::Text = format {
            print!("{}", output::render_report(&report));
        }
        reports.push(report);
    }

    match format {
        ReportOutput::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        ReportOutput::Text => println!("{}", output::render_summary(&reports)),
    }

    let failed = reports.iter().filter(|r| !r.passed()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} case(s) failed", failed, reports.len());
    }
    Ok(())
}

// ── Vars ──────────────────────────────────────────────────────────────────────

pub fn vars(config: HarnessConfig, case: String) -> Result<()> {
    let kind = parse_case(&case)?;
    let spec = CaseSpec::with_prefix(kind, &config, &config.name_prefix);
    eprintln!("# {} -> {}", kind, spec.dir.display());
    println!("{}", spec.vars.to_tfvars_json()?);
    Ok(())
}

// ── Inspect ───────────────────────────────────────────────────────────────────

pub async fn inspect(config: HarnessConfig, template: String) -> Result<()> {
    let harness = Harness::from_config(config)
        .await
        .context("Failed to create compute client")?;
    let snapshot = harness
        .inspect(&template)
        .await
        .with_context(|| format!("Failed to fetch instance template {}", template))?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

// ── Destroy ───────────────────────────────────────────────────────────────────

pub async fn destroy(config: HarnessConfig, case: String, yes: bool) -> Result<()> {
    let kind = parse_case(&case)?;
    let dir = config.case_dir(kind);

    if !yes {
        eprint!("Destroy all resources in {}? [y/N] ", dir.display());
        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("Failed to read confirmation")?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    destroy_case(&config, kind)
        .await
        .with_context(|| format!("terraform destroy failed for {}", dir.display()))?;
    println!("Destroyed {}.", kind);
    Ok(())
}
