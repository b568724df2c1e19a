use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "tplcheck",
    about = "Provision GCP instance templates with Terraform and verify them against the Compute API",
    version
)]
pub struct Cli {
    /// Harness config file (tplcheck.yml).
    #[arg(long, env = "TPLCHECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// GCP project; overrides the config file.
    #[arg(long, env = "TPLCHECK_PROJECT", global = true)]
    pub project: Option<String>,

    /// GCP region; overrides the config file.
    #[arg(long, env = "TPLCHECK_REGION", global = true)]
    pub region: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision, verify and destroy one or more cases.
    Run {
        /// Cases to run (simple, confidential, shielded, sole-tenancy, advanced).
        cases: Vec<String>,

        /// Run every case.
        #[arg(long, conflicts_with = "cases")]
        all: bool,

        /// Report format.
        #[arg(long, default_value = "text")]
        output: ReportOutput,
    },

    /// Print the variable file a case would be applied with.
    Vars {
        case: String,
    },

    /// Fetch a live instance template and print it as JSON.
    Inspect {
        /// `template_id` output, self link, or bare template name.
        template: String,
    },

    /// Run `terraform destroy` for a case directory.
    Destroy {
        case: String,

        /// Skip the confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ReportOutput {
    Text,
    Json,
}
