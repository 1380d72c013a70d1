///
/// This module implements the CLI interface for deployctl: flag parsing and
/// dispatch to the per-command modules in [`crate::commands`].
///
/// Required flags are declared as `Option`s and checked by the commands
/// themselves, so a missing flag is reported like every other fatal
/// condition (one line naming the command, exit code 1) and is detected
/// before any remote call.
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use deployctl_core::cdn::DEFAULT_API_URL;
use deployctl_core::jenkins::BuildStatus;

use crate::commands;
use crate::report::Failure;

pub const DEFAULT_JENKINS_URL: &str = "https://test-jenkins.testeng.edx.org";

/// CLI for deployctl: frontend builds, S3 publishing and Jenkins triggers.
#[derive(Parser, Debug)]
#[clap(
    name = "deployctl",
    version,
    about = "Build and publish frontend apps, purge Cloudflare caches and trigger Jenkins jobs"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a frontend app with environment-specific configuration
    FrontendBuild(FrontendBuildArgs),
    /// Mirror a frontend app's dist directory to its S3 bucket
    FrontendDeploy(FrontendDeployArgs),
    /// Trigger a Jenkins job and wait for the build to finish
    JenkinsTrigger(JenkinsTriggerArgs),
}

#[derive(Args, Debug, Default)]
pub struct FrontendBuildArgs {
    /// File from which to read the environment configuration variables
    #[arg(long)]
    pub env_config_file: Option<PathBuf>,
    /// Name of the frontend app (also its checkout directory)
    #[arg(long)]
    pub app_name: Option<String>,
    /// File to which to write app version info
    #[arg(long)]
    pub version_file: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct FrontendDeployArgs {
    /// File from which to read environment configuration variables
    #[arg(long)]
    pub env_config_file: Option<PathBuf>,
    /// Name of the frontend app
    #[arg(long)]
    pub app_name: Option<String>,
    /// Path to the frontend app dist directory
    #[arg(long)]
    pub app_dist: Option<PathBuf>,
    /// Purge the Cloudflare cache for the bucket's hostname after syncing
    #[arg(long)]
    pub purge_cache: bool,
    /// Cloudflare account email
    #[arg(long, env = "CF_API_EMAIL", hide_env_values = true)]
    pub cf_api_email: Option<String>,
    /// Cloudflare global API key
    #[arg(long, env = "CF_API_KEY", hide_env_values = true)]
    pub cf_api_key: Option<String>,
    #[arg(long, env = "CLOUDFLARE_API_URL", default_value = DEFAULT_API_URL, hide = true)]
    pub cf_api_url: String,
}

#[derive(Args, Debug)]
pub struct JenkinsTriggerArgs {
    /// The base Jenkins URL
    #[arg(long, default_value = DEFAULT_JENKINS_URL)]
    pub url: String,
    /// The Jenkins user name for triggering the job
    #[arg(long, alias = "user_name")]
    pub user_name: Option<String>,
    /// API token for the user, available at {url}/user/{user_name}/configure
    #[arg(long, alias = "user_token", env = "JENKINS_USER_TOKEN", hide_env_values = true)]
    pub user_token: Option<String>,
    /// The name of the Jenkins job, e.g. test-project
    #[arg(long)]
    pub job: Option<String>,
    /// The authorization token for the job; must match the job definition
    #[arg(long, env = "JENKINS_JOB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Text included in the recorded build cause
    #[arg(long)]
    pub cause: Option<String>,
    /// Key/value pair passed to the job as a parameter; repeatable
    #[arg(long = "param", num_args = 2, value_names = ["KEY", "VALUE"], action = ArgAction::Append)]
    pub param: Vec<String>,
    /// Maximum seconds to wait for the job to complete, measured from the trigger
    #[arg(long, default_value = "1800", value_parser = parse_seconds)]
    pub timeout: Duration,
    /// Seconds between status polls
    #[arg(long, default_value = "10", value_parser = parse_seconds)]
    pub poll_interval: Duration,
    /// The expected job status once the job completes
    #[arg(long, value_enum, ignore_case = true, default_value = "SUCCESS")]
    pub expected_status: ExpectedStatus,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedStatus {
    #[value(name = "SUCCESS")]
    Success,
    #[value(name = "FAILURE", alias = "FAIL")]
    Failure,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "ABORTED")]
    Aborted,
    #[value(name = "REGRESSION")]
    Regression,
}

impl From<ExpectedStatus> for BuildStatus {
    fn from(status: ExpectedStatus) -> Self {
        match status {
            ExpectedStatus::Success => BuildStatus::Success,
            ExpectedStatus::Failure => BuildStatus::Failure,
            ExpectedStatus::Error => BuildStatus::Error,
            ExpectedStatus::Aborted => BuildStatus::Aborted,
            ExpectedStatus::Regression => BuildStatus::Regression,
        }
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("`{raw}` is not a number of seconds: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("`{raw}` is not a valid duration: {e}"))
}

/// Entrypoint shared by `main()` and the integration tests.
pub async fn run(cli: Cli) -> Result<(), Failure> {
    match cli.command {
        Commands::FrontendBuild(args) => commands::frontend_build::run(args),
        Commands::FrontendDeploy(args) => commands::frontend_deploy::run(args).await,
        Commands::JenkinsTrigger(args) => commands::jenkins_trigger::run(args).await,
    }
}
