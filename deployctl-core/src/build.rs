//! Frontend build pipeline: `npm install`, `npm run build` with the app's
//! config exported as environment variables, then a `version.json` naming
//! the commit that was built.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::command::{CommandOutput, CommandSpec};
use crate::contract::CommandRunner;
use crate::error::BuildError;

#[derive(Debug, Clone)]
pub struct FrontendBuildRequest {
    pub app_name: String,
    /// Checkout of the app; npm and git run here.
    pub app_dir: PathBuf,
    pub version_file: PathBuf,
    /// Exported to `npm run build`.
    pub app_env: BTreeMap<String, String>,
}

/// Contents of the version file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub repo: String,
    pub commit: String,
    pub created: String,
}

pub fn build_frontend<R>(
    runner: &R,
    request: &FrontendBuildRequest,
) -> Result<VersionInfo, BuildError>
where
    R: CommandRunner + ?Sized,
{
    run_step(
        runner,
        request,
        CommandSpec::new("npm").arg("install").current_dir(&request.app_dir),
    )?;

    run_step(
        runner,
        request,
        CommandSpec::new("npm")
            .arg("run")
            .arg("build")
            .current_dir(&request.app_dir)
            .envs(request.app_env.clone()),
    )?;

    let version = VersionInfo {
        repo: request.app_name.clone(),
        commit: head_commit(runner, request)?,
        created: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    write_version_file(request, &version)?;
    Ok(version)
}

fn run_step<R>(
    runner: &R,
    request: &FrontendBuildRequest,
    spec: CommandSpec,
) -> Result<CommandOutput, BuildError>
where
    R: CommandRunner + ?Sized,
{
    let step = spec.display();
    info!(app = %request.app_name, step = %step, "[BUILD] Running step");
    let output = runner.run(&spec).map_err(|e| {
        error!(error = ?e, step = %step, "[BUILD][ERROR] Could not launch step");
        BuildError::Launch {
            step: step.clone(),
            app: request.app_name.clone(),
            source: e,
        }
    })?;
    if !output.success() {
        error!(code = ?output.code, step = %step, "[BUILD][ERROR] Step failed");
        return Err(BuildError::Step {
            step,
            app: request.app_name.clone(),
            code: output.code,
        });
    }
    Ok(output)
}

fn head_commit<R>(runner: &R, request: &FrontendBuildRequest) -> Result<String, BuildError>
where
    R: CommandRunner + ?Sized,
{
    let commit_error = |reason: String| BuildError::Commit {
        app: request.app_name.clone(),
        reason,
    };
    let spec = CommandSpec::new("git")
        .arg("rev-parse")
        .arg("HEAD")
        .current_dir(&request.app_dir)
        .capture_stdout();
    let output = runner.run(&spec).map_err(|e| commit_error(e.to_string()))?;
    if !output.success() {
        return Err(commit_error(format!("`{}` exited with {:?}", spec.display(), output.code)));
    }
    let sha = output.stdout.trim();
    if sha.is_empty() {
        return Err(commit_error("`git rev-parse HEAD` printed nothing".to_string()));
    }
    Ok(sha.to_string())
}

fn write_version_file(
    request: &FrontendBuildRequest,
    version: &VersionInfo,
) -> Result<(), BuildError> {
    let io_error = |source: std::io::Error| BuildError::VersionFile {
        app: request.app_name.clone(),
        path: request.version_file.clone(),
        source,
    };
    let json = serde_json::to_string(version).map_err(|e| io_error(e.into()))?;
    std::fs::write(&request.version_file, json).map_err(io_error)?;
    info!(
        path = %request.version_file.display(),
        commit = %version.commit,
        "[BUILD] Wrote version file"
    );
    Ok(())
}
