use std::path::PathBuf;

use deployctl_core::build::{build_frontend, FrontendBuildRequest};
use deployctl_core::command::SystemCommandRunner;
use deployctl_core::contract::CommandRunner;

use crate::cli::FrontendBuildArgs;
use crate::load_config::load_env_config;
use crate::report::{Failure, Script};

const SCRIPT: Script = Script::BuildFrontend;

pub fn run(args: FrontendBuildArgs) -> Result<(), Failure> {
    build(args, &SystemCommandRunner)
}

pub fn build<R>(args: FrontendBuildArgs, runner: &R) -> Result<(), Failure>
where
    R: CommandRunner + ?Sized,
{
    let env_config_file = args
        .env_config_file
        .ok_or_else(|| SCRIPT.fail(1, "Environment config file was not specified."))?;
    let app_name = args
        .app_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| SCRIPT.fail(1, "App name was not specified."))?;
    let version_file = args
        .version_file
        .ok_or_else(|| SCRIPT.fail(1, "Version file was not specified."))?;

    let config = load_env_config(&env_config_file).map_err(|e| SCRIPT.fail(1, format!("{e:#}")))?;
    let app_env = config.app_env();
    if app_env.is_empty() {
        SCRIPT.warn(format!("Config variables do not exist for app {app_name}."));
    }

    let request = FrontendBuildRequest {
        app_dir: PathBuf::from(&app_name),
        app_name,
        version_file,
        app_env,
    };
    build_frontend(runner, &request).map_err(|e| SCRIPT.fail(e.exit_code(), e.to_string()))?;

    SCRIPT.log(format!(
        "Frontend app {} built successfully with config file {}.",
        request.app_name,
        env_config_file.display()
    ));
    Ok(())
}
