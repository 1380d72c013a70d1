//! Bucket mirroring through the AWS CLI (`aws s3 sync --delete`).

use std::path::Path;

use async_trait::async_trait;
use tracing::{error, info};

use crate::command::{CommandSpec, SystemCommandRunner};
use crate::contract::{BucketSyncer, CommandRunner};
use crate::error::SyncError;

/// Mirrors directories into S3 by shelling out to `aws s3 sync`.
///
/// AWS credentials are whatever the `aws` CLI resolves on its own
/// (environment, profile, instance role).
pub struct AwsCliSyncer<R = SystemCommandRunner> {
    runner: R,
    program: String,
}

impl Default for AwsCliSyncer<SystemCommandRunner> {
    fn default() -> Self {
        Self::new(SystemCommandRunner)
    }
}

impl<R: CommandRunner> AwsCliSyncer<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: "aws".to_string(),
        }
    }

    pub fn command_for(&self, source: &Path, bucket: &str) -> CommandSpec {
        CommandSpec::new(&self.program)
            .arg("s3")
            .arg("sync")
            .arg(source.display().to_string())
            .arg(format!("s3://{bucket}"))
            .arg("--delete")
    }
}

#[async_trait]
impl<R: CommandRunner> BucketSyncer for AwsCliSyncer<R> {
    async fn mirror(&self, source: &Path, bucket: &str) -> Result<(), SyncError> {
        let spec = self.command_for(source, bucket);
        info!(command = %spec.display(), "Mirroring directory into bucket");

        let output = self.runner.run(&spec).map_err(|e| {
            error!(error = ?e, program = %spec.program, "Failed to launch sync command");
            SyncError::Launch {
                program: spec.program.clone(),
                source: e,
            }
        })?;

        if output.success() {
            info!(bucket, "Sync command completed");
            Ok(())
        } else {
            error!(
                code = ?output.code,
                command = %spec.display(),
                "Sync command exited with non-zero status"
            );
            Err(SyncError::NonZeroExit {
                command: spec.display(),
                code: output.code,
            })
        }
    }
}
