//! Result reporting: one human-readable line per outcome, prefixed with the
//! short label of the command, and the exit code that goes with it.

use std::fmt;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    BuildFrontend,
    DeployFrontend,
    TriggerJenkins,
}

impl Script {
    pub fn label(&self) -> &'static str {
        match self {
            Script::BuildFrontend => "Build frontend",
            Script::DeployFrontend => "Deploy frontend",
            Script::TriggerJenkins => "Trigger Jenkins job",
        }
    }

    pub fn log(&self, message: impl fmt::Display) {
        tracing::info!(script = self.label(), "{}: {}", self.label(), message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(script = self.label(), "{}: {}", self.label(), message);
    }

    /// Log a fatal condition and return the failure carrying its exit code.
    pub fn fail(&self, code: i32, message: impl Into<String>) -> Failure {
        let failure = Failure {
            script: *self,
            code,
            message: message.into(),
        };
        tracing::error!(script = self.label(), code, "{failure}");
        failure
    }
}

/// A fatal outcome that has already been logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub script: Script,
    pub code: i32,
    pub message: String,
}

impl Failure {
    /// Process exit status; codes outside `1..=255` become 1.
    pub fn exit_status(&self) -> u8 {
        match u8::try_from(self.code) {
            Ok(0) | Err(_) => 1,
            Ok(code) => code,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.script.label(), self.message)
    }
}

impl std::error::Error for Failure {}
