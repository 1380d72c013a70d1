//! Jenkins trigger-and-wait.
//!
//! A trigger call returns a [`QueueItem`]; the queue item resolves to exactly
//! one [`BuildHandle`]; the build eventually reaches a [`BuildStatus`]. The
//! handles are threaded through every poll, so concurrent builds of the same
//! job never get mixed up.

pub mod client;
pub mod trigger;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use client::JenkinsClient;
pub use trigger::{trigger_and_wait, PollPolicy, TriggerOutcome};

use crate::error::JenkinsError;

/// User name + per-user API token for HTTP basic auth.
#[derive(Clone)]
pub struct JenkinsCredentials {
    pub user_name: String,
    pub user_token: String,
}

impl fmt::Debug for JenkinsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JenkinsCredentials")
            .field("user_name", &self.user_name)
            .field("user_token", &"<redacted>")
            .finish()
    }
}

/// What to submit: the job, its remote-trigger token, the cause text and
/// the ordered build parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct JobTrigger {
    pub job: String,
    /// Must match the authentication token configured in the job definition.
    pub job_token: String,
    pub cause: Option<String>,
    pub params: Vec<(String, String)>,
}

impl fmt::Debug for JobTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobTrigger")
            .field("job", &self.job)
            .field("job_token", &"<redacted>")
            .field("cause", &self.cause)
            .field("params", &self.params)
            .finish()
    }
}

/// Everything `deployctl jenkins-trigger` needs, built once from the CLI.
#[derive(Debug, Clone)]
pub struct BuildTriggerRequest {
    pub base_url: String,
    pub credentials: JenkinsCredentials,
    pub trigger: JobTrigger,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub expected_status: BuildStatus,
}

impl BuildTriggerRequest {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            timeout: self.timeout,
            interval: self.poll_interval,
        }
    }
}

/// Handle of the queue entry created by a trigger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    /// Job the item was queued for.
    pub job: String,
    pub id: u64,
    /// Absolute URL, always ending in `/`.
    pub url: String,
}

/// A specific build of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildHandle {
    pub job: String,
    pub number: u64,
    /// Absolute URL, always ending in `/`.
    pub url: String,
}

impl fmt::Display for BuildHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.job, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueState {
    /// Still queued; `why` is Jenkins' own explanation when it gives one.
    Waiting { why: Option<String> },
    /// Removed from the queue without ever starting a build.
    Cancelled,
    /// Left the queue and became this build.
    Executable(BuildHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Running,
    Finished(BuildStatus),
}

/// Terminal status of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStatus {
    Success,
    Failure,
    Error,
    Aborted,
    Regression,
}

impl BuildStatus {
    pub const ALL: [BuildStatus; 5] = [
        BuildStatus::Success,
        BuildStatus::Failure,
        BuildStatus::Error,
        BuildStatus::Aborted,
        BuildStatus::Regression,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::Error => "ERROR",
            BuildStatus::Aborted => "ABORTED",
            BuildStatus::Regression => "REGRESSION",
        }
    }

    /// Map the `result` field of a finished Jenkins build.
    pub fn from_jenkins_result(result: &str) -> Result<Self, JenkinsError> {
        match result.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(BuildStatus::Success),
            "FAILURE" | "FAILED" | "FAIL" => Ok(BuildStatus::Failure),
            "ABORTED" => Ok(BuildStatus::Aborted),
            "UNSTABLE" | "REGRESSION" => Ok(BuildStatus::Regression),
            "NOT_BUILT" | "ERROR" => Ok(BuildStatus::Error),
            _ => Err(JenkinsError::UnknownResult(result.to_string())),
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildStatus {
    type Err = JenkinsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_jenkins_result(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jenkins_results_map_to_terminal_statuses() {
        let cases = [
            ("SUCCESS", BuildStatus::Success),
            ("FAILURE", BuildStatus::Failure),
            ("FAILED", BuildStatus::Failure),
            ("ABORTED", BuildStatus::Aborted),
            ("UNSTABLE", BuildStatus::Regression),
            ("NOT_BUILT", BuildStatus::Error),
            ("success", BuildStatus::Success),
        ];
        for (raw, expected) in cases {
            assert_eq!(BuildStatus::from_jenkins_result(raw).unwrap(), expected, "{raw}");
        }
    }

    #[test]
    fn unknown_result_is_rejected() {
        let err = BuildStatus::from_jenkins_result("EXPLODED").unwrap_err();
        assert!(matches!(err, JenkinsError::UnknownResult(ref r) if r == "EXPLODED"));
    }

    #[test]
    fn status_names_parse_back() {
        for status in BuildStatus::ALL {
            assert_eq!(status.as_str().parse::<BuildStatus>().unwrap(), status);
        }
    }

    #[test]
    fn tokens_are_not_printed() {
        let trigger = JobTrigger {
            job: "deploy-edxapp".into(),
            job_token: "job-secret".into(),
            cause: None,
            params: vec![],
        };
        let creds = JenkinsCredentials {
            user_name: "release-bot".into(),
            user_token: "user-secret".into(),
        };
        let printed = format!("{trigger:?} {creds:?}");
        assert!(!printed.contains("job-secret"));
        assert!(!printed.contains("user-secret"));
        assert!(printed.contains("release-bot"));
    }
}
