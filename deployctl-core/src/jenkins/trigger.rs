//! The poll loop: Triggered → Polling → Resolved.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{BuildHandle, BuildState, BuildStatus, JobTrigger, QueueState};
use crate::contract::JenkinsApi;
use crate::error::JenkinsError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Wall-clock budget (measured from the trigger call) and the pause
/// between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// How a trigger-and-wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A terminal status was observed. `build` is `None` when the queue item
    /// was cancelled before a build started.
    Completed {
        build: Option<BuildHandle>,
        status: BuildStatus,
    },
    /// The budget ran out first. Not a build status: callers may treat it as
    /// inconclusive.
    TimedOut {
        elapsed: Duration,
        build: Option<BuildHandle>,
    },
}

impl TriggerOutcome {
    pub fn status(&self) -> Option<BuildStatus> {
        match self {
            TriggerOutcome::Completed { status, .. } => Some(*status),
            TriggerOutcome::TimedOut { .. } => None,
        }
    }

    /// A timeout never matches any expected status.
    pub fn matches(&self, expected: BuildStatus) -> bool {
        self.status() == Some(expected)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TriggerOutcome::TimedOut { .. })
    }
}

/// Trigger `trigger.job` and follow the build created by this call until it
/// reaches a terminal status or `policy.timeout` elapses.
///
/// Only the queue item returned by [`JenkinsApi::trigger`] and the build it
/// resolves to are polled; other builds of the same job are never looked at.
/// Every remote call is bounded by the same deadline as the sleeps, so a
/// Jenkins that stops answering still ends in [`TriggerOutcome::TimedOut`].
/// Transport and API failures end the wait with an error, without retry.
pub async fn trigger_and_wait<A>(
    api: &A,
    trigger: &JobTrigger,
    policy: PollPolicy,
) -> Result<TriggerOutcome, JenkinsError>
where
    A: JenkinsApi + ?Sized,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;

    let Some(queue_item) = before_deadline(deadline, api.trigger(trigger)).await? else {
        return Ok(timed_out(started, None));
    };
    info!(
        job = %trigger.job,
        queue_id = queue_item.id,
        "Build triggered; waiting for it to leave the queue"
    );

    let build = loop {
        let Some(state) = before_deadline(deadline, api.queue_state(&queue_item)).await? else {
            return Ok(timed_out(started, None));
        };
        match state {
            QueueState::Executable(build) => {
                info!(build = %build, url = %build.url, "Build started");
                break build;
            }
            QueueState::Cancelled => {
                warn!(
                    job = %trigger.job,
                    queue_id = queue_item.id,
                    "Queue item was cancelled before a build started"
                );
                return Ok(TriggerOutcome::Completed {
                    build: None,
                    status: BuildStatus::Aborted,
                });
            }
            QueueState::Waiting { why } => {
                debug!(
                    queue_id = queue_item.id,
                    why = why.as_deref().unwrap_or(""),
                    "Still queued"
                );
            }
        }
        if !wait_for_next_poll(deadline, policy.interval).await {
            return Ok(timed_out(started, None));
        }
    };

    loop {
        let Some(state) = before_deadline(deadline, api.build_state(&build)).await? else {
            return Ok(timed_out(started, Some(build)));
        };
        match state {
            BuildState::Finished(status) => {
                info!(
                    build = %build,
                    %status,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Build finished"
                );
                return Ok(TriggerOutcome::Completed {
                    build: Some(build),
                    status,
                });
            }
            BuildState::Running => debug!(build = %build, "Build still running"),
        }
        if !wait_for_next_poll(deadline, policy.interval).await {
            return Ok(timed_out(started, Some(build)));
        }
    }
}

/// Await a remote call, giving up at `deadline`. `Ok(None)` means the budget
/// ran out before Jenkins answered.
async fn before_deadline<T, F>(deadline: Instant, call: F) -> Result<Option<T>, JenkinsError>
where
    F: Future<Output = Result<T, JenkinsError>>,
{
    match tokio::time::timeout_at(deadline, call).await {
        Ok(answer) => answer.map(Some),
        Err(_) => {
            warn!("Jenkins did not answer before the deadline");
            Ok(None)
        }
    }
}

/// Sleep until the next poll, never past the deadline. Returns `false` once
/// the deadline has been reached and no further poll should happen.
async fn wait_for_next_poll(deadline: Instant, interval: Duration) -> bool {
    let now = Instant::now();
    if now >= deadline {
        return false;
    }
    tokio::time::sleep_until((now + interval).min(deadline)).await;
    true
}

fn timed_out(started: Instant, build: Option<BuildHandle>) -> TriggerOutcome {
    let elapsed = started.elapsed();
    warn!(
        elapsed_secs = elapsed.as_secs_f64(),
        build = ?build.as_ref().map(|b| b.number),
        "Timed out waiting for the build"
    );
    TriggerOutcome::TimedOut { elapsed, build }
}
