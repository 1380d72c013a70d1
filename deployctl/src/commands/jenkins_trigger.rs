use deployctl_core::contract::JenkinsApi;
use deployctl_core::jenkins::{
    trigger_and_wait, BuildStatus, BuildTriggerRequest, JenkinsClient, JenkinsCredentials,
    JobTrigger, TriggerOutcome,
};

use crate::cli::JenkinsTriggerArgs;
use crate::report::{Failure, Script};

const SCRIPT: Script = Script::TriggerJenkins;

pub fn validate(args: JenkinsTriggerArgs) -> Result<BuildTriggerRequest, Failure> {
    let user_name = required(args.user_name, "Jenkins user name (--user-name) was not specified.")?;
    let user_token = required(
        args.user_token,
        "Jenkins user token (--user-token or JENKINS_USER_TOKEN) was not specified.",
    )?;
    let job = required(args.job, "Jenkins job name (--job) was not specified.")?;
    let job_token = required(
        args.token,
        "Jenkins job token (--token or JENKINS_JOB_TOKEN) was not specified.",
    )?;
    if args.poll_interval.is_zero() {
        return Err(SCRIPT.fail(1, "Poll interval must be greater than zero."));
    }

    let params = args
        .param
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();

    Ok(BuildTriggerRequest {
        base_url: args.url,
        credentials: JenkinsCredentials {
            user_name,
            user_token,
        },
        trigger: JobTrigger {
            job,
            job_token,
            cause: args.cause,
            params,
        },
        timeout: args.timeout,
        poll_interval: args.poll_interval,
        expected_status: args.expected_status.into(),
    })
}

pub async fn run(args: JenkinsTriggerArgs) -> Result<(), Failure> {
    let request = validate(args)?;
    let client = JenkinsClient::new(&request.base_url, request.credentials.clone());
    trigger(&client, &request).await
}

/// Trigger, wait, and compare the outcome with the expected status.
pub async fn trigger<A>(api: &A, request: &BuildTriggerRequest) -> Result<(), Failure>
where
    A: JenkinsApi + ?Sized,
{
    let job = &request.trigger.job;
    SCRIPT.log(format!(
        "Triggering job {job} on {} with {} parameter(s); waiting up to {}s.",
        request.base_url,
        request.trigger.params.len(),
        request.timeout.as_secs_f64()
    ));

    let outcome = trigger_and_wait(api, &request.trigger, request.poll_policy())
        .await
        .map_err(|e| SCRIPT.fail(1, format!("Jenkins job {job} could not be run: {e}")))?;

    report_outcome(job, &outcome, request.expected_status)
}

/// Success only when the observed status equals the expected one. A timeout
/// is reported as inconclusive and never matches.
pub fn report_outcome(
    job: &str,
    outcome: &TriggerOutcome,
    expected: BuildStatus,
) -> Result<(), Failure> {
    match outcome {
        TriggerOutcome::Completed { build, status } if *status == expected => {
            let which = build.as_ref().map_or_else(|| job.to_string(), ToString::to_string);
            SCRIPT.log(format!("Job {which} finished with expected status {status}."));
            Ok(())
        }
        TriggerOutcome::Completed { build, status } => {
            let which = build.as_ref().map_or_else(|| job.to_string(), ToString::to_string);
            Err(SCRIPT.fail(
                1,
                format!("Job {which} finished with status {status}, expected {expected}."),
            ))
        }
        TriggerOutcome::TimedOut { elapsed, build } => {
            let which = build.as_ref().map_or_else(|| job.to_string(), ToString::to_string);
            Err(SCRIPT.fail(
                1,
                format!(
                    "Timed out after {:.0}s waiting for job {which}; \
                     result is inconclusive (expected {expected}).",
                    elapsed.as_secs_f64()
                ),
            ))
        }
    }
}

fn required(value: Option<String>, message: &str) -> Result<String, Failure> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SCRIPT.fail(1, message))
}
