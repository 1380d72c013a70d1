//! HTTP client for the Jenkins remote access API.
//!
//! - Job definition: `GET {base}/job/{job}/api/json`, asking only for the
//!   parameter definitions.
//! - Trigger: `POST {base}/job/{job}/buildWithParameters` when the job defines
//!   parameters or some were passed (Jenkins fills in the defaults of the
//!   rest), `/build` otherwise. The job token, cause and parameters go in the
//!   query string. The `Location` header of the reply names the queue item.
//! - Queue item: `GET {queue item}/api/json`; `executable` appears once the
//!   build has started.
//! - Build: `GET {build}/api/json`; `building` and `result`.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;

use super::{
    BuildHandle, BuildState, BuildStatus, JenkinsCredentials, JobTrigger, QueueItem, QueueState,
};
use crate::contract::JenkinsApi;
use crate::error::JenkinsError;

pub struct JenkinsClient {
    http: reqwest::Client,
    base_url: String,
    credentials: JenkinsCredentials,
}

impl JenkinsClient {
    pub fn new(base_url: impl Into<String>, credentials: JenkinsCredentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::info!(
            base_url = %base_url,
            user = %credentials.user_name,
            "Initialized Jenkins client"
        );
        Self {
            http: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, JenkinsError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.credentials.user_name, Some(&self.credentials.user_token))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(JenkinsError::Api {
                status: status.as_u16(),
                url: url.to_string(),
                body: truncate(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| JenkinsError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// `folder/sub/job` → `job/folder/job/sub/job/job`.
pub fn job_path(job: &str) -> String {
    job.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("job/{segment}"))
        .collect::<Vec<_>>()
        .join("/")
}

/// Extract the queue item handle from a trigger reply's `Location` header.
pub fn queue_item_from_location(job: &str, location: &str) -> Option<QueueItem> {
    static QUEUE_ITEM: OnceLock<Option<Regex>> = OnceLock::new();
    let re = QUEUE_ITEM
        .get_or_init(|| Regex::new(r"^(?P<url>.*/queue/item/(?P<id>\d+))/?$").ok())
        .as_ref()?;
    let caps = re.captures(location.trim())?;
    let id = caps.name("id")?.as_str().parse().ok()?;
    Some(QueueItem {
        job: job.to_string(),
        id,
        url: format!("{}/", &caps["url"]),
    })
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}

const PARAMETER_DEFINITIONS_TREE: &str = "property[parameterDefinitions[name]]";

#[derive(Debug, Deserialize)]
struct JobJson {
    #[serde(default)]
    property: Vec<JobPropertyJson>,
}

#[derive(Debug, Deserialize)]
struct JobPropertyJson {
    #[serde(default, rename = "parameterDefinitions")]
    parameter_definitions: Option<Vec<ParameterDefinitionJson>>,
}

#[derive(Debug, Deserialize)]
struct ParameterDefinitionJson {
    name: String,
}

impl JobJson {
    fn parameter_names(&self) -> Vec<&str> {
        self.property
            .iter()
            .flat_map(|p| p.parameter_definitions.iter().flatten())
            .map(|definition| definition.name.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct QueueItemJson {
    #[serde(default)]
    cancelled: bool,
    #[serde(default)]
    why: Option<String>,
    #[serde(default)]
    executable: Option<ExecutableJson>,
}

#[derive(Debug, Deserialize)]
struct ExecutableJson {
    number: u64,
    url: String,
}

#[derive(Debug, Deserialize)]
struct BuildJson {
    #[serde(default)]
    building: bool,
    #[serde(default)]
    result: Option<String>,
}

fn queue_state_from_json(job: &str, item: QueueItemJson) -> QueueState {
    if let Some(executable) = item.executable {
        return QueueState::Executable(BuildHandle {
            job: job.to_string(),
            number: executable.number,
            url: with_trailing_slash(&executable.url),
        });
    }
    if item.cancelled {
        return QueueState::Cancelled;
    }
    QueueState::Waiting { why: item.why }
}

fn build_state_from_json(build: BuildJson) -> Result<BuildState, JenkinsError> {
    match build.result {
        Some(result) if !build.building => {
            Ok(BuildState::Finished(BuildStatus::from_jenkins_result(&result)?))
        }
        _ => Ok(BuildState::Running),
    }
}

#[async_trait]
impl JenkinsApi for JenkinsClient {
    async fn trigger(&self, trigger: &JobTrigger) -> Result<QueueItem, JenkinsError> {
        let job_url = format!("{}/{}", self.base_url, job_path(&trigger.job));
        let definition: JobJson = self
            .get_json(&format!("{job_url}/api/json?tree={PARAMETER_DEFINITIONS_TREE}"))
            .await?;
        let defined = definition.parameter_names();
        tracing::debug!(job = %trigger.job, parameters = ?defined, "Fetched job definition");
        if defined.is_empty() && !trigger.params.is_empty() {
            tracing::warn!(
                job = %trigger.job,
                "Job defines no parameters; passing the given ones anyway"
            );
        }

        let endpoint = if defined.is_empty() && trigger.params.is_empty() {
            "build"
        } else {
            "buildWithParameters"
        };
        let url = format!("{job_url}/{endpoint}");

        let mut query: Vec<(&str, &str)> = vec![("token", trigger.job_token.as_str())];
        if let Some(cause) = &trigger.cause {
            query.push(("cause", cause.as_str()));
        }
        query.extend(trigger.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        tracing::info!(
            job = %trigger.job,
            url = %url,
            params = trigger.params.len(),
            "Submitting Jenkins build request"
        );
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.credentials.user_name, Some(&self.credentials.user_token))
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                job = %trigger.job,
                "Jenkins rejected the build request"
            );
            return Err(JenkinsError::Api {
                status: status.as_u16(),
                url,
                body: truncate(&body),
            });
        }

        let location = location.ok_or_else(|| JenkinsError::Malformed {
            url: url.clone(),
            reason: "reply has no Location header".to_string(),
        })?;
        let item = queue_item_from_location(&trigger.job, &location).ok_or_else(|| {
            JenkinsError::Malformed {
                url,
                reason: format!("Location `{location}` is not a queue item"),
            }
        })?;
        tracing::info!(queue_id = item.id, queue_url = %item.url, "Build request queued");
        Ok(item)
    }

    async fn queue_state(&self, item: &QueueItem) -> Result<QueueState, JenkinsError> {
        let url = format!("{}api/json", item.url);
        let json: QueueItemJson = self.get_json(&url).await?;
        Ok(queue_state_from_json(&item.job, json))
    }

    async fn build_state(&self, build: &BuildHandle) -> Result<BuildState, JenkinsError> {
        let url = format!("{}api/json", build.url);
        let json: BuildJson = self.get_json(&url).await?;
        build_state_from_json(json)
    }
}
