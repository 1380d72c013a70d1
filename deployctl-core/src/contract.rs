//! # contract: the seams every remote action goes through
//!
//! Each externally visible side effect (mirroring a directory into a bucket,
//! purging a CDN zone, talking to Jenkins, spawning a local tool) sits
//! behind one trait here. Production code uses the concrete clients in
//! [`crate::sync`], [`crate::cdn`], [`crate::jenkins::client`] and
//! [`crate::command`]; tests use the `mockall` mocks generated from these
//! traits.
//!
//! The mocks are exported under the `test-export-mocks` feature so the CLI
//! crate and integration tests can use them too.

use std::path::Path;

use async_trait::async_trait;

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

use crate::command::{CommandOutput, CommandSpec};
use crate::error::{CdnError, JenkinsError, SyncError};
use crate::jenkins::{BuildHandle, BuildState, JobTrigger, QueueItem, QueueState};

/// One-way mirror of a local directory into a remote bucket.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BucketSyncer: Send + Sync {
    /// Mirror `source` into `bucket`, deleting remote objects absent locally.
    async fn mirror(&self, source: &Path, bucket: &str) -> Result<(), SyncError>;
}

/// Administrative CDN operations needed to purge a hostname's cache.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CachePurger: Send + Sync {
    /// Look up a zone by its name. `Ok(None)` when no zone matches.
    async fn find_zone_id(&self, zone_name: &str) -> Result<Option<String>, CdnError>;

    /// Purge cached content for the given hostnames within a zone.
    async fn purge_hosts(&self, zone_id: &str, hosts: &[String]) -> Result<(), CdnError>;
}

/// The slice of the Jenkins remote API used to trigger a job and follow the
/// build it creates.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait JenkinsApi: Send + Sync {
    /// Submit a build request. The returned queue item identifies the build
    /// created by this call and nothing else.
    async fn trigger(&self, trigger: &JobTrigger) -> Result<QueueItem, JenkinsError>;

    /// Current state of a queue item.
    async fn queue_state(&self, item: &QueueItem) -> Result<QueueState, JenkinsError>;

    /// Current state of a specific build.
    async fn build_state(&self, build: &BuildHandle) -> Result<BuildState, JenkinsError>;
}

/// Runs a local program to completion. Blocking.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait CommandRunner: Send + Sync {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput>;
}
