//! Frontend publish pipeline: mirror a dist directory into its S3 bucket,
//! then optionally purge the Cloudflare cache for the bucket's hostname.
//!
//! Buckets are named by hostname (`www.example.com`) and Cloudflare zones by
//! domain (`example.com`), so the zone is derived from the bucket name.
//!
//! Each step fails fast. A failed purge does not undo the sync that
//! preceded it.

use std::path::PathBuf;

use tracing::{error, info};

use crate::config::EnvConfig;
use crate::contract::{BucketSyncer, CachePurger};
use crate::error::{CdnError, PublishError};

/// What the user asked for on the command line.
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub env_config_file: PathBuf,
    pub app_name: String,
    pub app_dist: PathBuf,
    pub purge_cache: bool,
}

/// A request resolved against its environment config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    pub app_name: String,
    pub app_dist: PathBuf,
    pub bucket: String,
    pub purge_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub bucket: String,
    /// Zone whose cache was purged, when a purge was requested.
    pub purged_zone: Option<String>,
}

impl DeploymentRequest {
    pub fn plan(&self, config: &EnvConfig) -> Result<PublishPlan, PublishError> {
        let bucket = config
            .bucket_name()
            .ok_or_else(|| PublishError::NoBucketConfigured {
                app: self.app_name.clone(),
            })?;
        Ok(PublishPlan {
            app_name: self.app_name.clone(),
            app_dist: self.app_dist.clone(),
            bucket: bucket.to_string(),
            purge_cache: self.purge_cache,
        })
    }
}

impl PublishPlan {
    pub fn bucket_uri(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

/// The zone a hostname belongs to: its last two dot-separated labels.
pub fn zone_name_for_host(host: &str) -> String {
    let labels: Vec<&str> = host.trim_end_matches('.').split('.').collect();
    labels[labels.len().saturating_sub(2)..].join(".")
}

/// Run the publish pipeline.
///
/// `purger` is only consulted when the plan asks for a purge; a purge
/// request without one fails before anything is synced.
pub async fn publish<S>(
    plan: &PublishPlan,
    syncer: &S,
    purger: Option<&dyn CachePurger>,
) -> Result<PublishReport, PublishError>
where
    S: BucketSyncer + ?Sized,
{
    let purger = match (plan.purge_cache, purger) {
        (true, None) => {
            return Err(PublishError::PurgeUnavailable {
                host: plan.bucket.clone(),
            })
        }
        (true, Some(purger)) => Some(purger),
        (false, _) => None,
    };

    info!(
        app = %plan.app_name,
        dist = %plan.app_dist.display(),
        bucket = %plan.bucket,
        "[PUBLISH] Syncing app to bucket"
    );
    syncer
        .mirror(&plan.app_dist, &plan.bucket)
        .await
        .map_err(|e| {
            error!(error = %e, app = %plan.app_name, "[PUBLISH][ERROR] Sync failed");
            PublishError::Sync {
                app: plan.app_name.clone(),
                bucket_uri: plan.bucket_uri(),
                source: e,
            }
        })?;
    info!(bucket = %plan.bucket, "[PUBLISH] Sync complete");

    let purged_zone = match purger {
        Some(purger) => Some(purge_host_cache(purger, &plan.bucket).await?),
        None => None,
    };

    Ok(PublishReport {
        bucket: plan.bucket.clone(),
        purged_zone,
    })
}

/// Purge the CDN cache for one hostname. Returns the zone it belonged to.
pub async fn purge_host_cache<P>(purger: &P, host: &str) -> Result<String, PublishError>
where
    P: CachePurger + ?Sized,
{
    let zone = zone_name_for_host(host);
    info!(host, zone = %zone, "[PUBLISH] Purging CDN cache");

    let purge_error = |source: CdnError| PublishError::Purge {
        host: host.to_string(),
        source,
    };

    let zone_id = purger
        .find_zone_id(&zone)
        .await
        .map_err(purge_error)?
        .ok_or_else(|| {
            error!(host, zone = %zone, "[PUBLISH][ERROR] Zone not found");
            PublishError::ZoneNotFound {
                zone: zone.clone(),
                host: host.to_string(),
            }
        })?;

    purger
        .purge_hosts(&zone_id, &[host.to_string()])
        .await
        .map_err(purge_error)?;
    info!(host, zone_id = %zone_id, "[PUBLISH] Purged CDN cache");
    Ok(zone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_is_last_two_labels() {
        assert_eq!(zone_name_for_host("www.example.com"), "example.com");
        assert_eq!(zone_name_for_host("a.b.stage.example.org"), "example.org");
        assert_eq!(zone_name_for_host("example.com"), "example.com");
        assert_eq!(zone_name_for_host("localhost"), "localhost");
        assert_eq!(zone_name_for_host("www.example.com."), "example.com");
    }

    #[test]
    fn plan_requires_a_bucket() {
        let request = DeploymentRequest {
            env_config_file: "env.yml".into(),
            app_name: "learner-portal".into(),
            app_dist: "dist".into(),
            purge_cache: false,
        };
        let err = request.plan(&EnvConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "No S3 bucket name configured for learner-portal.");

        let config = EnvConfig::from_yaml_str("S3_BUCKET_NAME: learner.example.com").unwrap();
        let plan = request.plan(&config).unwrap();
        assert_eq!(plan.bucket, "learner.example.com");
        assert_eq!(plan.bucket_uri(), "s3://learner.example.com");
    }
}
