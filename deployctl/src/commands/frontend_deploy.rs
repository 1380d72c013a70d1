use deployctl_core::cdn::{CdnCredentials, CloudflareClient};
use deployctl_core::contract::{BucketSyncer, CachePurger};
use deployctl_core::publish::{publish, DeploymentRequest};
use deployctl_core::sync::AwsCliSyncer;

use crate::cli::FrontendDeployArgs;
use crate::load_config::load_env_config;
use crate::report::{Failure, Script};

const SCRIPT: Script = Script::DeployFrontend;

/// Validated flags: the request itself plus CDN credentials when a purge
/// was asked for.
#[derive(Debug)]
pub struct ValidatedDeploy {
    pub request: DeploymentRequest,
    pub credentials: Option<CdnCredentials>,
    pub cf_api_url: String,
}

pub fn validate(args: FrontendDeployArgs) -> Result<ValidatedDeploy, Failure> {
    let env_config_file = args
        .env_config_file
        .ok_or_else(|| SCRIPT.fail(1, "Environment config file was not specified."))?;
    let app_name = non_empty(args.app_name)
        .ok_or_else(|| SCRIPT.fail(1, "Frontend application name was not specified."))?;
    let app_dist = args
        .app_dist
        .ok_or_else(|| SCRIPT.fail(1, "Frontend application dist path was not specified."))?;

    let credentials = if args.purge_cache {
        match (non_empty(args.cf_api_email), non_empty(args.cf_api_key)) {
            (Some(email), Some(api_key)) => Some(CdnCredentials { email, api_key }),
            _ => {
                return Err(SCRIPT.fail(
                    1,
                    "Cloudflare credentials (CF_API_EMAIL and CF_API_KEY) \
                     are required to purge the cache.",
                ))
            }
        }
    } else {
        None
    };

    Ok(ValidatedDeploy {
        request: DeploymentRequest {
            env_config_file,
            app_name,
            app_dist,
            purge_cache: args.purge_cache,
        },
        credentials,
        cf_api_url: args.cf_api_url,
    })
}

pub async fn run(args: FrontendDeployArgs) -> Result<(), Failure> {
    let ValidatedDeploy {
        request,
        credentials,
        cf_api_url,
    } = validate(args)?;
    let purger =
        credentials.map(|credentials| CloudflareClient::with_base_url(credentials, cf_api_url));
    deploy(
        &request,
        &AwsCliSyncer::default(),
        purger.as_ref().map(|p| p as &dyn CachePurger),
    )
    .await
}

/// Load the config, mirror the dist directory, optionally purge, report.
pub async fn deploy<S>(
    request: &DeploymentRequest,
    syncer: &S,
    purger: Option<&dyn CachePurger>,
) -> Result<(), Failure>
where
    S: BucketSyncer + ?Sized,
{
    let config = load_env_config(&request.env_config_file)
        .map_err(|e| SCRIPT.fail(1, format!("{e:#}")))?;
    let plan = request.plan(&config).map_err(|e| SCRIPT.fail(1, e.to_string()))?;

    let report = publish(&plan, syncer, purger)
        .await
        .map_err(|e| SCRIPT.fail(1, e.to_string()))?;

    if report.purged_zone.is_some() {
        SCRIPT.log(format!(
            "Successfully purged Cloudflare cache for hostname {}.",
            report.bucket
        ));
    }
    SCRIPT.log(format!(
        "Frontend application {} successfully deployed to {}.",
        plan.app_name, report.bucket
    ));
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deployctl_core::contract::{MockBucketSyncer, MockCachePurger};
    use std::path::PathBuf;

    fn args() -> FrontendDeployArgs {
        FrontendDeployArgs {
            env_config_file: Some(PathBuf::from("stage.yml")),
            app_name: Some("frontend-app-account".into()),
            app_dist: Some(PathBuf::from("dist")),
            ..FrontendDeployArgs::default()
        }
    }

    #[test]
    fn flags_are_checked_in_order() {
        let err = validate(FrontendDeployArgs::default()).unwrap_err();
        assert_eq!(err.message, "Environment config file was not specified.");

        let err = validate(FrontendDeployArgs {
            app_name: None,
            ..args()
        })
        .unwrap_err();
        assert_eq!(err.message, "Frontend application name was not specified.");

        let err = validate(FrontendDeployArgs {
            app_dist: None,
            ..args()
        })
        .unwrap_err();
        assert_eq!(err.message, "Frontend application dist path was not specified.");
        assert_eq!(err.exit_status(), 1);
    }

    #[test]
    fn purge_needs_both_credentials() {
        let err = validate(FrontendDeployArgs {
            purge_cache: true,
            cf_api_email: Some("ops@example.com".into()),
            ..args()
        })
        .unwrap_err();
        assert!(err.message.contains("CF_API_KEY"));

        let ok = validate(FrontendDeployArgs {
            purge_cache: true,
            cf_api_email: Some("ops@example.com".into()),
            cf_api_key: Some("key".into()),
            ..args()
        })
        .unwrap();
        assert!(ok.request.purge_cache);
        assert_eq!(ok.credentials.unwrap().email, "ops@example.com");
    }

    #[test]
    fn no_purge_needs_no_credentials() {
        let ok = validate(args()).unwrap();
        assert!(ok.credentials.is_none());
    }

    #[tokio::test]
    async fn config_without_bucket_fails_before_sync() {
        let config = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(config.path(), "APP_CONFIG:\n  FOO: bar\n").unwrap();

        let mut syncer = MockBucketSyncer::new();
        syncer.expect_mirror().never();
        let mut purger = MockCachePurger::new();
        purger.expect_find_zone_id().never();

        let request = DeploymentRequest {
            env_config_file: config.path().to_path_buf(),
            app_name: "frontend-app-account".into(),
            app_dist: "dist".into(),
            purge_cache: false,
        };
        let err = deploy(&request, &syncer, Some(&purger as &dyn CachePurger))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Deploy frontend: No S3 bucket name configured for frontend-app-account."
        );
    }

    #[tokio::test]
    async fn unreadable_config_names_the_path() {
        let mut syncer = MockBucketSyncer::new();
        syncer.expect_mirror().never();

        let request = DeploymentRequest {
            env_config_file: "/nonexistent/deployctl/stage.yml".into(),
            app_name: "frontend-app-account".into(),
            app_dist: "dist".into(),
            purge_cache: false,
        };
        let err = deploy(&request, &syncer, None).await.unwrap_err();
        assert!(err.message.contains("Environment config file /nonexistent/deployctl/stage.yml"));
        assert!(err.message.contains("could not be opened"));
    }

    #[tokio::test]
    async fn missing_zone_fails_after_sync() {
        let config = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(config.path(), "S3_BUCKET_NAME: account.stage.example.com\n").unwrap();

        let mut syncer = MockBucketSyncer::new();
        syncer.expect_mirror().times(1).returning(|_, _| Ok(()));
        let mut purger = MockCachePurger::new();
        purger
            .expect_find_zone_id()
            .withf(|zone: &str| zone == "example.com")
            .times(1)
            .returning(|_| Ok(None));

        let request = DeploymentRequest {
            env_config_file: config.path().to_path_buf(),
            app_name: "frontend-app-account".into(),
            app_dist: "dist".into(),
            purge_cache: true,
        };
        let err = deploy(&request, &syncer, Some(&purger as &dyn CachePurger))
            .await
            .unwrap_err();
        assert_eq!(err.exit_status(), 1);
        assert!(err.message.contains("example.com"));
    }
}
