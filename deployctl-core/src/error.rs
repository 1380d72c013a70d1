//! Error types for deployctl-core.
//!
//! Every variant carries the value that caused it, so the CLI can print a
//! single line naming what went wrong.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of the object-storage mirror command.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {}", display_code(.code))]
    NonZeroExit { command: String, code: Option<i32> },
}

/// Failure talking to the Cloudflare API.
#[derive(Error, Debug)]
pub enum CdnError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloudflare API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed Cloudflare response: {0}")]
    Malformed(String),
}

/// Failure talking to the Jenkins remote API.
#[derive(Error, Debug)]
pub enum JenkinsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jenkins returned HTTP {status} for {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    #[error("malformed Jenkins response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("unrecognised Jenkins build result `{0}`")]
    UnknownResult(String),
}

/// Failure of the frontend publish pipeline.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("No S3 bucket name configured for {app}.")]
    NoBucketConfigured { app: String },

    #[error("Cloudflare credentials are required to purge the cache for hostname {host}.")]
    PurgeUnavailable { host: String },

    #[error("Could not sync app {app} with S3 bucket {bucket_uri}: {source}")]
    Sync {
        app: String,
        bucket_uri: String,
        #[source]
        source: SyncError,
    },

    #[error("No Cloudflare zone named {zone} found for hostname {host}.")]
    ZoneNotFound { zone: String, host: String },

    #[error("Failed to purge the Cloudflare cache for hostname {host}: {source}")]
    Purge {
        host: String,
        #[source]
        source: CdnError,
    },
}

/// Failure of the frontend build pipeline.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Could not launch `{step}` for app {app}: {source}")]
    Launch {
        step: String,
        app: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not run `{step}` for app {app} (exit status {}).", display_code(.code))]
    Step {
        step: String,
        app: String,
        code: Option<i32>,
    },

    #[error("Could not determine the commit of app {app}: {reason}")]
    Commit { app: String, reason: String },

    #[error("Could not write to version file {path} for app {app}: {source}")]
    VersionFile {
        app: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Exit code the process should end with for this failure.
    ///
    /// A failed npm step hands its own exit code through; everything else,
    /// including a child killed by a signal, maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Step {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}
