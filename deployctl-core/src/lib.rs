#![doc = "deployctl-core: core logic library for deployctl."]

//! This crate holds the data model, the seam traits and the orchestration
//! for the three deployment commands. The CLI crate only parses flags,
//! wires concrete clients and turns results into exit codes.
//!
//! # Modules
//! - [`publish`]: mirror a frontend dist directory to S3, optionally purging Cloudflare.
//! - [`build`]: run the npm build of a frontend app and stamp a version file.
//! - [`jenkins`]: trigger a Jenkins job and wait for the build it created.
//! - [`contract`]: traits every remote action goes through, mockable in tests.

pub mod build;
pub mod cdn;
pub mod command;
pub mod config;
pub mod contract;
pub mod error;
pub mod jenkins;
pub mod publish;
pub mod sync;
