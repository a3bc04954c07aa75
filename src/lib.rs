//! Cached metadata resolution and download pipeline for a video platform.
//!
//! The crate is built around three pieces:
//!
//! - [`pipeline::MetadataResolver`], a TTL-cached front for a remote
//!   [`pipeline::MetadataClient`] implementation
//! - [`pipeline::select`], the policy picking which stream variant(s) of a
//!   video to transfer
//! - [`pipeline::Orchestrator`], which drives a [`pipeline::DownloadJob`]
//!   from URL to finished file, with cooperative cancellation and progress
//!   reporting

pub mod logging;
pub mod pipeline;

pub use pipeline::{
    DownloadJob, JobSettings, JobState, MetadataClient, MetadataResolver, Orchestrator,
    PipelineError, PipelineResult,
};
