//! PixelScan Scanner - per-domain scan pipeline and batch orchestration.
//!
//! A [`ScanPipeline`] takes one normalized domain through health check,
//! address resolution, navigation in an isolated browser session, evidence
//! collection and tracker detection, yielding a [`ScanResult`] whatever
//! happens. The [`BatchOrchestrator`] runs many pipelines under a
//! concurrency bound, streams every result to a JSONL file as it lands,
//! checkpoints progress atomically and resumes interrupted batches.
//!
//! # Example
//!
//! ```rust,ignore
//! use pixelscan_scanner::{read_targets, BatchOrchestrator, ScanPipeline};
//! use std::sync::Arc;
//!
//! let pipeline = ScanPipeline::from_config(&config, prober, launcher, registry);
//! let orchestrator = BatchOrchestrator::from_config(Arc::new(pipeline), &config)?;
//!
//! let targets = read_targets(Path::new("clinics.csv"))?;
//! let summary = orchestrator.run(&batch_id, targets).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod checkpoint;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod input;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod output;
#[allow(missing_docs)]
pub mod pipeline;
#[allow(missing_docs)]
pub mod plan;
#[allow(missing_docs)]
pub mod result;
#[allow(missing_docs)]
pub mod retry;
#[allow(missing_docs)]
pub mod summary;

// Re-export commonly used types
pub use checkpoint::{Checkpoint, FailedDomain, CHECKPOINT_VERSION};
pub use error::{BatchError, CheckpointError, Result};
pub use input::{parse_targets, read_targets, RawTarget};
pub use orchestrator::BatchOrchestrator;
pub use output::ResultSink;
pub use pipeline::{PipelineSettings, ScanPipeline, ScanState};
pub use plan::{BatchPlan, RejectedTarget, ScanTarget};
pub use result::{ScanMetadata, ScanResult};
pub use retry::{sleep_or_cancel, RetryPolicy};
pub use summary::{BatchSummary, DomainStatus, SummaryBuilder};
