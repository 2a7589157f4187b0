//! Batch orchestrator: runs many scans under a concurrency bound, streams
//! results, checkpoints progress and resumes interrupted batches.

use crate::checkpoint::Checkpoint;
use crate::error::Result;
use crate::input::RawTarget;
use crate::output::ResultSink;
use crate::pipeline::ScanPipeline;
use crate::plan::BatchPlan;
use crate::result::ScanResult;
use crate::summary::{BatchSummary, SummaryBuilder};
use futures::stream::{FuturesUnordered, StreamExt};
use pixelscan_core::{AppConfig, BatchId, Timestamp};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of terminal scans between checkpoints.
const DEFAULT_CHECKPOINT_EVERY: usize = 10;

/// Default maximum concurrent scans.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Mutable state of one run, owned by the orchestrator loop.
struct BatchRun {
    sink: ResultSink,
    checkpoint: Checkpoint,
    summary: SummaryBuilder,
    since_checkpoint: usize,
}

/// Runs batches of scans.
pub struct BatchOrchestrator {
    pipeline: Arc<ScanPipeline>,
    output_dir: PathBuf,
    max_concurrent_scans: usize,
    checkpoint_every: usize,
    deadline: Option<Duration>,
}

impl BatchOrchestrator {
    /// Orchestrator writing results, checkpoints and summaries to `output_dir`.
    #[must_use]
    pub fn new(pipeline: Arc<ScanPipeline>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            output_dir: output_dir.into(),
            max_concurrent_scans: DEFAULT_MAX_CONCURRENT,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            deadline: None,
        }
    }

    /// Orchestrator configured from the `scanning` and `batch` sections.
    pub fn from_config(pipeline: Arc<ScanPipeline>, config: &AppConfig) -> Result<Self> {
        Ok(Self::new(pipeline, config.output_dir()?)
            .with_max_concurrent_scans(config.scanning.max_concurrent)
            .with_checkpoint_every(config.batch.checkpoint_every)
            .with_deadline(config.batch.deadline_secs.map(Duration::from_secs)))
    }

    /// Set the maximum number of concurrent scans.
    #[must_use]
    pub fn with_max_concurrent_scans(mut self, max: usize) -> Self {
        self.max_concurrent_scans = max.max(1);
        self
    }

    /// Persist a checkpoint after every `every` terminal scans.
    #[must_use]
    pub fn with_checkpoint_every(mut self, every: usize) -> Self {
        self.checkpoint_every = every.max(1);
        self
    }

    /// Cancel outstanding work once `deadline` has elapsed.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Directory holding this orchestrator's batch files.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run (or resume) the batch `batch_id` over `targets`.
    ///
    /// Only output failures abort the run; per-domain failures end up in
    /// the results and the summary.
    pub async fn run(&self, batch_id: &BatchId, targets: Vec<RawTarget>) -> Result<BatchSummary> {
        self.run_with_token(batch_id, targets, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), additionally cancelled by `shutdown`.
    pub async fn run_with_token(
        &self,
        batch_id: &BatchId,
        targets: Vec<RawTarget>,
        shutdown: &CancellationToken,
    ) -> Result<BatchSummary> {
        let cancel = shutdown.child_token();
        let deadline = self.deadline.map(|after| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                warn!("Batch deadline of {:?} reached, cancelling outstanding scans", after);
                token.cancel();
            })
        });

        let outcome = self.execute(batch_id, targets, &cancel).await;

        if let Some(handle) = deadline {
            handle.abort();
        }
        outcome
    }

    async fn execute(
        &self,
        batch_id: &BatchId,
        targets: Vec<RawTarget>,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary> {
        let plan = BatchPlan::build(targets);
        info!(
            batch_id = %batch_id,
            targets = plan.len(),
            rejected = plan.rejected().len(),
            duplicates = plan.duplicates(),
            "batch planned"
        );

        let mut run = self.prepare(batch_id, &plan)?;

        let pending: Vec<_> = plan
            .targets()
            .iter()
            .filter(|t| !run.checkpoint.is_terminal(t.domain.as_str()))
            .collect();
        info!(
            batch_id = %batch_id,
            pending = pending.len(),
            done = run.summary.len(),
            "starting scans"
        );

        let mut futures = FuturesUnordered::new();
        for target in pending {
            if cancel.is_cancelled() {
                break;
            }

            futures.push(self.pipeline.scan(target, cancel));

            // Respect concurrency limit
            while futures.len() >= self.max_concurrent_scans {
                if let Some(result) = futures.next().await {
                    self.record(&mut run, result)?;
                }
            }
        }

        // Collect remaining results
        while let Some(result) = futures.next().await {
            self.record(&mut run, result)?;
        }

        if let Err(e) = run.checkpoint.save(&self.output_dir) {
            warn!(batch_id = %batch_id, error = %e, "final checkpoint save failed");
        }

        let summary = run.summary.finish(Timestamp::now());
        if run.checkpoint.remaining.is_empty() {
            let path = summary.write(&self.output_dir, batch_id)?;
            info!(
                batch_id = %batch_id,
                total = summary.total,
                succeeded = summary.succeeded,
                failed = summary.failed,
                rejected = summary.rejected,
                path = %path.display(),
                "batch complete"
            );
        } else {
            warn!(
                batch_id = %batch_id,
                remaining = run.checkpoint.remaining.len(),
                "batch interrupted; resume with the same batch id"
            );
        }

        Ok(summary)
    }

    /// Restore prior progress for this batch id and open the output stream.
    fn prepare(&self, batch_id: &BatchId, plan: &BatchPlan) -> Result<BatchRun> {
        let checkpoint = match Checkpoint::load(&self.output_dir, batch_id) {
            Ok(found) => found,
            Err(e) => {
                warn!(batch_id = %batch_id, error = %e, "ignoring unusable checkpoint");
                None
            }
        };
        let resumed = checkpoint.is_some();
        let mut checkpoint = checkpoint.unwrap_or_else(|| Checkpoint::new(batch_id, Vec::new()));

        // Records written after the last checkpoint are terminal too
        let mut summary = SummaryBuilder::new(batch_id, checkpoint.started_at);
        let mut rejected_written: HashMap<String, usize> = HashMap::new();
        let replayed = ResultSink::for_each_record(
            &ResultSink::path(&self.output_dir, batch_id),
            |result| {
                summary.record(&result);
                match &result.normalized_domain {
                    Some(domain) if result.is_success() => checkpoint.mark_completed(domain),
                    Some(domain) => checkpoint.mark_failed(domain, reason(&result)),
                    None => *rejected_written.entry(result.input_url).or_default() += 1,
                }
            },
        )?;

        checkpoint.clear_remaining();
        for target in plan.targets() {
            checkpoint.add_remaining(target.domain.as_str());
        }

        if resumed || replayed > 0 {
            info!(
                batch_id = %batch_id,
                completed = checkpoint.completed.len(),
                failed = checkpoint.failed.len(),
                remaining = checkpoint.remaining.len(),
                "resuming batch"
            );
        }

        let mut sink = ResultSink::open(&self.output_dir, batch_id)?;
        for rejected in plan.rejected() {
            // One record per rejected row, so repeated inputs are matched by count
            if let Some(written) = rejected_written.get_mut(&rejected.input) {
                if *written > 0 {
                    *written -= 1;
                    continue;
                }
            }
            let result = ScanResult::rejected(rejected);
            sink.append(&result)?;
            summary.record(&result);
        }

        Ok(BatchRun {
            sink,
            checkpoint,
            summary,
            since_checkpoint: 0,
        })
    }

    fn record(&self, run: &mut BatchRun, result: ScanResult) -> Result<()> {
        let domain = result.key().to_string();

        // Cancelled scans stay queued for the next run
        if result.is_cancelled() {
            debug!(domain = %domain, "scan cancelled; left in remaining");
            run.summary.record(&result);
            return Ok(());
        }

        run.sink.append(&result)?;
        if result.is_success() {
            run.checkpoint.mark_completed(&domain);
        } else {
            run.checkpoint.mark_failed(&domain, reason(&result));
        }
        run.summary.record(&result);

        run.since_checkpoint += 1;
        if run.since_checkpoint >= self.checkpoint_every {
            run.since_checkpoint = 0;
            match run.checkpoint.save(&self.output_dir) {
                Ok(()) => debug!(
                    completed = run.checkpoint.completed.len(),
                    failed = run.checkpoint.failed.len(),
                    remaining = run.checkpoint.remaining.len(),
                    "checkpoint saved"
                ),
                Err(e) => warn!(error = %e, "checkpoint save failed; continuing"),
            }
        }

        Ok(())
    }
}

fn reason(result: &ScanResult) -> String {
    match (&result.error_kind, &result.error) {
        (Some(kind), Some(message)) => format!("{kind}: {message}"),
        (Some(kind), None) => kind.to_string(),
        (None, Some(message)) => message.clone(),
        (None, None) => "unknown".to_string(),
    }
}
