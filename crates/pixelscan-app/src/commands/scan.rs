use super::build_pipeline;
use anyhow::Context;
use pixelscan_core::{AppConfig, BatchId};
use pixelscan_scanner::{read_targets, BatchOrchestrator, BatchSummary};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn run(config: &AppConfig, input: &Path, batch_id: Option<&str>) -> anyhow::Result<()> {
    let batch_id = match batch_id {
        Some(id) => BatchId::new(id)?,
        None => BatchId::generate(),
    };

    let targets = read_targets(input)
        .with_context(|| format!("cannot read targets from {}", input.display()))?;
    info!(batch_id = %batch_id, targets = targets.len(), "loaded targets");

    let pipeline = Arc::new(build_pipeline(config)?);
    let orchestrator = BatchOrchestrator::from_config(pipeline, config)?;

    // Ctrl-C stops new scans and leaves unfinished domains queued
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing up...");
            signal.cancel();
        }
    });

    let summary = orchestrator
        .run_with_token(&batch_id, targets, &shutdown)
        .await?;

    print_summary(&summary, orchestrator.output_dir());
    if shutdown.is_cancelled() {
        println!(
            "Interrupted. Resume with: pixelscan scan {} --batch-id {batch_id}",
            input.display()
        );
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary, output_dir: &Path) {
    println!("Batch {}", summary.batch_id);
    println!(
        "  {} targets: {} succeeded, {} failed, {} rejected",
        summary.total, summary.succeeded, summary.failed, summary.rejected
    );
    println!(
        "  {} sites with trackers ({:.0}% success rate, {:.1} domains/min)",
        summary.with_trackers,
        summary.success_rate * 100.0,
        summary.domains_per_minute
    );
    for (tracker, count) in &summary.tracker_totals {
        println!("    {tracker}: {count}");
    }
    for (kind, count) in &summary.failures_by_kind {
        println!("    failed ({kind}): {count}");
    }
    println!("  Output: {}", output_dir.display());
}
