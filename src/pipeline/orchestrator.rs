// Batch orchestrator — drives the full run to completion or clean interruption.
//
// Phases: load progress and compute the remaining-work sequence, then
// process it in fixed-size batches. Each post goes to both services
// sequentially, the results are merged, and the whole batch is persisted
// in one transaction before the next begins. Per-item failures are
// absorbed into Failed records; only store or persistence problems abort
// the run.

use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Instant;
use tracing::{info, warn};

use super::aggregate::{merge, AggregatedRecord};
use super::ShutdownSignal;
use crate::moderation::traits::ModerationService;
use crate::progress::ProgressTracker;
use crate::store::models::Post;

/// Knobs for one run.
pub struct RunConfig {
    /// Posts per batch; the batch is the unit of durability.
    pub batch_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
        }
    }
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The remaining-work sequence was exhausted.
    Completed,
    /// Shutdown was requested; progress is consistent through `batch_index`.
    Interrupted,
}

/// Summary of one run, for the operator report.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Size of the input collection.
    pub total_posts: usize,
    /// Posts skipped because they were already recorded.
    pub already_done: usize,
    /// Posts processed during this run.
    pub processed: usize,
    /// Posts where both services succeeded.
    pub succeeded: usize,
    /// Posts recorded as failed overall.
    pub failed: usize,
    pub openai_success: usize,
    pub perspective_success: usize,
    /// (post_id, reason) for every failure in this run.
    pub failed_posts: Vec<(i64, String)>,
    /// Batch index after the last durable write.
    pub batch_index: u32,
    pub elapsed: Duration,
}

/// Run the pipeline over `posts`, resuming from whatever the tracker
/// already has. Returns Fatal-class errors only; service failures are
/// folded into the report.
pub async fn run(
    posts: &[Post],
    openai: &dyn ModerationService,
    perspective: &dyn ModerationService,
    tracker: &ProgressTracker<'_>,
    config: &RunConfig,
    shutdown: &ShutdownSignal,
) -> Result<RunReport> {
    if config.batch_size == 0 {
        anyhow::bail!("Batch size must be at least 1");
    }

    let started = Instant::now();

    // Loading phase: figure out what's left to do.
    let state = tracker.load().await?;
    let remaining: Vec<&Post> = posts.iter().filter(|p| !state.is_done(p.post_id)).collect();
    let already_done = posts.len() - remaining.len();
    let total_batches = remaining.len().div_ceil(config.batch_size);

    info!(
        total = posts.len(),
        already_done,
        remaining = remaining.len(),
        batches = total_batches,
        batch_size = config.batch_size,
        resume_batch_index = state.batch_index,
        "Starting processing"
    );

    let mut report = RunReport {
        outcome: RunOutcome::Completed,
        total_posts: posts.len(),
        already_done,
        processed: 0,
        succeeded: 0,
        failed: 0,
        openai_success: 0,
        perspective_success: 0,
        failed_posts: Vec::new(),
        batch_index: state.batch_index,
        elapsed: Duration::ZERO,
    };

    let pb = ProgressBar::new(remaining.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Scoring [{bar:30}] {pos}/{len} ({eta})")
            .unwrap(),
    );

    for (chunk_index, batch) in remaining.chunks(config.batch_size).enumerate() {
        let batch_started = Instant::now();
        let mut records: Vec<AggregatedRecord> = Vec::with_capacity(batch.len());

        for post in batch {
            // Two sequential suspension points; the order between the
            // services is not significant, but both must complete before
            // the record is merged.
            let openai_result = openai.submit(post).await;
            let perspective_result = perspective.submit(post).await;

            if openai_result.is_success() {
                report.openai_success += 1;
            }
            if perspective_result.is_success() {
                report.perspective_success += 1;
            }

            let record = merge(post.post_id, openai_result, perspective_result);
            if record.is_complete() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
                let reason = record
                    .failure_reason()
                    .unwrap_or_else(|| "unknown".to_string());
                warn!(post_id = post.post_id, reason = %reason, "Post failed");
                report.failed_posts.push((post.post_id, reason));
            }
            report.processed += 1;
            records.push(record);
            pb.inc(1);
        }

        report.batch_index += 1;
        tracker.record_batch(&records, report.batch_index).await?;

        info!(
            batch = report.batch_index,
            posts = records.len(),
            elapsed_ms = batch_started.elapsed().as_millis() as u64,
            "Batch recorded"
        );

        // Interruption is honored at batch boundaries only: the batch
        // above is already durable, so resume is exact.
        if shutdown.is_triggered() && chunk_index + 1 < total_batches {
            pb.finish_and_clear();
            info!(batch_index = report.batch_index, "Run interrupted");
            report.outcome = RunOutcome::Interrupted;
            report.elapsed = started.elapsed();
            return Ok(report);
        }
    }

    pb.finish_and_clear();
    report.elapsed = started.elapsed();
    info!(
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        "Processing complete"
    );
    Ok(report)
}
