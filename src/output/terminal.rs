// Terminal rendering of the run report.

use colored::Colorize;

use crate::output::truncate_chars;
use crate::pipeline::orchestrator::{RunOutcome, RunReport};

/// How many failed posts to list before collapsing the rest into a count.
const MAX_FAILURES_LISTED: usize = 20;

/// Print the end-of-run summary.
pub fn display_run_report(report: &RunReport) {
    println!();
    match report.outcome {
        RunOutcome::Completed => println!("{}", "Run complete.".bold()),
        RunOutcome::Interrupted => println!(
            "{}",
            format!(
                "Run interrupted at batch {} — run `crossmod run` again to resume.",
                report.batch_index
            )
            .yellow()
            .bold()
        ),
    }

    println!("  Input posts:          {}", report.total_posts);
    println!("  Already recorded:     {}", report.already_done);
    println!("  Processed this run:   {}", report.processed);
    println!("  Succeeded (both):     {}", report.succeeded);
    if report.failed > 0 {
        println!(
            "  Failed:               {}",
            report.failed.to_string().red()
        );
    } else {
        println!("  Failed:               0");
    }
    println!("  OpenAI successes:     {}", report.openai_success);
    println!("  Perspective successes: {}", report.perspective_success);
    println!(
        "  Elapsed:              {}",
        format_duration(report.elapsed.as_secs())
    );

    if !report.failed_posts.is_empty() {
        println!("\n{}", "Failed posts:".bold());
        for (post_id, reason) in report.failed_posts.iter().take(MAX_FAILURES_LISTED) {
            println!("  {} — {}", post_id, truncate_chars(reason, 100).dimmed());
        }
        let rest = report.failed_posts.len().saturating_sub(MAX_FAILURES_LISTED);
        if rest > 0 {
            println!("  {}", format!("... and {rest} more").dimmed());
        }
    }
}

/// Render seconds as "2h 14m 05s" style.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
