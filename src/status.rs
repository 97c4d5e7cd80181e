// Progress summary — shows record counts, batch index, and remaining work.

use std::path::Path;

use anyhow::Result;

use crate::db::Database;
use crate::store;

/// Display the current progress summary to the terminal.
pub async fn show(db: &Database, db_path: &str, input_path: &str) -> Result<()> {
    // Database file size
    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    let counts = db.counts().await?;
    println!(
        "Records: {} total ({} complete, {} failed)",
        counts.total, counts.complete, counts.failed
    );

    let state = db.load_progress().await?;
    println!("Batch index: {}", state.batch_index);
    match &state.last_updated {
        Some(ts) => println!("Last update: {}", ts),
        None => println!("Last update: never"),
    }

    // Remaining work, when the input collection is readable. The status
    // command shouldn't fail just because the input isn't present.
    if Path::new(input_path).exists() {
        match store::load_collection(Path::new(input_path)) {
            Ok(posts) => {
                let remaining = posts.iter().filter(|p| !state.is_done(p.post_id)).count();
                println!("Input: {} posts at {}", posts.len(), input_path);
                if remaining == 0 {
                    println!("Remaining: 0 — the collection is fully processed");
                } else {
                    println!("Remaining: {} — run `crossmod run` to continue", remaining);
                }
            }
            Err(e) => println!("Input: failed to read {} ({})", input_path, e),
        }
    } else {
        println!("Input: not found at {}", input_path);
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
