// Item store — loads the collected posts into an ordered, read-only sequence.
//
// The input is the scraper's final_collection.json. Threads keep file order;
// within a thread the OP comes first, then replies. Anything wrong with the
// file (unreadable, undecodable, duplicate post ids) is fatal: the pipeline
// can't guarantee exactly-once output over a malformed store.

pub mod models;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use self::models::{Collection, Post};

/// Load and flatten the input collection.
pub fn load_collection(path: &Path) -> Result<Vec<Post>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input collection at {}", path.display()))?;

    let collection: Collection = serde_json::from_str(&raw)
        .with_context(|| format!("Input collection at {} is not valid JSON", path.display()))?;

    flatten(collection)
}

/// Flatten threads into a single post sequence, validating identity.
pub fn flatten(collection: Collection) -> Result<Vec<Post>> {
    let mut posts = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();

    for thread in collection.threads {
        if let Some(op) = thread.op_post {
            posts.push(op.into_post(false));
        }
        for reply in thread.replies {
            posts.push(reply.into_post(true));
        }
    }

    for post in &posts {
        if !seen.insert(post.post_id) {
            anyhow::bail!(
                "Duplicate post_id {} in input collection — post identity must be unique",
                post.post_id
            );
        }
    }

    info!(posts = posts.len(), "Loaded input collection");
    Ok(posts)
}
