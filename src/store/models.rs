// Data models for the input collection.
//
// The scraper writes final_collection.json as a list of threads, each with
// an OP post and its replies. The pipeline flattens that into a single
// ordered sequence of posts; `Post` is the unit of work everywhere else.

use serde::{Deserialize, Serialize};

/// One forum post, flattened out of the thread structure.
/// Immutable once loaded; `post_id` is the stable identity across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub post_id: i64,
    pub thread_id: i64,
    pub content: String,
    /// Unix timestamp of the post, as recorded by the scraper.
    pub timestamp: i64,
    /// Two-letter country code, empty when the board doesn't expose it.
    pub country: String,
    /// False for the thread OP, true for replies.
    pub is_reply: bool,
}

/// Top-level shape of final_collection.json.
#[derive(Debug, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub threads: Vec<Thread>,
}

/// One collected thread: the OP (absent when its content was filtered
/// out during collection) plus replies in board order.
#[derive(Debug, Deserialize)]
pub struct Thread {
    pub op_post: Option<PostRecord>,
    #[serde(default)]
    pub replies: Vec<PostRecord>,
}

/// A raw post record as the scraper serialized it.
#[derive(Debug, Deserialize)]
pub struct PostRecord {
    pub post_id: i64,
    pub thread_id: i64,
    pub content: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub country: String,
}

impl PostRecord {
    pub fn into_post(self, is_reply: bool) -> Post {
        Post {
            post_id: self.post_id,
            thread_id: self.thread_id,
            content: self.content,
            timestamp: self.timestamp,
            country: self.country,
            is_reply,
        }
    }
}
