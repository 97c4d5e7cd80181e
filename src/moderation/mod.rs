// Moderation service clients.
//
// Two fixed services score every post: the OpenAI Moderation API and the
// Google Perspective API. Both sit behind the ModerationService trait and
// share the rate limiter and the transient/permanent error taxonomy.

pub mod error;
pub mod openai;
pub mod perspective;
pub mod rate_limiter;
pub mod retry;
pub mod traits;

/// Truncate text to at most `max_chars` characters, appending "..." when
/// anything was cut. Both APIs reject over-long bodies, so we trim rather
/// than fail the post.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let kept: String = content.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
