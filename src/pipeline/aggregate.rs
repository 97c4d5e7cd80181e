// Result aggregation — merging both services' verdicts for one post.
//
// merge() is a pure function. A record is Complete only when both services
// returned Success; anything else marks the record Failed overall, but a
// successful half is always retained so partial data is never thrown away.

use serde::{Deserialize, Serialize};

use crate::moderation::traits::ModerationResult;

/// Overall completion status of one post's combined record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Complete,
    Failed,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Complete => "complete",
            CompletionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "complete" => Some(CompletionStatus::Complete),
            "failed" => Some(CompletionStatus::Failed),
            _ => None,
        }
    }
}

/// One post's combined result from both services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub post_id: i64,
    pub openai: Option<ModerationResult>,
    pub perspective: Option<ModerationResult>,
    pub status: CompletionStatus,
}

impl AggregatedRecord {
    pub fn is_complete(&self) -> bool {
        self.status == CompletionStatus::Complete
    }

    /// Human-readable failure reason, drawn from whichever halves failed.
    pub fn failure_reason(&self) -> Option<String> {
        if self.is_complete() {
            return None;
        }
        let mut reasons = Vec::new();
        for result in [self.openai.as_ref(), self.perspective.as_ref()]
            .into_iter()
            .flatten()
        {
            if !result.is_success() {
                let detail = result.error.as_deref().unwrap_or("unknown error");
                reasons.push(format!("{}: {}", result.service, detail));
            }
        }
        if reasons.is_empty() {
            reasons.push("missing service result".to_string());
        }
        Some(reasons.join("; "))
    }
}

/// Merge both services' results for one post into a combined record.
pub fn merge(
    post_id: i64,
    openai: ModerationResult,
    perspective: ModerationResult,
) -> AggregatedRecord {
    let status = if openai.is_success() && perspective.is_success() {
        CompletionStatus::Complete
    } else {
        CompletionStatus::Failed
    };

    AggregatedRecord {
        post_id,
        openai: Some(openai),
        perspective: Some(perspective),
        status,
    }
}
