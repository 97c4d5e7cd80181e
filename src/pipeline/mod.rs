// Batch processing pipeline: aggregation and orchestration.

pub mod aggregate;
pub mod orchestrator;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative shutdown flag, set by the Ctrl-C handler and checked by the
/// orchestrator at batch boundaries. The in-flight batch always finishes
/// and is recorded before the run exits.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
