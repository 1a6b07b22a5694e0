use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Generation counter shared between the engine and its in-flight stage tasks.
///
/// Only the engine advances it; tasks compare the generation they were
/// scheduled under before each collaborator call.
#[derive(Clone, Debug, Default)]
pub(crate) struct Fence(Arc<AtomicU64>);

impl Fence {
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Start a new generation and return it
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}
