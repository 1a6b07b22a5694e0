use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::status::TermStatus;
use crate::term::Term;

/// Immutable copy of the full term list at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    generation: u64,
    terms: Arc<[Term]>,
}

impl Snapshot {
    pub fn new(generation: u64, terms: Vec<Term>) -> Self {
        Self {
            generation,
            terms: terms.into(),
        }
    }

    pub fn empty(generation: u64) -> Self {
        Self::new(generation, Vec::new())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn counts(&self) -> TermCounts {
        TermCounts::from_terms(&self.terms)
    }
}

impl Deref for Snapshot {
    type Target = [Term];

    fn deref(&self) -> &Self::Target {
        &self.terms
    }
}

/// Per-status tallies derived from a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCounts {
    pub total: usize,
    pub parsing: usize,
    pub detecting: usize,
    pub ready: usize,
    pub searching: usize,
    pub done: usize,
    pub failed: usize,
}

impl TermCounts {
    pub fn from_terms(terms: &[Term]) -> Self {
        let mut counts = TermCounts {
            total: terms.len(),
            ..Default::default()
        };

        for term in terms {
            match term.status() {
                TermStatus::Parsing => counts.parsing += 1,
                TermStatus::Detecting => counts.detecting += 1,
                TermStatus::Ready => counts.ready += 1,
                TermStatus::SearchingImages => counts.searching += 1,
                TermStatus::Done => counts.done += 1,
                TermStatus::Failed => counts.failed += 1,
            }
        }

        counts
    }

    /// Any term still waiting on parse, classification or image search
    pub fn is_processing(&self) -> bool {
        self.parsing + self.detecting + self.searching > 0
    }
}
