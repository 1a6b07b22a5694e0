pub mod snapshot;
pub mod status;
pub mod term;

pub use snapshot::{Snapshot, TermCounts};
pub use status::{TermStatus, TransitionError};
pub use term::{Category, ImageRef, Term, TermFailure, TermFields, FailureStage};
