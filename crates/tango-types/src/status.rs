use serde::{Deserialize, Serialize};

/// Lifecycle stage of a single term within one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermStatus {
    Parsing,
    Detecting,
    Ready,
    SearchingImages,
    Done,
    Failed,
}

impl TermStatus {
    /// Position in the forward order `parsing < detecting < ready < searching_images < done`.
    /// `Failed` sorts last; it can be reached from any non-terminal stage.
    pub fn rank(self) -> u8 {
        match self {
            TermStatus::Parsing => 0,
            TermStatus::Detecting => 1,
            TermStatus::Ready => 2,
            TermStatus::SearchingImages => 3,
            TermStatus::Done => 4,
            TermStatus::Failed => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TermStatus::Done | TermStatus::Failed)
    }

    /// Waiting on parse, classification or image search
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            TermStatus::Parsing | TermStatus::Detecting | TermStatus::SearchingImages
        )
    }

    /// Transition table for the forward lifecycle.
    ///
    /// `Failed -> SearchingImages` is not part of the forward table; it is the
    /// re-submission edge and is checked separately by [`TermStatus::can_retry_to`].
    pub fn can_transition_to(self, next: TermStatus) -> bool {
        use TermStatus::*;

        match (self, next) {
            (Parsing, Detecting)
            | (Detecting, Ready)
            | (Ready, SearchingImages)
            | (SearchingImages, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Edges only reachable through an explicit user re-submission
    pub fn can_retry_to(self, next: TermStatus) -> bool {
        matches!((self, next), (TermStatus::Failed, TermStatus::SearchingImages))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TermStatus::Parsing => "parsing",
            TermStatus::Detecting => "detecting",
            TermStatus::Ready => "ready",
            TermStatus::SearchingImages => "searching_images",
            TermStatus::Done => "done",
            TermStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TermStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal term transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: TermStatus,
    pub to: TermStatus,
}

#[cfg(test)]
mod tests {
    use super::TermStatus::*;
    use super::*;

    const ALL: [TermStatus; 6] = [Parsing, Detecting, Ready, SearchingImages, Done, Failed];

    #[test]
    fn forward_edges_are_allowed() {
        assert!(Parsing.can_transition_to(Detecting));
        assert!(Detecting.can_transition_to(Ready));
        assert!(Ready.can_transition_to(SearchingImages));
        assert!(SearchingImages.can_transition_to(Done));
    }

    #[test]
    fn no_backward_or_skipping_edges() {
        for from in ALL {
            for to in ALL {
                if to == Failed {
                    continue;
                }
                if from.can_transition_to(to) {
                    assert_eq!(to.rank(), from.rank() + 1, "{from} -> {to}");
                }
            }
        }
        assert!(!Ready.can_transition_to(Detecting));
        assert!(!Parsing.can_transition_to(Ready));
        assert!(!Done.can_transition_to(SearchingImages));
    }

    #[test]
    fn failed_reachable_from_non_terminal_only() {
        for from in [Parsing, Detecting, Ready, SearchingImages] {
            assert!(from.can_transition_to(Failed));
        }
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
    }

    #[test]
    fn terminal_states_have_no_forward_edges() {
        for to in ALL {
            assert!(!Done.can_transition_to(to));
            assert!(!Failed.can_transition_to(to));
        }
    }

    #[test]
    fn retry_edge_is_separate() {
        assert!(Failed.can_retry_to(SearchingImages));
        assert!(!Failed.can_retry_to(Ready));
        assert!(!Done.can_retry_to(SearchingImages));
    }
}
