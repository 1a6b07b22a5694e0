use serde::{Deserialize, Serialize};

use crate::status::{TermStatus, TransitionError};

/// One flashcard candidate derived from one input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    /// Stable identity from position and content, used to correlate async results
    pub key: String,
    /// Index of the source record in the input
    pub index: usize,
    /// Original source line
    pub raw: String,
    /// Structured sub-fields, `None` until parsing completes
    pub fields: Option<TermFields>,
    pub category: Option<Category>,
    /// Resolved image, only present from `searching_images` onward
    pub image: Option<ImageRef>,
    /// Processing round that produced this term
    pub generation: u64,
    /// Number of image searches started for this term
    pub image_attempt: u32,
    status: TermStatus,
    error: Option<TermFailure>,
}

impl Term {
    /// Fresh placeholder in `parsing` status
    pub fn new(generation: u64, index: usize, key: String, raw: String) -> Self {
        Self {
            key,
            index,
            raw,
            fields: None,
            category: None,
            image: None,
            generation,
            image_attempt: 0,
            status: TermStatus::Parsing,
            error: None,
        }
    }

    pub fn status(&self) -> TermStatus {
        self.status
    }

    pub fn error(&self) -> Option<&TermFailure> {
        self.error.as_ref()
    }

    pub fn head(&self) -> Option<&str> {
        self.fields.as_ref().map(|f| f.head.as_str())
    }

    /// Move to `next` following the transition table.
    ///
    /// The image-search re-submission edge (`failed -> searching_images`) is
    /// accepted only when the term failed during an image search; taking it
    /// clears the previous error.
    pub fn transition(&mut self, next: TermStatus) -> Result<(), TransitionError> {
        let from = self.status;

        if from.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        if from.can_retry_to(next) && self.is_retryable() {
            self.status = next;
            self.error = None;
            return Ok(());
        }

        Err(TransitionError { from, to: next })
    }

    /// Mark the term failed with a reason
    pub fn fail(&mut self, stage: FailureStage, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(TermStatus::Failed)?;
        self.error = Some(TermFailure {
            stage,
            message: message.into(),
        });
        Ok(())
    }

    /// Attach a found image and finish the term
    pub fn complete_with_image(&mut self, image: ImageRef) -> Result<(), TransitionError> {
        if self.status != TermStatus::SearchingImages {
            return Err(TransitionError {
                from: self.status,
                to: TermStatus::Done,
            });
        }
        self.image = Some(image);
        self.transition(TermStatus::Done)
    }

    /// A failed image search may be re-submitted; other failures are final
    pub fn is_retryable(&self) -> bool {
        self.status == TermStatus::Failed
            && self
                .error
                .as_ref()
                .is_some_and(|e| e.stage == FailureStage::ImageSearch)
    }
}

/// Parsed sub-fields of a vocabulary line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermFields {
    pub head: String,
    pub reading: Option<String>,
    pub meaning: Option<String>,
    pub example: Option<String>,
}

impl TermFields {
    pub fn new(head: impl Into<String>) -> Self {
        Self {
            head: head.into(),
            ..Default::default()
        }
    }

    /// Fill blank fields from `other`. The head word is never replaced.
    pub fn fill_from(&mut self, other: TermFields) {
        if self.reading.is_none() {
            self.reading = other.reading;
        }
        if self.meaning.is_none() {
            self.meaning = other.meaning;
        }
        if self.example.is_none() {
            self.example = other.example;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Vocabulary,
    Kanji,
    Phrase,
    Grammar,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Vocabulary => "vocabulary",
            Category::Kanji => "kanji",
            Category::Phrase => "phrase",
            Category::Grammar => "grammar",
            Category::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub source: Option<String>,
}

impl ImageRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            thumbnail_url: None,
            source: None,
        }
    }
}

/// Stage at which a term failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Parse,
    Classification,
    ImageSearch,
    /// The input had more records than the configured term limit
    Limit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{stage:?}: {message}")]
pub struct TermFailure {
    pub stage: FailureStage,
    pub message: String,
}
