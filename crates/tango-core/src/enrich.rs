use async_trait::async_trait;
use tango_types::{Category, ImageRef, TermFields};

/// Classification stage collaborator
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one parsed term, optionally filling in missing fields
    async fn classify(&self, fields: &TermFields) -> Result<Classification, EnrichError>;
}

/// Image lookup collaborator
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Find one representative image for the term
    async fn search_image(&self, fields: &TermFields) -> Result<ImageRef, EnrichError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Fields as the classifier sees them; only blanks are merged into the term
    pub fields: TermFields,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrichError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Nothing found for {0:?}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Authentication error")]
    Unauthorized,

    #[error("{0} is disabled")]
    Disabled(&'static str),
}

impl EnrichError {
    /// Errors worth another attempt under the retry policy
    pub fn is_transient(&self) -> bool {
        matches!(self, EnrichError::Network(_) | EnrichError::RateLimited)
    }
}
