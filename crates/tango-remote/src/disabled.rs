use async_trait::async_trait;
use tango_core::{EnrichError, ImageSearch};
use tango_types::{ImageRef, TermFields};

/// Image search stand-in for offline runs
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledImageSearch;

#[async_trait]
impl ImageSearch for DisabledImageSearch {
    async fn search_image(&self, _fields: &TermFields) -> Result<ImageRef, EnrichError> {
        Err(EnrichError::Disabled("Image search"))
    }
}
