use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tango_core::{Classification, EnrichError};
use tango_types::{Category, ImageRef, TermFields};

#[derive(Serialize)]
pub(crate) struct DetectRequest<'a> {
    pub term: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<&'a str>,
}

impl<'a> From<&'a TermFields> for DetectRequest<'a> {
    fn from(fields: &'a TermFields) -> Self {
        Self {
            term: &fields.head,
            reading: fields.reading.as_deref(),
            meaning: fields.meaning.as_deref(),
            example: fields.example.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetectResponse {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub reading: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

impl DetectResponse {
    /// The head word always comes from the request
    pub fn into_classification(self, head: &str) -> Classification {
        let category = self
            .category
            .as_deref()
            .map(category_from_label)
            .unwrap_or(Category::Other);

        Classification {
            fields: TermFields {
                head: head.to_string(),
                reading: non_blank(self.reading),
                meaning: non_blank(self.meaning),
                example: non_blank(self.example),
            },
            category,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageSearchResponse {
    #[serde(default)]
    pub images: Vec<ImageHit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageHit {
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ImageSearchResponse {
    /// First usable hit
    pub fn into_image(self, head: &str) -> Result<ImageRef, EnrichError> {
        self.images
            .into_iter()
            .find(|hit| !hit.url.trim().is_empty())
            .map(|hit| ImageRef {
                url: hit.url,
                thumbnail_url: hit.thumbnail_url,
                source: hit.source,
            })
            .ok_or_else(|| EnrichError::NotFound(head.to_string()))
    }
}

pub(crate) fn category_from_label(label: &str) -> Category {
    match label.trim().to_ascii_lowercase().as_str() {
        "vocabulary" | "vocab" | "word" => Category::Vocabulary,
        "kanji" => Category::Kanji,
        "phrase" | "expression" | "sentence" => Category::Phrase,
        "grammar" => Category::Grammar,
        _ => Category::Other,
    }
}

/// `None` for 2xx
pub(crate) fn status_error(status: StatusCode) -> Option<EnrichError> {
    match status {
        s if s.is_success() => None,
        StatusCode::TOO_MANY_REQUESTS => Some(EnrichError::RateLimited),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(EnrichError::Unauthorized),
        s => Some(EnrichError::Api(format!("HTTP {s}"))),
    }
}

pub(crate) fn request_error(err: reqwest::Error) -> EnrichError {
    if err.is_decode() {
        EnrichError::Api(format!("Failed to parse response: {err}"))
    } else {
        EnrichError::Network(err.to_string())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses() {
        assert_eq!(status_error(StatusCode::OK), None);
        assert_eq!(status_error(StatusCode::TOO_MANY_REQUESTS), Some(EnrichError::RateLimited));
        assert_eq!(status_error(StatusCode::FORBIDDEN), Some(EnrichError::Unauthorized));
        assert_eq!(status_error(StatusCode::UNAUTHORIZED), Some(EnrichError::Unauthorized));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY),
            Some(EnrichError::Api(msg)) if msg.contains("502")
        ));
    }

    #[test]
    fn detect_response_keeps_head_and_drops_blanks() {
        let response: DetectResponse = serde_json::from_str(
            r#"{"category": "Kanji", "reading": "みず", "meaning": "  ", "term": "ignored"}"#,
        )
        .unwrap();

        let classification = response.into_classification("水");
        assert_eq!(classification.category, Category::Kanji);
        assert_eq!(classification.fields.head, "水");
        assert_eq!(classification.fields.reading.as_deref(), Some("みず"));
        assert!(classification.fields.meaning.is_none());
    }

    #[test]
    fn unknown_category_is_other() {
        let response: DetectResponse = serde_json::from_str(r#"{"category": "idiom"}"#).unwrap();
        assert_eq!(response.into_classification("x").category, Category::Other);

        let response: DetectResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.into_classification("x").category, Category::Other);
    }

    #[test]
    fn picks_first_usable_image() {
        let response: ImageSearchResponse = serde_json::from_str(
            r#"{"images": [{"url": ""}, {"url": "https://img/cat.png", "source": "wiki"}]}"#,
        )
        .unwrap();

        let image = response.into_image("猫").unwrap();
        assert_eq!(image.url, "https://img/cat.png");
        assert_eq!(image.source.as_deref(), Some("wiki"));
    }

    #[test]
    fn no_images_is_not_found() {
        let response: ImageSearchResponse = serde_json::from_str(r#"{"images": []}"#).unwrap();
        assert_eq!(
            response.into_image("猫"),
            Err(EnrichError::NotFound("猫".to_string()))
        );
    }

    #[test]
    fn request_omits_missing_fields() {
        let mut fields = TermFields::new("猫");
        fields.meaning = Some("cat".to_string());

        let json = serde_json::to_value(DetectRequest::from(&fields)).unwrap();
        assert_eq!(json, serde_json::json!({"term": "猫", "meaning": "cat"}));
    }
}
