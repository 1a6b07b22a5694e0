use async_trait::async_trait;
use tango_core::{Classification, Classifier, EnrichError};
use tango_types::{Category, TermFields};

use crate::script::{Script, has_japanese, is_kana_only, katakana_to_hiragana};

/// Offline classifier working from the head word's script alone.
///
/// Used when no backend is configured. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptClassifier;

impl ScriptClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn categorize(&self, head: &str) -> Category {
        let mut chars = head.chars();
        let first = chars.next();

        if matches!(first, Some('〜' | '~' | '～')) {
            return Category::Grammar;
        }

        if head.contains(char::is_whitespace)
            || head.contains(['、', '。'])
            || head.ends_with(['!', '?', '.'])
        {
            return Category::Phrase;
        }

        if let (Some(c), None) = (first, chars.next()) {
            if Script::of(c) == Script::Kanji {
                return Category::Kanji;
            }
        }

        if has_japanese(head) {
            Category::Vocabulary
        } else {
            Category::Other
        }
    }
}

#[async_trait]
impl Classifier for ScriptClassifier {
    async fn classify(&self, fields: &TermFields) -> Result<Classification, EnrichError> {
        let category = self.categorize(&fields.head);
        let mut classified = TermFields::new(fields.head.clone());

        if is_kana_only(&fields.head) {
            classified.reading = Some(katakana_to_hiragana(&fields.head));
        }

        tracing::trace!(head = %fields.head, category = category.as_str(), "[JA] classified");

        Ok(Classification {
            fields: classified,
            category,
        })
    }
}
