use unicode_normalization::UnicodeNormalization;

pub trait Preprocessor {
    // Default pasted-list preprocessor, keeps line structure
    fn process(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        // Unicode normalization (NFKC): full-width punctuation and half-width kana
        let text: String = text.nfkc().collect();

        text.replace("\r\n", "\n").replace('\r', "\n")
    }
}

pub struct DefaultPreprocessor;
impl Preprocessor for DefaultPreprocessor {}
