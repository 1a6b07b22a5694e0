pub mod classifier;
pub mod script;

pub use classifier::ScriptClassifier;
pub use script::{Script, katakana_to_hiragana};
