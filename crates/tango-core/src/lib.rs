pub mod enrich;
pub mod parser;
pub mod preprocess;

pub use enrich::{Classification, Classifier, EnrichError, ImageSearch};
pub use parser::{ParseError, Record, parse_record, split_records, term_key};
