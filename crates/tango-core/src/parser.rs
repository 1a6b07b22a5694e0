//! Pure decomposition of pasted vocabulary lists into term fields.
//!
//! Every non-blank line is one record. Recognised shapes, first match wins:
//!
//! - `head<TAB>reading<TAB>meaning<TAB>example`
//! - `head【reading】 meaning` or `head (reading) - meaning`
//! - `head - reading - meaning - example` (also `=`, `:`, `;` and `,`)
//! - a bare head word

use sha2::{Digest, Sha256};
use tango_types::TermFields;

use crate::preprocess::{DefaultPreprocessor, Preprocessor};

/// Field separators, tried in order; the first one present splits the whole line
const SEPARATORS: [&str; 7] = [" - ", " – ", " — ", " = ", ": ", ";", ","];

const BRACKETS: [(char, char); 3] = [('【', '】'), ('(', ')'), ('[', ']')];

/// One logical record of the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Position among non-blank records
    pub index: usize,
    pub key: String,
    /// Source line as pasted, without trailing whitespace
    pub raw: String,
    /// NFKC-normalized line the parser works on
    pub normalized: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no head word in {0:?}")]
    NoHeadWord(String),
}

/// Split input into records, skipping whitespace-only lines
pub fn split_records(text: &str) -> Vec<Record> {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    unified
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(index, original)| {
            let normalized = DefaultPreprocessor.process(original).trim().to_string();
            Record {
                index,
                key: term_key(index, &normalized),
                raw: original.trim_end().to_string(),
                normalized,
            }
        })
        .collect()
}

/// Stable identity from position and content
pub fn term_key(index: usize, line: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((index as u64).to_le_bytes());
    hasher.update(line.as_bytes());
    let digest = hasher.finalize();

    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Decompose one normalized line into fields
pub fn parse_record(line: &str) -> Result<TermFields, ParseError> {
    let body = strip_list_marker(line.trim());

    let fields = if body.contains('\t') {
        fields_from_parts(body.split('\t').collect())
    } else if let Some(fields) = parse_bracketed(body) {
        fields
    } else if let Some(sep) = SEPARATORS.iter().find(|s| body.contains(**s)) {
        fields_from_parts(body.split(*sep).collect())
    } else {
        TermFields::new(body)
    };

    if !fields.head.chars().any(char::is_alphanumeric) {
        tracing::debug!("[PARSER] no head word in {line:?}");
        return Err(ParseError::NoHeadWord(line.to_string()));
    }

    Ok(fields)
}

fn strip_list_marker(line: &str) -> &str {
    for marker in ["- ", "* ", "• ", "・"] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }

    // "12. word" or "3) word"
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        for marker in [". ", ") "] {
            if let Some(rest) = rest.strip_prefix(marker) {
                return rest.trim_start();
            }
        }
    }

    line
}

/// `head【reading】rest` where the bracket follows a non-empty head
fn parse_bracketed(body: &str) -> Option<TermFields> {
    let (open_at, open, close) = BRACKETS
        .iter()
        .filter_map(|&(open, close)| body.find(open).map(|at| (at, open, close)))
        .min_by_key(|(at, _, _)| *at)?;

    // A separator before the bracket means the bracket belongs to a later field
    let first_sep = SEPARATORS.iter().filter_map(|s| body.find(s)).min();
    if first_sep.is_some_and(|at| at < open_at) {
        return None;
    }

    let head = body[..open_at].trim();
    if head.is_empty() {
        return None;
    }

    let after_open = &body[open_at + open.len_utf8()..];
    let close_at = after_open.find(close)?;
    let reading = after_open[..close_at].trim();
    let rest = after_open[close_at + close.len_utf8()..]
        .trim_start_matches(|c: char| c.is_whitespace() || "-–—=:;,".contains(c))
        .trim();

    let mut fields = TermFields::new(head);
    fields.reading = non_empty(reading);

    if !rest.is_empty() {
        match SEPARATORS.iter().find(|s| rest.contains(**s)) {
            Some(sep) => {
                let mut parts = rest.splitn(2, *sep);
                fields.meaning = parts.next().and_then(non_empty);
                fields.example = parts.next().and_then(non_empty);
            }
            None => fields.meaning = non_empty(rest),
        }
    }

    Some(fields)
}

/// Two parts: head + meaning. Three: head + reading + meaning. More: the tail is the example.
fn fields_from_parts(parts: Vec<&str>) -> TermFields {
    let mut parts = parts.into_iter().map(str::trim);
    let mut fields = TermFields::new(parts.next().unwrap_or_default());
    let rest: Vec<&str> = parts.collect();

    match rest.as_slice() {
        [] => {}
        [meaning] => fields.meaning = non_empty(meaning),
        [reading, meaning] => {
            fields.reading = non_empty(reading);
            fields.meaning = non_empty(meaning);
        }
        [reading, meaning, example @ ..] => {
            fields.reading = non_empty(reading);
            fields.meaning = non_empty(meaning);
            let example: Vec<&str> = example.iter().copied().filter(|e| !e.is_empty()).collect();
            fields.example = non_empty(&example.join(" "));
        }
    }

    fields
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
