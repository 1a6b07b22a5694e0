//! Terminal and JSON rendering of term snapshots.

use serde::Serialize;
use tango_types::{Snapshot, Term, TermCounts};

/// Longest raw line shown for terms without a head word
const RAW_MAX_LEN: usize = 40;

/// Snapshot plus its derived counts
#[derive(Serialize)]
pub struct JsonOutput<'a> {
    #[serde(flatten)]
    pub snapshot: &'a Snapshot,
    pub counts: TermCounts,
}

pub fn format_json(snapshot: &Snapshot) -> String {
    let output = JsonOutput {
        snapshot,
        counts: snapshot.counts(),
    };
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// One line per term, in input order
pub fn format_table(snapshot: &Snapshot) -> String {
    if snapshot.is_empty() {
        return "No terms.".to_string();
    }

    let mut out = String::new();
    for term in snapshot.iter() {
        out.push_str(&format_term(term));
        out.push('\n');
    }
    out.push_str(&format_summary(snapshot));
    out
}

/// Single-line progress report
pub fn format_summary(snapshot: &Snapshot) -> String {
    let counts = snapshot.counts();
    let state = if counts.is_processing() {
        "processing"
    } else {
        "idle"
    };

    format!(
        "[gen {}] {} terms: {} ready, {} done, {} failed ({state})",
        snapshot.generation(),
        counts.total,
        counts.ready,
        counts.done,
        counts.failed,
    )
}

fn format_term(term: &Term) -> String {
    let category = term.category.map(|c| c.as_str()).unwrap_or("-");
    let mut line = format!(
        "{:>3}  {:<16} {:<10} ",
        term.index + 1,
        term.status().as_str(),
        category
    );

    match &term.fields {
        Some(fields) => {
            line.push_str(&fields.head);
            if let Some(reading) = &fields.reading {
                line.push_str(&format!(" [{reading}]"));
            }
            if let Some(meaning) = &fields.meaning {
                line.push_str(&format!(" {meaning}"));
            }
        }
        None => line.push_str(&truncate_text(&term.raw, RAW_MAX_LEN)),
    }

    if let Some(image) = &term.image {
        line.push_str(&format!("  <{}>", image.url));
    }
    if let Some(error) = term.error() {
        line.push_str(&format!("  ! {error}"));
    }

    line
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
