use std::sync::Arc;
use std::time::Duration;

use tango_config::pipeline::PipelineConfig;
use tango_lang_japanese::ScriptClassifier;
use tango_remote::DisabledImageSearch;
use tango_types::{Category, FailureStage, TermStatus};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::session::{Collaborators, run_batch, run_watch};

fn offline() -> Collaborators {
    Collaborators {
        classifier: Arc::new(ScriptClassifier::new()),
        image_search: Arc::new(DisabledImageSearch),
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        debounce_ms: 20,
        ..Default::default()
    }
}

#[tokio::test]
async fn batch_classifies_every_line() {
    let shutdown = CancellationToken::new();
    let text = "山 - mountain\n\nねこ\n〜ながら - while\n- - -\n";

    let state = timeout(
        Duration::from_secs(5),
        run_batch(config(), offline(), text, false, &shutdown),
    )
    .await
    .unwrap()
    .unwrap()
    .expect("batch was not cancelled");

    let terms = state.snapshot.terms();
    assert_eq!(terms.len(), 4);
    assert_eq!(terms[0].category, Some(Category::Kanji));
    assert_eq!(terms[1].fields.as_ref().unwrap().reading.as_deref(), Some("ねこ"));
    assert_eq!(terms[2].category, Some(Category::Grammar));
    assert_eq!(terms[3].status(), TermStatus::Failed);
    assert_eq!(state.counts.ready_count, 3);
}

#[tokio::test]
async fn offline_image_search_fails_terms() {
    let shutdown = CancellationToken::new();

    let state = timeout(
        Duration::from_secs(5),
        run_batch(config(), offline(), "山\n海", true, &shutdown),
    )
    .await
    .unwrap()
    .unwrap()
    .unwrap();

    assert_eq!(state.counts.failed_count, 2);
    for term in state.snapshot.iter() {
        assert_eq!(term.error().unwrap().stage, FailureStage::ImageSearch);
    }
}

#[tokio::test]
async fn cancelled_batch_returns_nothing() {
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let state = run_batch(config(), offline(), "山", false, &shutdown)
        .await
        .unwrap();
    assert!(state.is_none());
}

#[tokio::test]
async fn watch_processes_accumulated_lines() {
    let shutdown = CancellationToken::new();
    let input: &[u8] = "山\n川\n".as_bytes();

    let state = timeout(
        Duration::from_secs(5),
        run_watch(config(), offline(), input, false, &shutdown),
    )
    .await
    .unwrap()
    .unwrap()
    .unwrap();

    let heads: Vec<_> = state.snapshot.iter().filter_map(|t| t.head()).collect();
    assert_eq!(heads, ["山", "川"]);
}

#[tokio::test]
async fn malformed_config_is_rejected() {
    let shutdown = CancellationToken::new();
    let config = PipelineConfig {
        max_terms: 0,
        ..Default::default()
    };

    assert!(run_batch(config, offline(), "山", false, &shutdown).await.is_err());
}
