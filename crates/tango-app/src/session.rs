use std::sync::Arc;

use tango_config::pipeline::PipelineConfig;
use tango_core::{Classifier, ImageSearch};
use tango_pipeline::{PipelineView, ViewState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::output;

pub struct Collaborators {
    pub classifier: Arc<dyn Classifier>,
    pub image_search: Arc<dyn ImageSearch>,
}

/// Process `text` once and return the settled state, `None` if cancelled
pub async fn run_batch(
    config: PipelineConfig,
    collaborators: Collaborators,
    text: &str,
    search_images: bool,
    shutdown: &CancellationToken,
) -> anyhow::Result<Option<ViewState>> {
    let mut view = PipelineView::headless(
        config,
        collaborators.classifier,
        collaborators.image_search,
    )?;

    let state = settle(&mut view, text, search_images, shutdown).await;
    view.teardown();
    Ok(state)
}

/// Feed lines from `input` into the debounced pipeline as they arrive.
///
/// Every snapshot is forwarded to a printer task; on end of input the
/// accumulated text is flushed and the settled state returned.
pub async fn run_watch<R>(
    config: PipelineConfig,
    collaborators: Collaborators,
    input: R,
    search_images: bool,
    shutdown: &CancellationToken,
) -> anyhow::Result<Option<ViewState>>
where
    R: AsyncBufRead + Unpin,
{
    let (tx, rx) = kanal::unbounded_async::<ViewState>();
    let mut view = PipelineView::new(
        config,
        collaborators.classifier,
        collaborators.image_search,
        move |state| {
            let _ = tx.try_send(state.clone());
        },
    )?;

    let printer = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    state = rx.recv() => match state {
                        Ok(state) => eprintln!("{}", output::format_summary(&state.snapshot)),
                        Err(_) => break,
                    },
                }
            }
        }
    });

    let mut lines = input.lines();
    let mut text = String::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => match line? {
                Some(line) => {
                    text.push_str(&line);
                    text.push('\n');
                    view.set_input(&text);
                }
                None => break,
            },
        }
    }

    let state = if shutdown.is_cancelled() {
        None
    } else {
        settle(&mut view, &text, search_images, shutdown).await
    };

    view.teardown();
    if let Err(e) = printer.await {
        tracing::error!("[APP] printer task panicked: {e}");
    }

    Ok(state)
}

/// Run `text` immediately, wait for enrichment and optionally images
async fn settle(
    view: &mut PipelineView,
    text: &str,
    search_images: bool,
    shutdown: &CancellationToken,
) -> Option<ViewState> {
    let before = view.snapshot().generation();
    view.process_now(text);

    let state = tokio::select! {
        biased;
        _ = shutdown.cancelled() => return None,
        state = view.wait_until(|s| s.snapshot.generation() > before && !s.counts.is_processing) => state,
    };

    if !search_images || state.counts.ready_count == 0 {
        return Some(state);
    }

    tracing::info!("[APP] searching images for {} terms", state.counts.ready_count);
    view.search_all_images();

    tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        state = view.wait_until(|s| s.counts.ready_count == 0 && !s.counts.is_processing) => Some(state),
    }
}
