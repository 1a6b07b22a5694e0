use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tango_config::ConfigError;
use tango_config::pipeline::PipelineConfig;
use tango_core::{Classifier, ImageSearch};
use tango_types::{Snapshot, TermCounts};
use tokio::sync::watch;

use crate::pipeline::{SubscriptionId, TermPipeline};

/// Aggregates derived from the latest snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewCounts {
    pub is_processing: bool,
    pub done_count: usize,
    pub ready_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
}

impl From<TermCounts> for ViewCounts {
    fn from(counts: TermCounts) -> Self {
        Self {
            is_processing: counts.is_processing(),
            done_count: counts.done,
            ready_count: counts.ready,
            failed_count: counts.failed,
            total_count: counts.total,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub snapshot: Snapshot,
    pub counts: ViewCounts,
}

impl ViewState {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            counts: snapshot.counts().into(),
            snapshot: snapshot.clone(),
        }
    }
}

/// Binds one [`TermPipeline`] to a consumer's render cycle
pub struct PipelineView {
    pipeline: TermPipeline,
    subscription: SubscriptionId,
    state: watch::Receiver<ViewState>,
    alive: Arc<AtomicBool>,
    /// Held across every render and by teardown
    render_gate: Arc<Mutex<()>>,
}

impl PipelineView {
    /// `render` runs for every snapshot until teardown; panics inside it are logged and swallowed.
    /// It must not tear down its own view.
    pub fn new<R>(
        config: PipelineConfig,
        classifier: Arc<dyn Classifier>,
        image_search: Arc<dyn ImageSearch>,
        render: R,
    ) -> Result<Self, ConfigError>
    where
        R: Fn(&ViewState) + Send + 'static,
    {
        let pipeline = TermPipeline::new(config, classifier, image_search)?;
        let (state_tx, state) = watch::channel(ViewState::default());
        let alive = Arc::new(AtomicBool::new(true));
        let render_gate = Arc::new(Mutex::new(()));

        let subscription = pipeline.on_update({
            let alive = Arc::clone(&alive);
            let render_gate = Arc::clone(&render_gate);
            move |snapshot| {
                let _gate = render_gate.lock().unwrap_or_else(PoisonError::into_inner);
                if !alive.load(Ordering::Acquire) {
                    return;
                }

                let view_state = ViewState::from_snapshot(snapshot);
                state_tx.send_replace(view_state.clone());

                if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| render(&view_state))) {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_default();
                    tracing::error!("[VIEW] render callback panicked: {message}");
                }
            }
        });

        Ok(Self {
            pipeline,
            subscription,
            state,
            alive,
            render_gate,
        })
    }

    /// View without a render callback, read through [`PipelineView::state`] or [`PipelineView::changed`]
    pub fn headless(
        config: PipelineConfig,
        classifier: Arc<dyn Classifier>,
        image_search: Arc<dyn ImageSearch>,
    ) -> Result<Self, ConfigError> {
        Self::new(config, classifier, image_search, |_| {})
    }

    /// Empty input means "no terms"
    pub fn set_input(&self, text: &str) {
        if !self.is_alive() {
            return;
        }
        if text.trim().is_empty() {
            self.pipeline.reset();
        } else {
            self.pipeline.process_input(text);
        }
    }

    /// Explicit "process now", bypassing the debounce
    pub fn process_now(&self, text: &str) {
        if !self.is_alive() {
            return;
        }
        if text.trim().is_empty() {
            self.pipeline.reset();
        } else {
            self.pipeline.process_input_immediate(text);
        }
    }

    pub fn search_images(&self, index: usize) {
        if self.is_alive() {
            self.pipeline.search_images_for_term(index);
        }
    }

    pub fn search_all_images(&self) {
        if self.is_alive() {
            self.pipeline.search_all_images();
        }
    }

    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn counts(&self) -> ViewCounts {
        self.state.borrow().counts
    }

    /// Next snapshot, or `None` after teardown
    pub async fn changed(&mut self) -> Option<ViewState> {
        if !self.is_alive() {
            return None;
        }
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Wait for a state matching `done`; returns the last state if the pipeline goes away first
    pub async fn wait_until<P>(&mut self, done: P) -> ViewState
    where
        P: Fn(&ViewState) -> bool,
    {
        loop {
            let current = self.state.borrow_and_update().clone();
            if done(&current) || !self.is_alive() || self.state.changed().await.is_err() {
                return current;
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Destroy the pipeline. Only the first call has an effect.
    ///
    /// Waits for a render already in progress; none starts after this returns.
    pub fn teardown(&self) {
        {
            let _gate = self.render_gate.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.alive.swap(false, Ordering::AcqRel) {
                return;
            }
        }
        tracing::debug!("[VIEW] teardown");
        self.pipeline.unsubscribe(self.subscription);
        self.pipeline.destroy();
    }
}

impl Drop for PipelineView {
    fn drop(&mut self) {
        self.teardown();
    }
}
