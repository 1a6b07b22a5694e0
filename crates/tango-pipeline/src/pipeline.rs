use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use kanal::AsyncSender;
use tango_config::ConfigError;
use tango_config::pipeline::PipelineConfig;
use tango_core::{Classifier, ImageSearch};
use tango_types::Snapshot;

use crate::engine::{Command, Engine};
use crate::fence::Fence;

/// Snapshot callback. Runs on the engine task and must not panic.
pub type Subscriber = Box<dyn Fn(&Snapshot) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Handle to a running term pipeline.
///
/// Every operation only enqueues a command for the engine task, so calls never
/// block and may be made from inside a subscriber callback. Clones share the
/// same engine; dropping the last clone destroys it. Subscribers are owned by
/// the engine, so a callback that needs the pipeline should hold a
/// [`WeakTermPipeline`] rather than a clone.
#[derive(Clone)]
pub struct TermPipeline {
    inner: Arc<Handle>,
}

struct Handle {
    tx: AsyncSender<Command>,
    destroyed: Arc<AtomicBool>,
    fence: Fence,
    next_subscription: AtomicU64,
}

/// Non-owning handle, see [`TermPipeline::downgrade`]
#[derive(Clone)]
pub struct WeakTermPipeline {
    inner: Weak<Handle>,
}

impl WeakTermPipeline {
    /// `None` once every strong handle is gone
    pub fn upgrade(&self) -> Option<TermPipeline> {
        self.inner.upgrade().map(|inner| TermPipeline { inner })
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if !self.destroyed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.try_send(Command::Destroy);
        }
    }
}

impl TermPipeline {
    /// Validate `config` and start the engine. Must be called inside a Tokio runtime.
    pub fn new(
        config: PipelineConfig,
        classifier: Arc<dyn Classifier>,
        image_search: Arc<dyn ImageSearch>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let (tx, rx) = kanal::unbounded_async();
        let fence = Fence::default();
        let destroyed = Arc::new(AtomicBool::new(false));

        let engine = Engine::new(
            config,
            classifier,
            image_search,
            fence.clone(),
            destroyed.clone(),
            tx.clone(),
            rx,
        );
        tokio::spawn(engine.run());

        Ok(Self {
            inner: Arc::new(Handle {
                tx,
                destroyed,
                fence,
                next_subscription: AtomicU64::new(0),
            }),
        })
    }

    /// Debounced: bursts within the debounce window collapse into one round for the last text
    pub fn process_input(&self, text: impl Into<String>) {
        self.send(Command::Process {
            text: text.into(),
            debounced: true,
        });
    }

    /// Process now, superseding any pending debounced input
    pub fn process_input_immediate(&self, text: impl Into<String>) {
        self.send(Command::Process {
            text: text.into(),
            debounced: false,
        });
    }

    /// Start an image search for the term at `index` if it is `ready`,
    /// or re-submit it after a failed image search
    pub fn search_images_for_term(&self, index: usize) {
        self.send(Command::SearchImages { index });
    }

    /// Image search for every term currently `ready`
    pub fn search_all_images(&self) {
        self.send(Command::SearchAllImages);
    }

    /// Register a callback receiving the full term list after every state transition.
    ///
    /// A callback capturing a strong [`TermPipeline`] keeps the engine alive
    /// until [`TermPipeline::destroy`] is called; capture [`TermPipeline::downgrade`] instead.
    pub fn on_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Snapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.send(Command::Subscribe {
            id,
            callback: Box::new(callback),
        });
        id
    }

    pub fn downgrade(&self) -> WeakTermPipeline {
        WeakTermPipeline {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.send(Command::Unsubscribe { id });
    }

    /// Drop all terms; in-flight results of earlier generations are discarded on arrival
    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    /// Stop the engine and drop all subscribers. Idempotent.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.inner.tx.try_send(Command::Destroy).is_err() {
            tracing::debug!("[PIPELINE] engine already gone");
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Generation of the most recent processing round
    pub fn generation(&self) -> u64 {
        self.inner.fence.current()
    }

    fn send(&self, command: Command) {
        if self.is_destroyed() {
            return;
        }
        if self.inner.tx.try_send(command).is_err() {
            tracing::debug!("[PIPELINE] engine gone, command dropped");
        }
    }
}
