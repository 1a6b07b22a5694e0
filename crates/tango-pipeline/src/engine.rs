use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kanal::{AsyncReceiver, AsyncSender};
use tango_config::pipeline::PipelineConfig;
use tango_core::{Classification, Classifier, ImageSearch, parse_record, split_records};
use tango_types::{FailureStage, ImageRef, Snapshot, Term, TermStatus};
use tokio::sync::Semaphore;

use crate::debounce::Debouncer;
use crate::fence::Fence;
use crate::pipeline::{Subscriber, SubscriptionId};
use crate::stages::{StageResult, StageTicket, run_stage};

pub(crate) enum Command {
    Process { text: String, debounced: bool },
    DebounceElapsed { ticket: u64 },
    SearchImages { index: usize },
    SearchAllImages,
    Reset,
    Destroy,
    Subscribe { id: SubscriptionId, callback: Subscriber },
    Unsubscribe { id: SubscriptionId },
    Classified(StageResult<Classification>),
    ImageFound(StageResult<ImageRef>),
}

/// Owns the term list. Runs as a single task; everything that touches terms
/// happens inside [`Engine::handle`].
pub(crate) struct Engine {
    config: PipelineConfig,
    classifier: Arc<dyn Classifier>,
    image_search: Arc<dyn ImageSearch>,
    fence: Fence,
    destroyed: Arc<AtomicBool>,
    terms: Vec<Term>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    debouncer: Debouncer,
    classify_permits: Arc<Semaphore>,
    search_permits: Arc<Semaphore>,
    tx: AsyncSender<Command>,
    rx: AsyncReceiver<Command>,
}

impl Engine {
    pub fn new(
        config: PipelineConfig,
        classifier: Arc<dyn Classifier>,
        image_search: Arc<dyn ImageSearch>,
        fence: Fence,
        destroyed: Arc<AtomicBool>,
        tx: AsyncSender<Command>,
        rx: AsyncReceiver<Command>,
    ) -> Self {
        Self {
            debouncer: Debouncer::new(config.debounce()),
            classify_permits: Arc::new(Semaphore::new(config.max_concurrent_classifications)),
            search_permits: Arc::new(Semaphore::new(config.max_concurrent_searches)),
            config,
            classifier,
            image_search,
            fence,
            destroyed,
            terms: Vec::new(),
            subscribers: Vec::new(),
            tx,
            rx,
        }
    }

    pub async fn run(mut self) {
        tracing::debug!("[PIPELINE] engine started");

        while let Ok(command) = self.rx.recv().await {
            if !self.handle(command) {
                break;
            }
        }

        tracing::debug!("[PIPELINE] engine stopped");
    }

    /// Apply one command. Returns `false` once the engine should stop.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Process { text, debounced: true } => {
                self.debouncer.schedule(text, &self.tx);
            }
            Command::Process { text, debounced: false } => {
                self.debouncer.cancel();
                self.start_round(&text);
            }
            Command::DebounceElapsed { ticket } => {
                if let Some(text) = self.debouncer.fire(ticket) {
                    self.start_round(&text);
                }
            }
            Command::SearchImages { index } => self.start_image_search(index),
            Command::SearchAllImages => {
                let ready: Vec<usize> = self
                    .terms
                    .iter()
                    .filter(|t| t.status() == TermStatus::Ready)
                    .map(|t| t.index)
                    .collect();
                tracing::info!(count = ready.len(), "[PIPELINE] searching images for ready terms");
                for index in ready {
                    self.start_image_search(index);
                }
            }
            Command::Reset => {
                if self.debouncer.is_pending() {
                    tracing::debug!("[PIPELINE] reset discards pending input");
                }
                self.debouncer.cancel();
                let generation = self.fence.advance();
                self.terms.clear();
                tracing::info!(generation, "[PIPELINE] reset");
                self.publish();
            }
            Command::Destroy => {
                self.debouncer.cancel();
                self.fence.advance();
                self.terms.clear();
                self.subscribers.clear();
                self.classify_permits.close();
                self.search_permits.close();
                tracing::info!("[PIPELINE] destroyed");
                return false;
            }
            Command::Subscribe { id, callback } => self.subscribers.push((id, callback)),
            Command::Unsubscribe { id } => self.subscribers.retain(|(sub, _)| *sub != id),
            Command::Classified(done) => self.apply_classification(done),
            Command::ImageFound(done) => self.apply_image(done),
        }

        true
    }

    /// New generation: placeholders first, then per-term parse and classification
    fn start_round(&mut self, text: &str) {
        let generation = self.fence.advance();
        let records = split_records(text);
        let limit = self.config.max_terms;

        tracing::info!(generation, records = records.len(), "[PIPELINE] processing input");

        self.terms = records
            .iter()
            .map(|r| {
                let mut term = Term::new(generation, r.index, r.key.clone(), r.raw.clone());
                if r.index >= limit {
                    let _ = term.fail(
                        FailureStage::Limit,
                        format!("input exceeds the limit of {limit} terms"),
                    );
                }
                term
            })
            .collect();

        if records.len() > limit {
            tracing::warn!(limit, records = records.len(), "[PIPELINE] term limit exceeded");
        }

        self.publish();

        for record in records.iter().take(limit) {
            let term = &mut self.terms[record.index];

            match parse_record(&record.normalized) {
                Ok(fields) => {
                    term.fields = Some(fields);
                    if term.transition(TermStatus::Detecting).is_ok() {
                        self.publish();
                        self.spawn_classification(record.index);
                    }
                }
                Err(e) => {
                    tracing::debug!(index = record.index, "[PIPELINE] parse failure: {e}");
                    if term.fail(FailureStage::Parse, e.to_string()).is_ok() {
                        self.publish();
                    }
                }
            }
        }
    }

    fn spawn_classification(&self, index: usize) {
        let term = &self.terms[index];
        let Some(fields) = term.fields.clone() else {
            return;
        };

        let ticket = StageTicket {
            generation: term.generation,
            index,
            key: term.key.clone(),
            attempt: 0,
        };
        let classifier = Arc::clone(&self.classifier);
        let permits = Arc::clone(&self.classify_permits);
        let fence = self.fence.clone();
        let retry = self.config.retry.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let classifier = &classifier;
            let fields = &fields;
            let result = run_stage(
                "classify",
                &fence,
                ticket.generation,
                &permits,
                &retry,
                move || classifier.classify(fields),
            )
            .await;

            if let Some(result) = result {
                let _ = tx.send(Command::Classified(StageResult { ticket, result })).await;
            }
        });
    }

    fn apply_classification(&mut self, done: StageResult<Classification>) {
        let StageResult { ticket, result } = done;
        let auto_search = self.config.auto_search_images;

        let Some(term) = self.fresh_term(&ticket) else {
            tracing::debug!(
                generation = ticket.generation,
                index = ticket.index,
                "[PIPELINE] dropping stale classification"
            );
            return;
        };

        match result {
            Ok(classification) => {
                if term.status() != TermStatus::Detecting {
                    return;
                }
                if let Some(fields) = term.fields.as_mut() {
                    fields.fill_from(classification.fields);
                }
                term.category = Some(classification.category);
                if term.transition(TermStatus::Ready).is_err() {
                    return;
                }
                self.publish();

                if auto_search {
                    self.start_image_search(ticket.index);
                }
            }
            Err(e) => {
                tracing::warn!(index = ticket.index, "[PIPELINE] classification failed: {e}");
                if term.fail(FailureStage::Classification, e.to_string()).is_ok() {
                    self.publish();
                }
            }
        }
    }

    /// Accepts a `ready` term, or one whose previous image search failed
    fn start_image_search(&mut self, index: usize) {
        let Some(term) = self.terms.get_mut(index) else {
            tracing::debug!(index, "[PIPELINE] image search for unknown term");
            return;
        };

        let from = term.status();
        if from != TermStatus::Ready && !term.is_retryable() {
            tracing::debug!(index, status = %from, "[PIPELINE] term not ready for image search");
            return;
        }
        if term.transition(TermStatus::SearchingImages).is_err() {
            return;
        }
        term.image_attempt += 1;

        let Some(fields) = term.fields.clone() else {
            return;
        };
        let ticket = StageTicket {
            generation: term.generation,
            index,
            key: term.key.clone(),
            attempt: term.image_attempt,
        };

        self.publish();

        let image_search = Arc::clone(&self.image_search);
        let permits = Arc::clone(&self.search_permits);
        let fence = self.fence.clone();
        let retry = self.config.retry.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let image_search = &image_search;
            let fields = &fields;
            let result = run_stage(
                "image_search",
                &fence,
                ticket.generation,
                &permits,
                &retry,
                move || image_search.search_image(fields),
            )
            .await;

            if let Some(result) = result {
                let _ = tx.send(Command::ImageFound(StageResult { ticket, result })).await;
            }
        });
    }

    fn apply_image(&mut self, done: StageResult<ImageRef>) {
        let StageResult { ticket, result } = done;

        let Some(term) = self.fresh_term(&ticket) else {
            tracing::debug!(
                generation = ticket.generation,
                index = ticket.index,
                "[PIPELINE] dropping stale image result"
            );
            return;
        };

        // First fresh result for the current attempt wins
        if term.status() != TermStatus::SearchingImages || term.image_attempt != ticket.attempt {
            tracing::debug!(index = ticket.index, "[PIPELINE] dropping superseded image attempt");
            return;
        }

        let applied = match result {
            Ok(image) => term.complete_with_image(image),
            Err(e) => {
                tracing::warn!(index = ticket.index, "[PIPELINE] image search failed: {e}");
                term.fail(FailureStage::ImageSearch, e.to_string())
            }
        };

        if applied.is_ok() {
            self.publish();
        }
    }

    /// The term a completion belongs to, if its generation and key still match
    fn fresh_term(&mut self, ticket: &StageTicket) -> Option<&mut Term> {
        if !self.fence.is_current(ticket.generation) {
            return None;
        }

        self.terms
            .get_mut(ticket.index)
            .filter(|t| t.generation == ticket.generation && t.key == ticket.key)
    }

    /// Emit one full snapshot to every subscriber
    fn publish(&self) {
        if self.destroyed.load(Ordering::Acquire) {
            return;
        }

        let snapshot = Snapshot::new(self.fence.current(), self.terms.clone());
        for (_, callback) in &self.subscribers {
            if self.destroyed.load(Ordering::Acquire) {
                break;
            }
            callback(&snapshot);
        }
    }
}
