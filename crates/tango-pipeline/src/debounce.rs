use std::time::Duration;

use kanal::AsyncSender;
use tokio::task::JoinHandle;

use crate::engine::Command;

/// Single pending timer, replaced on every reschedule
pub(crate) struct Debouncer {
    delay: Duration,
    ticket: u64,
    pending: Option<String>,
    timer: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ticket: 0,
            pending: None,
            timer: None,
        }
    }

    /// Replace any pending input; the engine gets `DebounceElapsed` once the delay passes quietly
    pub fn schedule(&mut self, text: String, tx: &AsyncSender<Command>) {
        self.cancel();
        self.ticket += 1;
        self.pending = Some(text);

        let ticket = self.ticket;
        let delay = self.delay;
        let tx = tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Command::DebounceElapsed { ticket }).await;
        }));
    }

    /// Pending text, if `ticket` belongs to the latest schedule
    pub fn fire(&mut self, ticket: u64) -> Option<String> {
        if ticket != self.ticket {
            tracing::trace!(ticket, current = self.ticket, "[DEBOUNCE] outdated timer");
            return None;
        }
        self.timer = None;
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn only_latest_schedule_fires() {
        let (tx, rx) = kanal::unbounded_async::<Command>();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.schedule("a".to_string(), &tx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.schedule("b".to_string(), &tx);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let Ok(Command::DebounceElapsed { ticket }) = rx.recv().await else {
            panic!("expected a debounce tick");
        };
        assert_eq!(debouncer.fire(ticket).as_deref(), Some("b"));
        assert!(rx.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_text() {
        let (tx, rx) = kanal::unbounded_async::<Command>();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.schedule("a".to_string(), &tx);
        assert!(debouncer.is_pending());
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(rx.is_empty());
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.fire(1), None);
    }
}
