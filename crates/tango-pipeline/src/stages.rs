use std::future::Future;

use tango_config::RetryConfig;
use tango_core::EnrichError;
use tokio::sync::Semaphore;

use crate::fence::Fence;

/// Identifies the term a stage task was scheduled for
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StageTicket {
    pub generation: u64,
    pub index: usize,
    pub key: String,
    /// Image-search attempt number; unused for classification
    pub attempt: u32,
}

/// Completion of one stage task, routed back to the engine
#[derive(Debug)]
pub(crate) struct StageResult<T> {
    pub ticket: StageTicket,
    pub result: Result<T, EnrichError>,
}

/// Run one collaborator call under a concurrency permit and the retry policy.
///
/// Returns `None` without calling the collaborator once `generation` has been
/// superseded; the check runs after the permit is acquired and before every attempt.
pub(crate) async fn run_stage<T, F, Fut>(
    stage: &'static str,
    fence: &Fence,
    generation: u64,
    permits: &Semaphore,
    retry: &RetryConfig,
    mut call: F,
) -> Option<Result<T, EnrichError>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EnrichError>>,
{
    let mut attempt = 1;

    loop {
        let permit = permits.acquire().await.ok()?;

        if !fence.is_current(generation) {
            tracing::trace!(stage, generation, "[STAGE] superseded before call");
            return None;
        }

        let result = call().await;
        drop(permit);

        match result {
            Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                attempt += 1;
                tracing::debug!(stage, generation, attempt, "[STAGE] retrying after {e}");
                tokio::time::sleep(retry.backoff(attempt)).await;
            }
            result => return Some(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            backoff_ms: 10,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn skips_call_for_superseded_generation() {
        let fence = Fence::default();
        let generation = fence.advance();
        fence.advance();
        let permits = Semaphore::new(1);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let out = run_stage("test", &fence, generation, &permits, &retry(1), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, EnrichError>(())
        })
        .await;

        assert!(out.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_only() {
        let fence = Fence::default();
        let generation = fence.advance();
        let permits = Semaphore::new(1);
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let out = run_stage("test", &fence, generation, &permits, &retry(3), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(EnrichError::Network("reset".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(out, Some(Ok(2)));

        calls.store(0, Ordering::SeqCst);
        let out = run_stage("test", &fence, generation, &permits, &retry(3), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(EnrichError::Api("bad request".into()))
        })
        .await;
        assert_eq!(out, Some(Err(EnrichError::Api("bad request".into()))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_permits_abandon_the_call() {
        let fence = Fence::default();
        let generation = fence.advance();
        let permits = Semaphore::new(1);
        permits.close();

        let out = run_stage("test", &fence, generation, &permits, &retry(1), || async {
            Ok::<_, EnrichError>(())
        })
        .await;
        assert!(out.is_none());
    }
}
