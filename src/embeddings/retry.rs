//! Batch embedding with retry, backoff and cancellation.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::RetryConfig;
use super::provider::EmbeddingProvider;
use crate::error::{Result, RetrievalError};
use crate::metrics::RetrievalMetrics;

/// Embed a whole batch, retrying failed provider calls with exponential backoff.
///
/// The returned vectors are checked for count and for a single shared length.
/// Cancellation via `cancel` or the configured deadline yields
/// [`RetrievalError::Cancelled`].
pub async fn embed_with_retry(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    retry: &RetryConfig,
    cancel: &CancellationToken,
    metrics: &RetrievalMetrics,
) -> Result<Vec<Vec<f32>>> {
    let attempts = embed_attempts(provider, texts, retry, cancel, metrics);

    let vectors = match retry.timeout_ms {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), attempts)
            .await
            .map_err(|_| {
                warn!(
                    provider = provider.provider_name(),
                    timeout_ms = ms,
                    "Embedding deadline elapsed"
                );
                RetrievalError::Cancelled
            })??,
        None => attempts.await?,
    };

    check_batch(texts.len(), &vectors)?;
    Ok(vectors)
}

async fn embed_attempts(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    retry: &RetryConfig,
    cancel: &CancellationToken,
    metrics: &RetrievalMetrics,
) -> Result<Vec<Vec<f32>>> {
    let max_attempts = retry.max_attempts.max(1);
    let mut backoff = retry.initial_backoff_ms;
    let mut attempt = 1;

    loop {
        metrics.embedding_requests.inc();
        let start = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetrievalError::Cancelled),
            outcome = provider.embed(texts) => outcome,
        };
        metrics.embedding_latency.observe(start.elapsed().as_secs_f64());

        match outcome {
            Ok(vectors) => {
                debug!(
                    provider = provider.provider_name(),
                    texts = texts.len(),
                    attempt,
                    "Embedded batch"
                );
                return Ok(vectors);
            }
            Err(e) if attempt >= max_attempts => {
                return Err(RetrievalError::embedding(
                    e.context(format!("giving up after {} attempts", attempt)),
                ));
            }
            Err(e) => {
                warn!(
                    provider = provider.provider_name(),
                    "Embedding request failed (attempt {}): {:#}", attempt, e
                );
                metrics.embedding_retries.inc();

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(RetrievalError::Cancelled),
                    _ = tokio::time::sleep(Duration::from_millis(backoff)) => {}
                }

                backoff = (backoff as f64 * retry.exponential_base) as u64;
                backoff = backoff.min(retry.max_backoff_ms);
                attempt += 1;
            }
        }
    }
}

/// One vector per text, all of the same length
fn check_batch(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(RetrievalError::EmbeddingFailure(format!(
            "provider returned {} vectors for {} texts",
            vectors.len(),
            expected
        )));
    }

    if let Some(first) = vectors.first() {
        if let Some(bad) = vectors.iter().find(|v| v.len() != first.len()) {
            return Err(RetrievalError::DimensionMismatch {
                expected: first.len(),
                actual: bad.len(),
            });
        }
    }

    Ok(())
}
