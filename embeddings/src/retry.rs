use crate::error::EmbeddingError;
use crate::provider::{EmbeddingModelInfo, EmbeddingProvider};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Exponential backoff settings for provider calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of calls, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Relative jitter applied to each delay (0.25 = ±25%)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter() -> f64 {
    0.25
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetryPolicy {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".into());
        }

        if self.base_delay_ms > self.max_delay_ms {
            return Err("base_delay_ms must not exceed max_delay_ms".into());
        }

        if !(0.0..1.0).contains(&self.jitter) {
            return Err("jitter must be in [0.0, 1.0)".into());
        }

        Ok(())
    }

    /// Delay before the retry following `attempt` (0-based), without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Delay with jitter. `seed` in `[0, 1)` maps linearly onto `[-jitter, +jitter)`.
    pub fn jittered_delay(&self, attempt: u32, seed: f64) -> Duration {
        let base = self.delay_for(attempt).as_secs_f64();
        let factor = 1.0 + self.jitter * (2.0 * seed.clamp(0.0, 1.0) - 1.0);
        Duration::from_secs_f64((base * factor).max(0.0))
    }
}

/// Jitter seed derived from the sub-second part of the wall clock.
fn clock_seed() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    f64::from(nanos % 1_000) / 1_000.0
}

/// Wraps a provider with bounded retry and cooperative cancellation.
#[derive(Clone)]
pub struct RetryingEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn model_info(&self) -> EmbeddingModelInfo {
        self.provider.model_info()
    }

    /// Embed `texts` with one provider call per attempt.
    ///
    /// Transient failures are retried up to `max_attempts` times with
    /// exponential backoff. Both the call and the backoff sleep race against
    /// `cancel`.
    pub async fn embed(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(EmbeddingError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(EmbeddingError::Cancelled),
                result = self.provider.generate_embeddings(texts) => result,
            };

            let err = match result {
                Ok(vectors) if vectors.len() == texts.len() => {
                    debug!("Generated {} embeddings", vectors.len());
                    return Ok(vectors);
                }
                Ok(vectors) => {
                    return Err(EmbeddingError::InvalidResponse(format!(
                        "expected {} embeddings, got {}",
                        texts.len(),
                        vectors.len()
                    )));
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            attempt += 1;
            if attempt >= max_attempts {
                return Err(EmbeddingError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = self.policy.jittered_delay(attempt - 1, clock_seed());
            warn!(
                "Embedding attempt {attempt}/{max_attempts} failed: {err}; retrying in {}ms",
                delay.as_millis()
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(EmbeddingError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Embed a single text, e.g. a search query.
    pub async fn embed_one(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text.to_string()], cancel).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding generated".into()))
    }
}
