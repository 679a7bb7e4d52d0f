/// Worker retry/timeout engine
///
/// Uniform envelope wrapped around every unit of domain work:
/// validate, race against a deadline, retry transient failures with
/// capped exponential backoff, and record the outcome on the
/// execution record. Only the domain closure differs per worker.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::errors::{AgentError, AgentResult, RecordedError};
use crate::execution::{ExecutionRecord, ExecutionState, StepInfo, StepState};
use crate::logger::{self, LogTag};

/// Invoked after every recorded step so callers can observe state
/// transitions and the errors list as they happen
pub type ProgressCallback = Arc<dyn Fn(&ExecutionRecord) + Send + Sync>;

/// Backoff delay for the given retry (1-based):
/// min(initial * multiplier^(retry-1), max_delay), then +-10% jitter.
pub fn backoff_delay(config: &WorkerConfig, retry_count: u32) -> Duration {
    let exponent = retry_count.saturating_sub(1);
    let base = config.initial_delay_ms as f64 * config.backoff_multiplier.powi(exponent as i32);
    let capped = base.min(config.max_delay_ms as f64);
    let jitter = rand::thread_rng().gen_range(0.9..=1.1);
    Duration::from_millis((capped * jitter) as u64)
}

/// Run one worker step under the retry/timeout envelope.
///
/// The closure is re-invoked on each retry; whatever the timed-out
/// attempt eventually resolves to is dropped with its future, never
/// acted upon. On success a `success` step is appended with the
/// serialized result; on terminal failure a `failed` step plus a
/// recorded error land on the record, the record flips to `failed`,
/// and the error propagates to the coordinator.
pub async fn execute_step<T, F, Fut>(
    record: &mut ExecutionRecord,
    worker: &'static str,
    step_name: &str,
    config: &WorkerConfig,
    progress_after: u8,
    progress: Option<&ProgressCallback>,
    op: F,
) -> AgentResult<T>
where
    T: Serialize,
    F: Fn() -> Fut,
    Fut: Future<Output = AgentResult<T>>,
{
    let started = Instant::now();
    let mut retry_count: u32 = 0;

    loop {
        let attempt = retry_count + 1;
        logger::debug(
            LogTag::Worker,
            "STEP_ATTEMPT",
            &format!(
                "worker={} step={} attempt={}/{}",
                worker,
                step_name,
                attempt,
                config.max_retries + 1
            ),
        );

        let outcome = match tokio::time::timeout(config.timeout(), op()).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout {
                seconds: config.timeout_ms / 1_000,
            }),
        };

        match outcome {
            Ok(value) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let result_json = serde_json::to_value(&value).ok();
                record.add_step(StepInfo {
                    id: Uuid::new_v4().to_string(),
                    name: step_name.to_string(),
                    state: StepState::Success,
                    timestamp: Utc::now(),
                    duration_ms,
                    result: result_json,
                    error: None,
                });
                record.set_progress(progress_after);
                if let Some(callback) = progress {
                    callback(record);
                }
                logger::debug(
                    LogTag::Worker,
                    "STEP_SUCCESS",
                    &format!(
                        "worker={} step={} duration_ms={} retries={}",
                        worker, step_name, duration_ms, retry_count
                    ),
                );
                return Ok(value);
            }
            Err(err) => {
                if err.is_retryable() && retry_count < config.max_retries {
                    retry_count += 1;
                    let delay = backoff_delay(config, retry_count);
                    logger::warning(
                        LogTag::Worker,
                        "STEP_RETRY",
                        &format!(
                            "worker={} step={} retry={}/{} delay_ms={} error={}",
                            worker,
                            step_name,
                            retry_count,
                            config.max_retries,
                            delay.as_millis(),
                            err
                        ),
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                let duration_ms = started.elapsed().as_millis() as u64;
                record.add_step(StepInfo {
                    id: Uuid::new_v4().to_string(),
                    name: step_name.to_string(),
                    state: StepState::Failed,
                    timestamp: Utc::now(),
                    duration_ms,
                    result: None,
                    error: Some(err.to_string()),
                });
                record.add_error(RecordedError::from_error(
                    &err,
                    retry_count,
                    config.max_retries,
                    Some(serde_json::json!({ "worker": worker, "step": step_name })),
                ));
                record.set_state(ExecutionState::Failed);
                if let Some(callback) = progress {
                    callback(record);
                }
                logger::error(
                    LogTag::Worker,
                    "STEP_FAILED",
                    &format!(
                        "worker={} step={} retries={} code={} error={}",
                        worker,
                        step_name,
                        retry_count,
                        err.code(),
                        err
                    ),
                );
                return Err(err);
            }
        }
    }
}
