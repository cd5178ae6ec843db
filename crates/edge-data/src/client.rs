//! Origin fetch client with bounded retries.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use edge_core::EdgeResponse;
use edge_observability::StructuredLogger;

use crate::retry::RetryPolicy;
use crate::sleep::Sleeper;

/// Error type for fetch operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Origin server returned status {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Fetch failed after {} attempts: {last}", .attempts.len())]
    Exhausted {
        attempts: Vec<FetchAttempt>,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Attempts recorded before giving up (empty for single-attempt errors).
    pub fn attempts(&self) -> &[FetchAttempt] {
        match self {
            Self::Exhausted { attempts, .. } => attempts,
            _ => &[],
        }
    }

    /// The last underlying failure.
    pub fn last_error(&self) -> &FetchError {
        match self {
            Self::Exhausted { last, .. } => last.last_error(),
            other => other,
        }
    }
}

/// Outcome of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx response.
    Success(u16),
    /// Non-2xx response.
    HttpStatus(u16),
    /// The request never produced a response.
    Network(String),
}

impl AttemptOutcome {
    fn from_error(error: &FetchError) -> Self {
        match error {
            FetchError::Http { status, .. } => Self::HttpStatus(*status),
            other => Self::Network(other.to_string()),
        }
    }
}

/// Record of one iteration of the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    /// 0 for the initial attempt.
    pub index: u32,
    /// Delay applied before this attempt.
    pub delay: Duration,
    /// What happened.
    pub outcome: AttemptOutcome,
}

/// Sends a single GET to the origin.
///
/// Implementations return `Ok` for any HTTP response, whatever its status;
/// status classification belongs to [`FetchClient`].
#[async_trait(?Send)]
pub trait OriginClient {
    /// Perform a GET request.
    async fn get(&self, url: &str) -> Result<EdgeResponse, FetchError>;
}

/// Outbound HTTP through the Spin host.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinOriginClient;

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl OriginClient for SpinOriginClient {
    async fn get(&self, url: &str) -> Result<EdgeResponse, FetchError> {
        let request = spin_sdk::http::Request::get(url).build();
        let response: spin_sdk::http::Response = spin_sdk::http::send(request)
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = *response.status();
        let headers: Vec<(String, String)> = response
            .headers()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        Ok(EdgeResponse::from_parts(status, headers, response.into_body()))
    }
}

/// Platform fetch client.
///
/// Wraps an [`OriginClient`] with the retry loop: every attempt yields a
/// `Result`, and any `Err` (transport failure or non-2xx status) consumes
/// one unit of retry budget.
pub struct FetchClient<C, S> {
    client: C,
    sleeper: S,
    policy: RetryPolicy,
    logger: StructuredLogger,
}

impl<C, S> FetchClient<C, S>
where
    C: OriginClient,
    S: Sleeper,
{
    /// Create a new fetch client with the default retry policy.
    pub fn new(client: C, sleeper: S, logger: &StructuredLogger) -> Self {
        Self {
            client,
            sleeper,
            policy: RetryPolicy::default(),
            logger: logger.for_component("origin-fetcher"),
        }
    }

    /// Set the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url`, retrying failures with backoff.
    ///
    /// Returns the first 2xx response. When every attempt fails the error is
    /// [`FetchError::Exhausted`], carrying the attempt log and the last failure.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<EdgeResponse, FetchError> {
        let mut attempts = Vec::new();
        let mut index = 0;
        let mut delay = Duration::ZERO;

        let last = loop {
            let error = match self.attempt(url).await {
                Ok(response) => {
                    attempts.push(FetchAttempt {
                        index,
                        delay,
                        outcome: AttemptOutcome::Success(response.status),
                    });
                    self.logger
                        .debug_builder("Origin fetch succeeded")
                        .field_u64("status", u64::from(response.status))
                        .field_u64("attempts", attempts.len() as u64)
                        .emit();
                    return Ok(response);
                }
                Err(error) => error,
            };

            self.logger
                .warn_builder("Origin fetch attempt failed")
                .field_u64("attempt", u64::from(index))
                .field("error", error.to_string())
                .emit();
            attempts.push(FetchAttempt {
                index,
                delay,
                outcome: AttemptOutcome::from_error(&error),
            });

            if !self.policy.should_retry(index) {
                break error;
            }

            index += 1;
            delay = self.policy.backoff.delay_for_retry(index);
            self.logger
                .info_builder("Retrying fetch")
                .field_u64("attempt", u64::from(index))
                .duration_ms("delay_ms", delay)
                .emit();
            self.sleeper.sleep(delay).await;
        };

        self.logger
            .error_builder("Fetch failed after retries")
            .field_u64("retries", u64::from(self.policy.max_retries))
            .field("error", last.to_string())
            .emit();

        Err(FetchError::Exhausted {
            attempts,
            last: Box::new(last),
        })
    }

    async fn attempt(&self, url: &str) -> Result<EdgeResponse, FetchError> {
        let response = self.client.get(url).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(FetchError::Http {
                status: response.status,
                url: url.to_string(),
            })
        }
    }
}

/// Origin that replays a fixed script of results (for development/testing).
///
/// Once the script runs out every call returns the fallback result. Clones
/// share the script and the call counter.
#[derive(Debug, Clone)]
pub struct ScriptedOrigin {
    script: Rc<RefCell<VecDeque<Result<EdgeResponse, FetchError>>>>,
    fallback: Rc<Result<EdgeResponse, FetchError>>,
    calls: Rc<Cell<u32>>,
}

impl ScriptedOrigin {
    /// Origin that fails every call with a connection error.
    pub fn failing() -> Self {
        Self::with_fallback(Err(FetchError::Connection("origin unreachable".to_string())))
    }

    /// Origin that answers every call with `response`.
    pub fn always(response: EdgeResponse) -> Self {
        Self::with_fallback(Ok(response))
    }

    fn with_fallback(fallback: Result<EdgeResponse, FetchError>) -> Self {
        Self {
            script: Rc::new(RefCell::new(VecDeque::new())),
            fallback: Rc::new(fallback),
            calls: Rc::new(Cell::new(0)),
        }
    }

    /// Queue a result ahead of the fallback.
    pub fn then(self, result: Result<EdgeResponse, FetchError>) -> Self {
        self.script.borrow_mut().push_back(result);
        self
    }

    /// Number of requests made so far.
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

#[async_trait(?Send)]
impl OriginClient for ScriptedOrigin {
    async fn get(&self, _url: &str) -> Result<EdgeResponse, FetchError> {
        self.calls.set(self.calls.get() + 1);
        let next = self.script.borrow_mut().pop_front();
        next.unwrap_or_else(|| (*self.fallback).clone())
    }
}
