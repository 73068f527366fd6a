//! The resource client: every journal operation goes through one retry loop.
//!
//! # Design
//! `JournalClient` pairs a `JournalCodec` (request building, response
//! validation) with a `Transport` (one round-trip) and a `RetryPolicy`.
//! The loop in `send` is the only place that knows about attempts,
//! deadlines and backoff. Validation runs after the loop, so a malformed
//! body is reported once and never retried.
//!
//! The client holds no mutable state; clones share the transport's
//! connection pool.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::codec::JournalCodec;
use crate::config::{ClientConfig, ConfigError};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::retry::RetryPolicy;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Entry, EntryDraft, ProfileUpdate};

#[derive(Debug, Clone)]
pub struct JournalClient<T = ReqwestTransport> {
    codec: JournalCodec,
    policy: RetryPolicy,
    transport: T,
}

impl JournalClient<ReqwestTransport> {
    /// Build a client over a fresh reqwest connection pool.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        Self::with_transport(config, ReqwestTransport::new())
    }
}

impl<T: Transport> JournalClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            codec: JournalCodec::new(&config.base_address),
            policy: RetryPolicy::from_config(config),
            transport,
        })
    }

    pub fn codec(&self) -> &JournalCodec {
        &self.codec
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn list_entries(&self, token: &str) -> Result<Vec<Entry>, ApiError> {
        let response = self.send(self.codec.build_list_entries(token)).await?;
        self.codec.parse_list_entries(response)
    }

    pub async fn get_entry(&self, token: &str, id: &str) -> Result<Entry, ApiError> {
        let response = self.send(self.codec.build_get_entry(token, id)).await?;
        self.codec.parse_get_entry(response)
    }

    /// Callers are expected to pass a draft built with `EntryDraft::new`.
    pub async fn create_entry(&self, token: &str, draft: &EntryDraft) -> Result<(), ApiError> {
        let request = self.codec.build_create_entry(token, draft)?;
        let response = self.send(request).await?;
        self.codec.parse_ack(response)
    }

    pub async fn update_entry(
        &self,
        token: &str,
        id: &str,
        draft: &EntryDraft,
    ) -> Result<(), ApiError> {
        let request = self.codec.build_update_entry(token, id, draft)?;
        let response = self.send(request).await?;
        self.codec.parse_ack(response)
    }

    /// Deleting an id that no longer exists is an `Http` 404, not a success.
    pub async fn delete_entry(&self, token: &str, id: &str) -> Result<(), ApiError> {
        let response = self.send(self.codec.build_delete_entry(token, id)).await?;
        self.codec.parse_ack(response)
    }

    pub async fn get_greeting(&self, token: &str) -> Result<String, ApiError> {
        let response = self.send(self.codec.build_get_greeting(token)).await?;
        self.codec.parse_greeting(response)
    }

    pub async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<(), ApiError> {
        let request = self.codec.build_update_profile(token, update)?;
        let response = self.send(request).await?;
        self.codec.parse_ack(response)
    }

    pub async fn delete_account(&self, token: &str) -> Result<(), ApiError> {
        let response = self.send(self.codec.build_delete_account(token)).await?;
        self.codec.parse_ack(response)
    }

    /// Single greeting attempt bounded by `limit`, without retries. For
    /// callers that treat the greeting as optional.
    pub async fn get_greeting_once(&self, token: &str, limit: Duration) -> Result<String, ApiError> {
        let response = self.attempt(&self.codec.build_get_greeting(token), limit).await?;
        self.codec.parse_greeting(response)
    }

    /// Run `request` through the retry loop and return the first 2xx
    /// response, or the error from the last permitted attempt.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let max_retries = self.policy.max_retries;
        let mut last_error = ApiError::Transport("no attempt was made".to_string());

        for attempt in 0..=max_retries {
            debug!(
                method = %request.method,
                url = %request.path,
                attempt,
                "sending request"
            );

            match self.attempt(&request, self.policy.timeout).await {
                Ok(response) => {
                    debug!(status = response.status, attempt, "request succeeded");
                    return Ok(response);
                }
                Err(err) => last_error = err,
            }

            if attempt == max_retries {
                break;
            }

            let delay = self.policy.backoff_delay(attempt);
            warn!(
                method = %request.method,
                url = %request.path,
                attempt,
                error = %last_error,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "request failed, retrying"
            );
            sleep(delay).await;
        }

        Err(last_error)
    }

    /// One round-trip bounded by `limit`. Non-2xx statuses are errors.
    async fn attempt(&self, request: &HttpRequest, limit: Duration) -> Result<HttpResponse, ApiError> {
        match timeout(limit, self.transport.execute(request.clone())).await {
            Ok(Ok(response)) if response.is_success() => Ok(response),
            Ok(Ok(response)) => Err(ApiError::Http {
                status: response.status,
                body: response.body,
            }),
            Ok(Err(err)) => Err(ApiError::from(err)),
            Err(_) => Err(ApiError::Timeout {
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
