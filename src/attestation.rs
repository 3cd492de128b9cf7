//! Attestation service client and the bounded polling loop.
//!
//! The attestation service is eventually consistent and must be polled, not
//! pushed to. [`AttestationClient`] normalizes the service's responses into
//! three outcomes: attested (`Ok(Some)`), not yet available (`Ok(None)`),
//! and hard transport failure (`Err`). [`AttestationPoller`] wraps the
//! client in a fixed-interval retry loop where only the total-wait bound is
//! a terminal failure; everything else means "keep waiting".
//!
//! The wait bound differs by transfer mode (short for fast-finality, an
//! order of magnitude longer for standard) and is supplied by the caller so
//! that policy never leaks into the loop itself.

use alloy::primitives::{B256, Bytes, TxHash};
use backon::{ConstantBuilder, Retryable};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Default delay between poll attempts. Deliberately coarser than the
/// service's issuance latency to bound external call volume.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Progress fraction ceiling while attestation is still outstanding. The
/// remaining slice is reported exactly once, on true success.
const PENDING_PROGRESS_CEILING: f64 = 0.95;

/// A signed attestation together with the message bytes it certifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub message: Bytes,
    pub attestation: Bytes,
}

/// Lookup key for one attestation: the protocol message hash, optionally
/// narrowed by source domain and burn transaction hash.
#[derive(Debug, Clone)]
pub struct AttestationQuery {
    pub message_hash: B256,
    pub source_domain: Option<u32>,
    pub tx_hash: Option<TxHash>,
}

#[derive(Deserialize, Debug)]
struct AttestationEntry {
    status: String,
    attestation: Option<String>,
    message: Option<String>,
}

/// HTTP client for the attestation service.
pub struct AttestationClient {
    http_client: reqwest::Client,
    api_base: Url,
}

impl AttestationClient {
    pub fn new(api_base: Url) -> Result<Self, AttestationError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            api_base,
        })
    }

    fn attestation_url(&self, query: &AttestationQuery) -> String {
        let mut url = format!("{}attestations/{}", self.api_base, query.message_hash);

        let mut separator = '?';
        if let Some(domain) = query.source_domain {
            url.push_str(&format!("{separator}sourceDomain={domain}"));
            separator = '&';
        }
        if let Some(tx_hash) = query.tx_hash {
            url.push_str(&format!("{separator}transactionHash={tx_hash}"));
        }

        url
    }

    async fn fetch_entry(
        &self,
        query: &AttestationQuery,
    ) -> Result<Option<AttestationEntry>, AttestationError> {
        let url = self.attestation_url(query);
        let response = self.http_client.get(&url).send().await?;

        // 404 means the service has not yet observed the burn.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(AttestationError::Status {
                status: response.status().as_u16(),
            });
        }

        Ok(Some(response.json().await?))
    }

    /// Fetches the attestation for a message, if the service has issued it.
    ///
    /// `Ok(None)` means "not yet available" — distinct from a transport
    /// error and from any definitive negative (the service never issues
    /// one; the poller's timeout is the only terminal negative).
    pub async fn fetch_attestation(
        &self,
        query: &AttestationQuery,
    ) -> Result<Option<Attestation>, AttestationError> {
        let Some(entry) = self.fetch_entry(query).await? else {
            return Ok(None);
        };

        if entry.status != "complete" {
            debug!(status = %entry.status, "Attestation not yet issued");
            return Ok(None);
        }

        let attestation_hex = entry.attestation.as_ref().ok_or(AttestationError::MissingField {
            field: "attestation",
        })?;
        let message_hex = entry
            .message
            .as_ref()
            .ok_or(AttestationError::MissingField { field: "message" })?;

        Ok(Some(Attestation {
            message: Bytes::from(alloy::hex::decode(message_hex)?),
            attestation: Bytes::from(alloy::hex::decode(attestation_hex)?),
        }))
    }

    /// Resolves the raw message bytes for an already-attested message hash.
    pub async fn fetch_message_bytes(&self, message_hash: B256) -> Result<Bytes, AttestationError> {
        let query = AttestationQuery {
            message_hash,
            source_domain: None,
            tx_hash: None,
        };

        match self.fetch_attestation(&query).await? {
            Some(attestation) => Ok(attestation.message),
            None => Err(AttestationError::MessageUnavailable { message_hash }),
        }
    }

    /// Best-effort status string for a message hash.
    pub async fn fetch_status(&self, message_hash: B256) -> Result<String, AttestationError> {
        let query = AttestationQuery {
            message_hash,
            source_domain: None,
            tx_hash: None,
        };

        match self.fetch_entry(&query).await? {
            Some(entry) => Ok(entry.status),
            None => Ok("pending_confirmations".to_string()),
        }
    }
}

/// Transport and decoding errors from the attestation service.
///
/// These never surface through the poller; only [`AttestationTimeout`] does.
#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("attestation service returned HTTP {status}")]
    Status { status: u16 },
    #[error("invalid hex encoding: {0}")]
    HexDecode(#[from] alloy::hex::FromHexError),
    #[error("attestation response missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("message bytes not available for {message_hash}")]
    MessageUnavailable { message_hash: B256 },
}

/// Terminal failure of a polling run: the total wait bound was exhausted.
#[derive(Debug, thiserror::Error)]
#[error("attestation not available after {attempts} attempts over {elapsed:?}")]
pub struct AttestationTimeout {
    pub elapsed: Duration,
    pub attempts: usize,
}

#[derive(Debug, thiserror::Error)]
enum PollRetry {
    #[error("attestation not ready")]
    NotReady,
    #[error(transparent)]
    Transient(AttestationError),
}

/// Fixed-interval retry loop over the attestation client.
pub struct AttestationPoller {
    client: std::sync::Arc<AttestationClient>,
    interval: Duration,
}

impl AttestationPoller {
    pub fn new(client: std::sync::Arc<AttestationClient>) -> Self {
        Self {
            client,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Polls until the attestation is issued or `max_wait` elapses.
    ///
    /// `on_progress` receives a monotone fraction: linear in elapsed time,
    /// capped at 0.95 while pending, and exactly once `1.0` on success.
    /// "Not ready" responses and transient client errors are swallowed;
    /// only the wait bound fails the call.
    pub async fn poll(
        &self,
        query: &AttestationQuery,
        max_wait: Duration,
        mut on_progress: impl FnMut(f64),
    ) -> Result<Attestation, AttestationTimeout> {
        let started = Instant::now();
        let attempts = AtomicUsize::new(1);

        let max_retries = (max_wait.as_secs_f64() / self.interval.as_secs_f64()).ceil() as usize;

        let backoff = ConstantBuilder::default()
            .with_delay(self.interval)
            .with_max_times(max_retries);

        info!(
            message_hash = %query.message_hash,
            ?max_wait,
            interval = ?self.interval,
            "Polling for attestation"
        );

        let fetch = || async {
            match self.client.fetch_attestation(query).await {
                Ok(Some(attestation)) => Ok(attestation),
                Ok(None) => Err(PollRetry::NotReady),
                Err(err) => Err(PollRetry::Transient(err)),
            }
        };

        let on_progress_ref = &mut on_progress;
        let result = fetch
            .retry(backoff)
            .notify(|err, dur| {
                attempts.fetch_add(1, Ordering::Relaxed);

                let fraction = (started.elapsed().as_secs_f64() / max_wait.as_secs_f64())
                    .min(PENDING_PROGRESS_CEILING);
                on_progress_ref(fraction);

                match err {
                    PollRetry::NotReady => debug!(?dur, "Attestation pending, retrying"),
                    PollRetry::Transient(err) => {
                        warn!(?err, ?dur, "Attestation fetch failed, retrying");
                    }
                }
            })
            .await;

        match result {
            Ok(attestation) => {
                on_progress(1.0);
                info!(
                    message_hash = %query.message_hash,
                    attempts = attempts.load(Ordering::Relaxed),
                    elapsed = ?started.elapsed(),
                    "Attestation received"
                );
                Ok(attestation)
            }
            Err(_) => Err(AttestationTimeout {
                elapsed: started.elapsed(),
                attempts: attempts.load(Ordering::Relaxed),
            }),
        }
    }
}
