//! Lifecycle events and their external delivery.
//!
//! The orchestrator reports every state transition twice: as a
//! [`TransferProgress`](crate::orchestrator::TransferProgress) value on its
//! broadcast stream, and as a JSON payload handed to an [`EventNotifier`]
//! for webhook delivery. Delivery is fire-and-forget — failures are logged
//! and never propagate into the transfer pipeline.

use alloy::primitives::{Address, B256, TxHash};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::hooks::HookId;
use crate::orchestrator::{TransferId, TransferStatus, TransferStep};

/// Closed set of lifecycle event names on the webhook wire.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum LifecycleEvent {
    #[serde(rename = "transfer.initiated")]
    Initiated,
    #[serde(rename = "transfer.burning")]
    Burning,
    #[serde(rename = "transfer.attestation_pending")]
    AttestationPending,
    #[serde(rename = "transfer.ready_to_mint")]
    ReadyToMint,
    #[serde(rename = "transfer.minting")]
    Minting,
    #[serde(rename = "transfer.completed")]
    Completed,
    #[serde(rename = "transfer.failed")]
    Failed,
}

impl LifecycleEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initiated => "transfer.initiated",
            Self::Burning => "transfer.burning",
            Self::AttestationPending => "transfer.attestation_pending",
            Self::ReadyToMint => "transfer.ready_to_mint",
            Self::Minting => "transfer.minting",
            Self::Completed => "transfer.completed",
            Self::Failed => "transfer.failed",
        }
    }
}

impl From<TransferStep> for LifecycleEvent {
    fn from(step: TransferStep) -> Self {
        match step {
            TransferStep::Burning => Self::Burning,
            TransferStep::WaitingAttestation => Self::AttestationPending,
            TransferStep::ReadyToMint => Self::ReadyToMint,
            TransferStep::Minting => Self::Minting,
            TransferStep::Completed => Self::Completed,
            TransferStep::Failed => Self::Failed,
        }
    }
}

/// Transfer snapshot embedded in every event payload.
///
/// Evolves through the pipeline: early events carry no message hash or
/// transaction hashes yet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: TransferId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_hash: Option<B256>,
    pub source_chain: String,
    pub destination_chain: String,
    pub amount: String,
    pub recipient: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<Address>,
    pub status: TransferStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_transaction_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_transaction_hash: Option<TxHash>,
    pub use_fast_transfer: bool,
    pub enable_hooks: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_id: Option<HookId>,
}

/// Optional event context outside the transfer snapshot itself.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,
}

impl EventMetadata {
    pub fn with_progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// The JSON body delivered to webhook consumers.
#[derive(Debug, Clone, Serialize)]
pub struct EventPayload {
    pub event: LifecycleEvent,
    pub timestamp: DateTime<Utc>,
    pub transfer: TransferRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,
}

impl EventPayload {
    pub fn new(
        event: LifecycleEvent,
        transfer: TransferRecord,
        metadata: Option<EventMetadata>,
    ) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
            transfer,
            metadata,
        }
    }
}

/// Receives lifecycle events for external delivery.
///
/// Consumed by the orchestrator and the hook dispatcher; implementations
/// must never let delivery failures escape.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    /// Delivers to the notifier's configured sink, if any.
    async fn notify(&self, payload: &EventPayload);

    /// Delivers to an explicit per-merchant webhook endpoint.
    async fn notify_url(&self, url: &Url, payload: &EventPayload);
}

/// HTTP webhook delivery with a bounded request timeout.
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    endpoint: Option<Url>,
}

impl WebhookNotifier {
    pub fn new(endpoint: Option<Url>) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }
}

#[async_trait]
impl EventNotifier for WebhookNotifier {
    async fn notify(&self, payload: &EventPayload) {
        if let Some(endpoint) = &self.endpoint {
            self.notify_url(endpoint, payload).await;
        }
    }

    async fn notify_url(&self, url: &Url, payload: &EventPayload) {
        match self.http_client.post(url.clone()).json(payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(event = payload.event.as_str(), %url, "Webhook delivered");
            }
            Ok(response) => {
                warn!(
                    event = payload.event.as_str(),
                    %url,
                    status = response.status().as_u16(),
                    "Webhook endpoint rejected event"
                );
            }
            Err(err) => {
                warn!(event = payload.event.as_str(), %url, %err, "Webhook delivery failed");
            }
        }
    }
}

/// No-op notifier for callers without webhook configuration.
pub struct NullNotifier;

#[async_trait]
impl EventNotifier for NullNotifier {
    async fn notify(&self, _payload: &EventPayload) {}

    async fn notify_url(&self, _url: &Url, _payload: &EventPayload) {}
}
