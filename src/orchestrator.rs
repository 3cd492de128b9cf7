//! Transfer orchestration: burn, attestation wait, mint.
//!
//! A cross-chain transfer is a strictly ordered pipeline — burn on the
//! source chain, wait for the attestation service to certify the burn, mint
//! on the destination chain. The orchestrator sequences those stages, emits
//! a progress event at every transition, and returns a resumable
//! [`CrossChainTransferResult`] between attestation and mint so the two
//! halves can be signed by different parties or sessions.
//!
//! # State flow
//!
//! ```text
//! Burning --> WaitingAttestation --> ReadyToMint --> Minting --> Completed
//!    |               |                    |             |
//!    +---------------+--------Failed------+-------------+
//! ```
//!
//! No state is re-enterable; `ReadyToMint` is the only state legally
//! resumable across process boundaries, via the returned result value.
//!
//! Independent transfers share nothing but the immutable chain registry, so
//! any number may run concurrently without coordination. Retries live in
//! exactly one place: the attestation poll loop. Burn and mint submission
//! are attempted once per call, and a failed mint never invalidates the
//! attestation — calling [`TransferOrchestrator::complete`] again with the
//! same result is safe because the bridge contract rejects replayed
//! messages.

use alloy::primitives::{Address, B256, Bytes, TxHash, U256};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::amount::Usdc;
use crate::attestation::{AttestationClient, AttestationPoller, AttestationQuery};
use crate::error::TransferError;
use crate::events::{EventMetadata, EventNotifier, EventPayload, LifecycleEvent, TransferRecord};
use crate::gateway::{
    BurnCall, BurnVariant, FAST_FINALITY_THRESHOLD, FinalityMode, LedgerGateway,
    extract_protocol_message,
};
use crate::hooks::{HookId, derive_hook_id};
use crate::registry::{ChainDescriptor, ChainRegistry};

/// Attestation wait bound for fast-finality transfers.
pub const FAST_ATTESTATION_BUDGET: Duration = Duration::from_secs(3 * 60);

/// Attestation wait bound for standard transfers. An order of magnitude
/// longer than the fast path: the service only attests at finalized depth.
pub const STANDARD_ATTESTATION_BUDGET: Duration = Duration::from_secs(30 * 60);

/// Max fee for fast-finality burns, in basis points of the amount.
const FAST_TRANSFER_FEE_BPS: u64 = 1;

/// Default gas ceiling for hook-carrying burns; the destination-side hook
/// bookkeeping makes them heavier than plain burns.
const HOOK_BURN_GAS_LIMIT: u64 = 500_000;

// Attestation polling reports into the 30-70% band of overall progress.
const ATTESTATION_BAND_START: f64 = 30.0;
const ATTESTATION_BAND_WIDTH: f64 = 40.0;

const PROGRESS_CHANNEL_CAPACITY: usize = 256;

/// Unique identifier for one orchestrated transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TransferId(pub Uuid);

impl Display for TransferId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(value)?))
    }
}

/// Pipeline stage of a transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferStep {
    Burning,
    WaitingAttestation,
    ReadyToMint,
    Minting,
    Completed,
    Failed,
}

/// Durable status of a transfer, carried by the resumption token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Attested,
    Completed,
    Failed,
}

/// One observational progress emission. Never stored by the orchestrator;
/// persistence is the subscriber's concern.
#[derive(Debug, Clone, Serialize)]
pub struct TransferProgress {
    pub step: TransferStep,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    pub percent: u8,
    pub elapsed: Duration,
}

/// Per-call transfer configuration.
///
/// A hook payload takes strict precedence over the fast-finality flag:
/// hook-carrying burns are never issued on the fast path.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    pub use_fast_transfer: bool,
    pub hook_data: Option<Bytes>,
    pub gas_limit: Option<u64>,
}

/// The resumable transfer handle returned once burn and attestation have
/// succeeded.
///
/// Serializable so the "ready to mint" pause point can span processes or
/// signers; [`TransferOrchestrator::complete`] consumes it by value-copy and
/// returns an updated result rather than mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrossChainTransferResult {
    pub id: TransferId,
    pub source_chain: String,
    pub destination_chain: String,
    pub amount: Usdc,
    pub recipient: Address,
    pub sender: Address,
    pub source_tx_hash: TxHash,
    pub message_hash: B256,
    pub destination_tx_hash: Option<TxHash>,
    pub status: TransferStatus,
    pub attestation: Option<Bytes>,
    pub hook_id: Option<HookId>,
    /// Effective transfer mode after capability gating; drives the choice
    /// of receive variant at mint time.
    pub use_fast_transfer: bool,
    pub enable_hooks: bool,
    pub estimated_completion: Option<DateTime<Utc>>,
}

impl CrossChainTransferResult {
    /// Event-payload snapshot of this result.
    pub fn record(&self) -> TransferRecord {
        TransferRecord {
            id: self.id,
            message_hash: Some(self.message_hash),
            source_chain: self.source_chain.clone(),
            destination_chain: self.destination_chain.clone(),
            amount: self.amount.to_string(),
            recipient: self.recipient,
            sender: Some(self.sender),
            status: self.status,
            source_transaction_hash: Some(self.source_tx_hash),
            destination_transaction_hash: self.destination_tx_hash,
            use_fast_transfer: self.use_fast_transfer,
            enable_hooks: self.enable_hooks,
            hook_id: self.hook_id,
        }
    }
}

/// Sequences burn, attestation wait, and mint for cross-chain transfers.
pub struct TransferOrchestrator {
    registry: Arc<ChainRegistry>,
    gateway: Arc<dyn LedgerGateway>,
    attestation_client: Arc<AttestationClient>,
    poller: AttestationPoller,
    notifier: Arc<dyn EventNotifier>,
    progress: broadcast::Sender<TransferProgress>,
}

impl TransferOrchestrator {
    pub fn new(
        registry: Arc<ChainRegistry>,
        gateway: Arc<dyn LedgerGateway>,
        attestation_client: Arc<AttestationClient>,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self {
        let (progress, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        let poller = AttestationPoller::new(Arc::clone(&attestation_client));

        Self {
            registry,
            gateway,
            attestation_client,
            poller,
            notifier,
            progress,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = self.poller.with_interval(interval);
        self
    }

    /// Subscribes to the progress stream. Emissions for one transfer are
    /// ordered; no ordering is guaranteed across concurrent transfers.
    pub fn subscribe(&self) -> broadcast::Receiver<TransferProgress> {
        self.progress.subscribe()
    }

    /// Burns on the source chain and waits for the attestation.
    ///
    /// Returns an `Attested` result carrying everything [`Self::complete`]
    /// needs; minting may happen later, elsewhere, with a different signer
    /// bound into that session's gateway.
    pub async fn initiate(
        &self,
        source: &str,
        destination: &str,
        amount: &str,
        recipient: Address,
        sender: Address,
        options: TransferOptions,
    ) -> Result<CrossChainTransferResult, TransferError> {
        let started = Instant::now();

        let mut record = TransferRecord {
            id: TransferId(Uuid::new_v4()),
            message_hash: None,
            source_chain: source.to_string(),
            destination_chain: destination.to_string(),
            amount: amount.to_string(),
            recipient,
            sender: Some(sender),
            status: TransferStatus::Pending,
            source_transaction_hash: None,
            destination_transaction_hash: None,
            use_fast_transfer: options.use_fast_transfer,
            enable_hooks: options.hook_data.is_some(),
            hook_id: None,
        };

        match self
            .run_initiate(&mut record, recipient, sender, &options, started)
            .await
        {
            Ok(result) => Ok(result),
            Err(err) => {
                self.fail(&mut record, &err, 0, started).await;
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn run_initiate(
        &self,
        record: &mut TransferRecord,
        recipient: Address,
        sender: Address,
        options: &TransferOptions,
        started: Instant,
    ) -> Result<CrossChainTransferResult, TransferError> {
        let source_chain = self.require_chain(&record.source_chain)?;
        let destination_chain = self.require_chain(&record.destination_chain)?;

        // Capability flags gate which code paths are legal for a chain.
        if !source_chain.supports_burn {
            return Err(TransferError::UnsupportedChain {
                chain: source_chain.name.clone(),
            });
        }
        if !destination_chain.supports_mint {
            return Err(TransferError::UnsupportedChain {
                chain: destination_chain.name.clone(),
            });
        }

        let amount: Usdc = record.amount.parse()?;
        let units = amount.to_base_units()?;

        self.publish(LifecycleEvent::Initiated, record, None).await;

        let balance = self.gateway.balance_of(source_chain, sender).await?;
        if balance < units {
            return Err(TransferError::InsufficientBalance {
                required: units,
                available: balance,
            });
        }

        let allowance = self.gateway.allowance(source_chain, sender).await?;
        if allowance < units {
            return Err(TransferError::InsufficientAllowance {
                required: units,
                available: allowance,
            });
        }

        self.emit(
            TransferStep::Burning,
            format!("Burning {amount} on {}", source_chain.name),
            None,
            10,
            started,
        );
        self.publish(
            LifecycleEvent::Burning,
            record,
            Some(EventMetadata::with_progress(10)),
        )
        .await;

        // Strict variant precedence: hooks > fast-finality > standard. The
        // fast path additionally requires the capability on both chains and
        // falls back silently when either side lacks it.
        let fast_path = options.use_fast_transfer
            && source_chain.supports_fast_transfer
            && destination_chain.supports_fast_transfer;

        let (variant, gas_limit) = match &options.hook_data {
            Some(payload) => (
                BurnVariant::WithHook {
                    payload: payload.clone(),
                },
                Some(options.gas_limit.unwrap_or(HOOK_BURN_GAS_LIMIT)),
            ),
            None if fast_path => (
                BurnVariant::FastFinality {
                    max_fee: units * U256::from(FAST_TRANSFER_FEE_BPS) / U256::from(10_000u64),
                    min_finality_threshold: FAST_FINALITY_THRESHOLD,
                },
                options.gas_limit,
            ),
            None => (BurnVariant::Standard, options.gas_limit),
        };

        let hooks_used = matches!(variant, BurnVariant::WithHook { .. });
        let effective_fast = fast_path && !hooks_used;
        record.use_fast_transfer = effective_fast;

        let confirmation = self
            .gateway
            .submit_burn(
                source_chain,
                BurnCall {
                    amount: units,
                    destination_domain: destination_chain.domain,
                    recipient,
                    variant,
                    gas_limit,
                },
            )
            .await?;

        // A receipt without the relay's event means a misconfigured contract
        // or ABI mismatch, not transient unavailability. Fatal.
        let message =
            extract_protocol_message(&confirmation).ok_or(TransferError::MessageNotFound)?;

        let hook_id = hooks_used.then(|| {
            derive_hook_id(&record.source_chain, &record.destination_chain, message.hash)
        });

        record.source_transaction_hash = Some(confirmation.tx_hash);
        record.message_hash = Some(message.hash);
        record.hook_id = hook_id;

        info!(
            transfer = %record.id,
            tx_hash = %confirmation.tx_hash,
            message_hash = %message.hash,
            fast = effective_fast,
            hooks = hooks_used,
            "Burn confirmed"
        );

        self.emit(
            TransferStep::WaitingAttestation,
            "Waiting for attestation".to_string(),
            Some(confirmation.tx_hash),
            30,
            started,
        );
        self.publish(
            LifecycleEvent::AttestationPending,
            record,
            Some(EventMetadata::with_progress(30)),
        )
        .await;

        let budget = if effective_fast {
            FAST_ATTESTATION_BUDGET
        } else {
            STANDARD_ATTESTATION_BUDGET
        };
        let estimated_completion = Utc::now() + TimeDelta::seconds(budget.as_secs() as i64);

        let query = AttestationQuery {
            message_hash: message.hash,
            source_domain: Some(source_chain.domain),
            tx_hash: Some(confirmation.tx_hash),
        };

        let progress = self.progress.clone();
        let burn_tx = confirmation.tx_hash;
        let attestation = self
            .poller
            .poll(&query, budget, move |fraction| {
                let percent = (ATTESTATION_BAND_START + fraction * ATTESTATION_BAND_WIDTH).round();
                let _ = progress.send(TransferProgress {
                    step: TransferStep::WaitingAttestation,
                    message: "Waiting for attestation".to_string(),
                    tx_hash: Some(burn_tx),
                    percent: percent as u8,
                    elapsed: started.elapsed(),
                });
            })
            .await?;

        record.status = TransferStatus::Attested;

        self.emit(
            TransferStep::ReadyToMint,
            "Attestation received; ready to mint".to_string(),
            Some(burn_tx),
            75,
            started,
        );
        self.publish(
            LifecycleEvent::ReadyToMint,
            record,
            Some(EventMetadata::with_progress(75)),
        )
        .await;

        Ok(CrossChainTransferResult {
            id: record.id,
            source_chain: record.source_chain.clone(),
            destination_chain: record.destination_chain.clone(),
            amount,
            recipient,
            sender,
            source_tx_hash: burn_tx,
            message_hash: message.hash,
            destination_tx_hash: None,
            status: TransferStatus::Attested,
            attestation: Some(attestation.attestation),
            hook_id: record.hook_id,
            use_fast_transfer: effective_fast,
            enable_hooks: hooks_used,
            estimated_completion: Some(estimated_completion),
        })
    }

    /// Submits the mint for an attested transfer.
    ///
    /// Safe to retry with the same result: there is no local replay guard,
    /// and the bridge contract rejects duplicate messages.
    pub async fn complete(
        &self,
        result: &CrossChainTransferResult,
    ) -> Result<CrossChainTransferResult, TransferError> {
        let started = Instant::now();
        let mut record = result.record();

        match self.run_complete(result, &mut record, started).await {
            Ok(completed) => Ok(completed),
            Err(err) => {
                self.fail(&mut record, &err, 80, started).await;
                Err(err)
            }
        }
    }

    async fn run_complete(
        &self,
        result: &CrossChainTransferResult,
        record: &mut TransferRecord,
        started: Instant,
    ) -> Result<CrossChainTransferResult, TransferError> {
        let attestation = result
            .attestation
            .clone()
            .ok_or(TransferError::AttestationMissing)?;

        let destination_chain = self.require_chain(&result.destination_chain)?;

        self.emit(
            TransferStep::Minting,
            format!("Minting on {}", destination_chain.name),
            Some(result.source_tx_hash),
            80,
            started,
        );
        self.publish(
            LifecycleEvent::Minting,
            record,
            Some(EventMetadata::with_progress(80)),
        )
        .await;

        let message = self
            .attestation_client
            .fetch_message_bytes(result.message_hash)
            .await?;

        let finality = if result.use_fast_transfer {
            FinalityMode::Unfinalized
        } else {
            FinalityMode::Finalized
        };

        let mint_tx = self
            .gateway
            .submit_mint(destination_chain, message, attestation, finality)
            .await
            .map_err(TransferError::Mint)?;

        let mut completed = result.clone();
        completed.destination_tx_hash = Some(mint_tx);
        completed.status = TransferStatus::Completed;

        record.destination_transaction_hash = Some(mint_tx);
        record.status = TransferStatus::Completed;

        info!(transfer = %record.id, %mint_tx, "Transfer completed");

        self.emit(
            TransferStep::Completed,
            "Transfer completed".to_string(),
            Some(mint_tx),
            100,
            started,
        );
        self.publish(
            LifecycleEvent::Completed,
            record,
            Some(EventMetadata::with_progress(100)),
        )
        .await;

        Ok(completed)
    }

    /// Burn, wait, and mint in one call.
    ///
    /// Pure sequential composition of [`Self::initiate`] and
    /// [`Self::complete`]; if initiation fails, no mint is attempted.
    pub async fn auto_complete(
        &self,
        source: &str,
        destination: &str,
        amount: &str,
        recipient: Address,
        sender: Address,
        options: TransferOptions,
    ) -> Result<CrossChainTransferResult, TransferError> {
        let attested = self
            .initiate(source, destination, amount, recipient, sender, options)
            .await?;

        self.complete(&attested).await
    }

    /// Best-effort status for a message hash against the attestation
    /// service. Reporting convenience only — never fails, never
    /// authoritative.
    pub async fn status(&self, message_hash: B256) -> TransferProgress {
        match self.attestation_client.fetch_status(message_hash).await {
            Ok(status) if status == "complete" => TransferProgress {
                step: TransferStep::Completed,
                message: "Attestation issued".to_string(),
                tx_hash: None,
                percent: 100,
                elapsed: Duration::ZERO,
            },
            Ok(status) => TransferProgress {
                step: TransferStep::WaitingAttestation,
                message: format!("Attestation status: {status}"),
                tx_hash: None,
                percent: 50,
                elapsed: Duration::ZERO,
            },
            Err(err) => TransferProgress {
                step: TransferStep::Failed,
                message: format!("Status query failed: {err}"),
                tx_hash: None,
                percent: 0,
                elapsed: Duration::ZERO,
            },
        }
    }

    fn require_chain(&self, name: &str) -> Result<&ChainDescriptor, TransferError> {
        self.registry
            .get(name)
            .ok_or_else(|| TransferError::UnsupportedChain {
                chain: name.to_string(),
            })
    }

    fn emit(
        &self,
        step: TransferStep,
        message: String,
        tx_hash: Option<TxHash>,
        percent: u8,
        started: Instant,
    ) {
        let _ = self.progress.send(TransferProgress {
            step,
            message,
            tx_hash,
            percent,
            elapsed: started.elapsed(),
        });
    }

    async fn publish(
        &self,
        event: LifecycleEvent,
        record: &TransferRecord,
        metadata: Option<EventMetadata>,
    ) {
        self.notifier
            .notify(&EventPayload::new(event, record.clone(), metadata))
            .await;
    }

    async fn fail(
        &self,
        record: &mut TransferRecord,
        err: &TransferError,
        percent: u8,
        started: Instant,
    ) {
        warn!(transfer = %record.id, %err, "Transfer failed");

        record.status = TransferStatus::Failed;

        self.emit(
            TransferStep::Failed,
            err.to_string(),
            record.source_transaction_hash,
            percent,
            started,
        );
        self.publish(
            LifecycleEvent::Failed,
            record,
            Some(EventMetadata::with_error(err.to_string())),
        )
        .await;
    }
}
