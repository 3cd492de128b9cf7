//! Merchant-level post-transfer automation.
//!
//! When a payment completes for a merchant, the dispatcher reads that
//! merchant's hook configuration and runs the configured follow-on actions
//! in a fixed order: notify, then rebalance, then swap. Each action is
//! best-effort in isolation — a failed webhook or rebalance is logged and
//! skipped, never raised — but the call awaits all of them before
//! returning, so the returned tag list is complete.
//!
//! Rebalance and swap reuse the orchestrator by composition: the dispatcher
//! holds a reference and calls its public `initiate`, forming a recursive
//! but non-cyclic flow (the rebalance transfer is a new, independent
//! transfer).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use super::{ExecutionTiming, HookId, HookMetadata, HookType, derive_hook_id};
use crate::events::{EventNotifier, EventPayload, LifecycleEvent};
use crate::orchestrator::{CrossChainTransferResult, TransferOptions, TransferOrchestrator};

/// Per-merchant hook configuration.
///
/// Longer-lived than any transfer: created by merchant administration, read
/// whenever a payment completes for that merchant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MerchantHookConfig {
    pub merchant_id: String,
    pub webhook_url: Option<Url>,
    /// Chain to forward received funds to after each payment.
    pub rebalance_target: Option<String>,
    /// Token to swap received funds into on the destination chain.
    pub auto_swap_token: Option<String>,
    pub custom_hook_contract: Option<alloy::primitives::Address>,
}

/// Load/save boundary for merchant hook configuration.
///
/// An explicit store passed in at construction — deliberately not a global
/// registry. Read-mostly: configuration updates are administrator-driven
/// and never contended by the transfer path.
pub trait MerchantConfigStore: Send + Sync {
    fn load(&self, merchant_id: &str) -> Option<MerchantHookConfig>;
    fn save(&self, config: MerchantHookConfig);
}

/// In-memory merchant config store.
#[derive(Default)]
pub struct InMemoryMerchantStore {
    configs: RwLock<HashMap<String, MerchantHookConfig>>,
}

impl InMemoryMerchantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configs(configs: impl IntoIterator<Item = MerchantHookConfig>) -> Self {
        let store = Self::new();
        for config in configs {
            store.save(config);
        }
        store
    }
}

impl MerchantConfigStore for InMemoryMerchantStore {
    fn load(&self, merchant_id: &str) -> Option<MerchantHookConfig> {
        self.configs
            .read()
            .ok()
            .and_then(|configs| configs.get(merchant_id).cloned())
    }

    fn save(&self, config: MerchantHookConfig) {
        if let Ok(mut configs) = self.configs.write() {
            configs.insert(config.merchant_id.clone(), config);
        }
    }
}

/// Tag for one executed hook, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutedHook {
    Notification,
    Rebalance(HookId),
    Swap(HookId),
}

impl Display for ExecutedHook {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Notification => write!(f, "NOTIFICATION"),
            Self::Rebalance(id) => write!(f, "REBALANCE:{id}"),
            Self::Swap(id) => write!(f, "SWAP:{id}"),
        }
    }
}

/// Runs a merchant's configured hooks against a completed transfer.
pub struct HookDispatcher {
    orchestrator: Arc<TransferOrchestrator>,
    store: Arc<dyn MerchantConfigStore>,
    notifier: Arc<dyn EventNotifier>,
}

impl HookDispatcher {
    pub fn new(
        orchestrator: Arc<TransferOrchestrator>,
        store: Arc<dyn MerchantConfigStore>,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self {
        Self {
            orchestrator,
            store,
            notifier,
        }
    }

    /// Executes the merchant's hooks for a completed, attested transfer.
    ///
    /// Order is fixed: notify, rebalance, swap. Returns one tag per hook
    /// that ran; hooks that fail are logged and omitted.
    pub async fn dispatch(
        &self,
        merchant_id: &str,
        transfer: &CrossChainTransferResult,
    ) -> Vec<ExecutedHook> {
        let Some(config) = self.store.load(merchant_id) else {
            debug!(merchant_id, "No hook configuration for merchant");
            return Vec::new();
        };

        let mut executed = Vec::new();

        if let Some(webhook_url) = &config.webhook_url {
            self.notify(webhook_url, transfer).await;
            executed.push(ExecutedHook::Notification);
        }

        if let Some(target) = &config.rebalance_target {
            match self.rebalance(target, transfer).await {
                Some(hook_id) => executed.push(ExecutedHook::Rebalance(hook_id)),
                None => warn!(merchant_id, target, "Rebalance hook did not complete"),
            }
        }

        if let Some(token) = &config.auto_swap_token {
            executed.push(ExecutedHook::Swap(self.swap(token, transfer)));
        }

        if config.custom_hook_contract.is_some() {
            // Custom hooks execute on the destination contract itself; the
            // client has nothing to run here.
            debug!(merchant_id, "Custom hook configured; executed onchain");
        }

        info!(
            merchant_id,
            transfer = %transfer.id,
            hooks = executed.len(),
            "Dispatched merchant hooks"
        );

        executed
    }

    /// Fire-and-forget webhook delivery; failures are the notifier's to log.
    async fn notify(&self, url: &Url, transfer: &CrossChainTransferResult) {
        let payload = EventPayload::new(LifecycleEvent::Completed, transfer.record(), None);

        self.notifier.notify_url(url, &payload).await;
    }

    /// Initiates a new transfer forwarding the received funds to the
    /// merchant's target chain. The new transfer carries a rebalance hook
    /// payload, so its result's hook id tags this execution.
    async fn rebalance(
        &self,
        target: &str,
        transfer: &CrossChainTransferResult,
    ) -> Option<HookId> {
        let metadata = HookMetadata::new(HookType::Rebalance, ExecutionTiming::PostMint);

        let options = TransferOptions {
            hook_data: Some(metadata.encode()),
            ..TransferOptions::default()
        };

        let result = self
            .orchestrator
            .initiate(
                &transfer.destination_chain,
                target,
                &transfer.amount.to_string(),
                transfer.recipient,
                transfer.recipient,
                options,
            )
            .await;

        match result {
            Ok(rebalance) => rebalance.hook_id,
            Err(err) => {
                warn!(%err, target, "Rebalance transfer failed");
                None
            }
        }
    }

    /// Derives the swap hook id. The swap itself runs on an external DEX
    /// integration; only the correlation id is produced here.
    fn swap(&self, token: &str, transfer: &CrossChainTransferResult) -> HookId {
        let metadata = HookMetadata::new(HookType::Swap, ExecutionTiming::PostMint);
        let payload = metadata.encode();

        debug!(
            token,
            payload_len = payload.len(),
            "Prepared swap hook payload"
        );

        derive_hook_id(
            &transfer.source_chain,
            &transfer.destination_chain,
            transfer.message_hash,
        )
    }
}
