//! Shared fixtures for transfer and hook scenario tests: a scripted ledger
//! gateway, a recording notifier, and an orchestrator harness wired to an
//! httpmock attestation service.

// Not every test crate uses every fixture.
#![allow(dead_code)]

use alloy::primitives::{Address, B256, Bytes, Log, TxHash, U256};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use httpmock::prelude::*;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

use stablebridge::events::{EventNotifier, EventPayload};
use stablebridge::gateway::{
    BurnCall, BurnConfirmation, FinalityMode, GatewayError, IMessageTransmitter, LedgerGateway,
};
use stablebridge::attestation::AttestationClient;
use stablebridge::orchestrator::TransferOrchestrator;
use stablebridge::registry::{ChainDescriptor, ChainRegistry};

pub fn chain(name: &str, chain_id: u64, domain: u32, fast: bool) -> ChainDescriptor {
    ChainDescriptor {
        name: name.to_string(),
        chain_id,
        rpc_url: "http://localhost:8545".parse().unwrap(),
        domain,
        token_messenger: Address::repeat_byte(0x01),
        message_transmitter: Address::repeat_byte(0x02),
        token_minter: Address::repeat_byte(0x03),
        usdc: Address::repeat_byte(0x04),
        supports_burn: true,
        supports_mint: true,
        supports_fast_transfer: fast,
    }
}

pub fn registry() -> Arc<ChainRegistry> {
    Arc::new(
        ChainRegistry::new(vec![
            chain("ethereum", 1, 0, true),
            chain("base", 8453, 6, true),
            chain("arbitrum", 42161, 3, false),
        ])
        .unwrap(),
    )
}

/// Scripted [`LedgerGateway`]: fixed balances, recorded submissions, and a
/// counter for every chain interaction.
pub struct MockGateway {
    pub balance: U256,
    pub allowance: U256,
    pub omit_message_log: bool,
    pub fail_mint: AtomicBool,
    pub network_calls: AtomicUsize,
    pub burns: Mutex<Vec<BurnCall>>,
    pub mints: Mutex<Vec<(String, FinalityMode)>>,
}

impl MockGateway {
    /// A gateway with ample funds and approvals.
    pub fn rich() -> Self {
        Self {
            balance: U256::from(1_000_000_000_000u64),
            allowance: U256::from(1_000_000_000_000u64),
            omit_message_log: false,
            fail_mint: AtomicBool::new(false),
            network_calls: AtomicUsize::new(0),
            burns: Mutex::new(Vec::new()),
            mints: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.network_calls.load(Ordering::Relaxed)
    }

    fn count(&self) {
        self.network_calls.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn balance_of(
        &self,
        _chain: &ChainDescriptor,
        _owner: Address,
    ) -> Result<U256, GatewayError> {
        self.count();
        Ok(self.balance)
    }

    async fn allowance(
        &self,
        _chain: &ChainDescriptor,
        _owner: Address,
    ) -> Result<U256, GatewayError> {
        self.count();
        Ok(self.allowance)
    }

    async fn approve(
        &self,
        _chain: &ChainDescriptor,
        _amount: U256,
    ) -> Result<TxHash, GatewayError> {
        self.count();
        Ok(TxHash::repeat_byte(0xaa))
    }

    async fn submit_burn(
        &self,
        chain: &ChainDescriptor,
        burn: BurnCall,
    ) -> Result<BurnConfirmation, GatewayError> {
        self.count();

        let mut burns = self.burns.lock().unwrap();
        let index = burns.len() as u8;
        burns.push(burn);

        let logs = if self.omit_message_log {
            Vec::new()
        } else {
            let event = IMessageTransmitter::MessageSent {
                message: Bytes::from(format!("protocol-message-{index}").into_bytes()),
            };
            vec![Log {
                address: chain.message_transmitter,
                data: event.encode_log_data(),
            }]
        };

        Ok(BurnConfirmation {
            tx_hash: TxHash::repeat_byte(0x10 + index),
            logs,
        })
    }

    async fn submit_mint(
        &self,
        chain: &ChainDescriptor,
        _message: Bytes,
        _attestation: Bytes,
        finality: FinalityMode,
    ) -> Result<TxHash, GatewayError> {
        self.count();

        if self.fail_mint.load(Ordering::Relaxed) {
            return Err(GatewayError::Rejected {
                reason: "mint reverted".to_string(),
            });
        }

        self.mints
            .lock()
            .unwrap()
            .push((chain.name.clone(), finality));

        Ok(TxHash::repeat_byte(0xbb))
    }
}

/// Records every lifecycle event and targeted webhook call.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<String>>,
    pub webhook_calls: Mutex<Vec<(Url, String)>>,
}

#[async_trait]
impl EventNotifier for RecordingNotifier {
    async fn notify(&self, payload: &EventPayload) {
        self.events
            .lock()
            .unwrap()
            .push(payload.event.as_str().to_string());
    }

    async fn notify_url(&self, url: &Url, payload: &EventPayload) {
        self.webhook_calls
            .lock()
            .unwrap()
            .push((url.clone(), payload.event.as_str().to_string()));
    }
}

pub struct Harness {
    pub orchestrator: Arc<TransferOrchestrator>,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<RecordingNotifier>,
    // Held so the attestation endpoint outlives the orchestrator.
    _attestation_server: MockServer,
}

impl Harness {
    /// Orchestrator over the given gateway, with an attestation service
    /// that answers "complete" immediately.
    pub fn with_gateway(gateway: MockGateway) -> Self {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_contains("/attestations/");
            then.status(200).json_body(serde_json::json!({
                "status": "complete",
                "attestation": "a1b2c3d4",
                "message": "0102030405060708",
            }));
        });

        let gateway = Arc::new(gateway);
        let notifier = Arc::new(RecordingNotifier::default());

        let attestation_client =
            Arc::new(AttestationClient::new(server.base_url().parse().unwrap()).unwrap());

        let orchestrator = Arc::new(TransferOrchestrator::new(
            registry(),
            Arc::clone(&gateway) as Arc<dyn LedgerGateway>,
            attestation_client,
            Arc::clone(&notifier) as Arc<dyn EventNotifier>,
        ));

        Self {
            orchestrator,
            gateway,
            notifier,
            _attestation_server: server,
        }
    }

    pub fn new() -> Self {
        Self::with_gateway(MockGateway::rich())
    }

    pub fn recorded_events(&self) -> Vec<String> {
        self.notifier.events.lock().unwrap().clone()
    }
}

pub fn recipient() -> Address {
    Address::repeat_byte(0x99)
}

pub fn sender() -> Address {
    Address::repeat_byte(0x88)
}

#[allow(dead_code)]
pub fn message_hash_of(index: u8) -> B256 {
    alloy::primitives::keccak256(format!("protocol-message-{index}").as_bytes())
}
