//! Ledger gateway: the chain-facing capability surface.
//!
//! The orchestrator never talks to a chain directly. Everything it needs —
//! balance and allowance reads, the three burn variants, minting, and
//! protocol-message extraction from burn receipts — goes through the
//! [`LedgerGateway`] trait. The production implementation ([`EvmGateway`])
//! drives wallet-bound alloy providers; tests substitute a scripted gateway.
//!
//! Receipt waiting happens inside the gateway: `submit_burn` and
//! `submit_mint` return only once the transaction is confirmed.

mod evm;

pub use evm::EvmGateway;

use alloy::primitives::{Address, B256, Bytes, Log, TxHash, U256, keccak256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;

use crate::registry::ChainDescriptor;

sol!(
    #[sol(rpc)]
    #[allow(clippy::too_many_arguments)]
    interface ITokenMessenger {
        function depositForBurn(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold
        ) external;

        function depositForBurnWithHook(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold,
            bytes hookData
        ) external;
    }
);

sol!(
    #[sol(rpc)]
    interface IMessageTransmitter {
        event MessageSent(bytes message);

        function receiveMessage(bytes message, bytes attestation) external returns (bool);

        function receiveUnfinalizedMessage(bytes message, bytes attestation)
            external
            returns (bool);
    }
);

sol!(
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
);

/// Finality threshold requesting attestation at confirmed depth (fast path).
pub const FAST_FINALITY_THRESHOLD: u32 = 1000;

/// Finality threshold requesting attestation at finalized depth.
pub const STANDARD_FINALITY_THRESHOLD: u32 = 2000;

/// Which burn entry point a transfer uses.
///
/// Strict precedence is decided by the orchestrator: hook-carrying burns win
/// over fast-finality burns, which win over standard burns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurnVariant {
    Standard,
    FastFinality {
        max_fee: U256,
        min_finality_threshold: u32,
    },
    WithHook {
        payload: Bytes,
    },
}

/// One burn submission, fully resolved by the orchestrator.
#[derive(Debug, Clone)]
pub struct BurnCall {
    /// Amount in token base units (6 decimals).
    pub amount: U256,
    /// Destination chain's protocol domain id.
    pub destination_domain: u32,
    /// Mint recipient on the destination chain.
    pub recipient: Address,
    pub variant: BurnVariant,
    /// Explicit gas ceiling; `None` lets the provider estimate.
    pub gas_limit: Option<u64>,
}

/// Confirmed burn transaction: hash plus the receipt's raw logs.
///
/// The protocol message is extracted from the logs by the orchestrator via
/// [`extract_protocol_message`]; a receipt without the well-known event is a
/// fatal configuration error, not a gateway failure.
#[derive(Debug, Clone)]
pub struct BurnConfirmation {
    pub tx_hash: TxHash,
    pub logs: Vec<Log>,
}

/// The canonical protocol message emitted by a burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMessage {
    pub bytes: Bytes,
    pub hash: B256,
}

/// Which receive entry point a mint uses on the destination relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalityMode {
    /// Standard transfers: the relay requires source-chain finality.
    Finalized,
    /// Fast transfers: the relay accepts the attested lower threshold.
    Unfinalized,
}

/// Chain-facing primitives consumed by the orchestrator.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Bridged-token balance of `owner` in base units.
    async fn balance_of(
        &self,
        chain: &ChainDescriptor,
        owner: Address,
    ) -> Result<U256, GatewayError>;

    /// Allowance granted by `owner` to the chain's burn-initiator contract.
    async fn allowance(
        &self,
        chain: &ChainDescriptor,
        owner: Address,
    ) -> Result<U256, GatewayError>;

    /// Grants the burn-initiator contract an allowance of `amount`.
    async fn approve(&self, chain: &ChainDescriptor, amount: U256) -> Result<TxHash, GatewayError>;

    /// Submits a burn and waits for its receipt.
    async fn submit_burn(
        &self,
        chain: &ChainDescriptor,
        burn: BurnCall,
    ) -> Result<BurnConfirmation, GatewayError>;

    /// Submits the attested message to the destination relay and waits for
    /// its receipt.
    async fn submit_mint(
        &self,
        chain: &ChainDescriptor,
        message: Bytes,
        attestation: Bytes,
        finality: FinalityMode,
    ) -> Result<TxHash, GatewayError>;
}

/// Extracts the protocol message from a confirmed burn's logs.
///
/// Returns `None` when no log decodes as the relay's `MessageSent` event.
pub fn extract_protocol_message(confirmation: &BurnConfirmation) -> Option<ProtocolMessage> {
    confirmation
        .logs
        .iter()
        .find_map(|log| IMessageTransmitter::MessageSent::decode_log(log).ok())
        .map(|event| {
            let bytes = event.message.clone();
            let hash = keccak256(&bytes);
            ProtocolMessage { bytes, hash }
        })
}

/// Errors from chain interaction.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("transaction error: {0}")]
    Transaction(#[from] alloy::providers::PendingTransactionError),
    #[error("contract error: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("chain '{chain}' is not connected to this gateway")]
    UnknownChain { chain: String },
    #[error("transaction rejected: {reason}")]
    Rejected { reason: String },
}
