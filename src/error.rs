//! Transfer-level error taxonomy.
//!
//! Transport errors stay in their own modules ([`GatewayError`],
//! [`AttestationError`]); this enum is what orchestrator callers see. The
//! orchestrator never swallows errors — its only local recovery behavior is
//! emitting a `Failed` progress event before re-raising — and transient
//! attestation errors are recovered inside the poller, never here.

use alloy::primitives::U256;

use crate::amount::AmountError;
use crate::attestation::{AttestationError, AttestationTimeout};
use crate::gateway::GatewayError;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Chain key absent from the registry, or the chain lacks the
    /// capability this transfer direction requires.
    #[error("unsupported chain: {chain}")]
    UnsupportedChain { chain: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("insufficient balance: need {required} base units, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("insufficient allowance for the burn initiator: need {required}, have {available}")]
    InsufficientAllowance { required: U256, available: U256 },

    /// The burn receipt carried no protocol-message log. Fatal and
    /// non-retryable: the contract or ABI is misconfigured.
    #[error("protocol message not found in burn transaction receipt")]
    MessageNotFound,

    #[error(transparent)]
    AttestationTimeout(#[from] AttestationTimeout),

    /// `complete` was called before the attestation was obtained.
    #[error("attestation missing: transfer is not ready to mint")]
    AttestationMissing,

    /// Attestation service failure outside the polling loop (message-bytes
    /// lookup during `complete`).
    #[error("attestation service error: {0}")]
    Attestation(#[from] AttestationError),

    /// Mint rejected on the destination chain. Retrying `complete` with the
    /// same result is safe; the bridge contract deduplicates messages.
    #[error("mint failed on destination chain: {0}")]
    Mint(#[source] GatewayError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
