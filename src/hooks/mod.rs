//! Post-mint hook metadata, wire encoding, and id derivation.
//!
//! A hook is caller-supplied metadata attached to a burn; the destination
//! contract's hook decoder interprets it after minting. The wire format is
//! fixed-width and unversioned — any change here is a breaking
//! wire-compatibility change with the deployed decoder.

pub mod dispatcher;

use alloy::primitives::{Address, B256, Bytes, keccak256};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// Hook wire layout, consumed by the destination contract's hook decoder:
// - Byte 0: hook-type code
// - Byte 1: execution timing (0 = pre-mint, 1 = post-mint)
// - Bytes 2-5: gas limit, big-endian u32
const TYPE_INDEX: usize = 0;
const TIMING_INDEX: usize = 1;
const GAS_INDEX: usize = 2;
const GAS_SIZE: usize = size_of::<u32>();

/// Encoded hook payload length.
pub const HOOK_WIRE_LENGTH: usize = GAS_INDEX + GAS_SIZE;

/// Gas limit encoded when the caller does not supply one.
pub const DEFAULT_HOOK_GAS_LIMIT: u32 = 300_000;

/// What a hook does after the mint lands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HookType {
    Rebalance,
    Notification,
    Swap,
    Custom,
}

impl HookType {
    /// Wire code for this hook type. Zero is reserved for decoders
    /// encountering an unknown type and is never produced here.
    const fn wire_code(self) -> u8 {
        match self {
            Self::Rebalance => 1,
            Self::Notification => 2,
            Self::Swap => 3,
            Self::Custom => 4,
        }
    }
}

/// When the destination contract runs the hook relative to the mint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutionTiming {
    PreMint,
    PostMint,
}

impl ExecutionTiming {
    const fn wire_code(self) -> u8 {
        match self {
            Self::PreMint => 0,
            Self::PostMint => 1,
        }
    }
}

/// Structured hook intent, serialized into the burn call's opaque payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookMetadata {
    pub hook_type: HookType,
    /// Contract the destination decoder calls for `Custom` hooks.
    pub callback_contract: Option<Address>,
    pub callback_data: Option<Bytes>,
    pub timing: ExecutionTiming,
    pub gas_limit: Option<u32>,
}

impl HookMetadata {
    pub fn new(hook_type: HookType, timing: ExecutionTiming) -> Self {
        Self {
            hook_type,
            callback_contract: None,
            callback_data: None,
            timing,
            gas_limit: None,
        }
    }

    /// Deterministic fixed-width wire encoding.
    pub fn encode(&self) -> Bytes {
        let mut buf = [0u8; HOOK_WIRE_LENGTH];

        buf[TYPE_INDEX] = self.hook_type.wire_code();
        buf[TIMING_INDEX] = self.timing.wire_code();
        buf[GAS_INDEX..GAS_INDEX + GAS_SIZE].copy_from_slice(
            &self
                .gas_limit
                .unwrap_or(DEFAULT_HOOK_GAS_LIMIT)
                .to_be_bytes(),
        );

        Bytes::copy_from_slice(&buf)
    }
}

/// Client-side correlation id for a hook-carrying transfer.
///
/// Content-addressed over the transfer's endpoints and protocol message;
/// the bridge protocol itself never consults it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct HookId(pub B256);

impl Display for HookId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derives the correlation id for a hook execution.
pub fn derive_hook_id(source_chain: &str, destination_chain: &str, message_hash: B256) -> HookId {
    let mut preimage =
        Vec::with_capacity(source_chain.len() + destination_chain.len() + 2 + message_hash.len());
    preimage.extend_from_slice(source_chain.as_bytes());
    preimage.push(b':');
    preimage.extend_from_slice(destination_chain.as_bytes());
    preimage.push(b':');
    preimage.extend_from_slice(message_hash.as_slice());

    HookId(keccak256(&preimage))
}
