//! Static per-chain metadata and the chain registry.
//!
//! Every transfer call references chains by name; the registry resolves the
//! name to a [`ChainDescriptor`] carrying the bridging protocol's domain id,
//! the bridge contract addresses, and the capability flags that gate which
//! orchestrator code paths are legal for that chain. The registry is loaded
//! once at startup and immutable thereafter.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Static metadata for one supported chain.
///
/// `domain` is the bridging protocol's own small-integer chain identifier,
/// distinct from the chain's native `chain_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: Url,
    pub domain: u32,
    /// Burn-initiator contract (accepts `depositForBurn` calls).
    pub token_messenger: Address,
    /// Message-relay contract (emits `MessageSent`, accepts `receiveMessage`).
    pub message_transmitter: Address,
    /// Token-minter contract controlled by the message relay.
    pub token_minter: Address,
    /// Bridged-token contract.
    pub usdc: Address,
    pub supports_burn: bool,
    pub supports_mint: bool,
    pub supports_fast_transfer: bool,
}

/// Immutable name-keyed registry of supported chains.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<String, ChainDescriptor>,
}

impl ChainRegistry {
    /// Builds a registry, rejecting duplicate names and duplicate domain ids.
    pub fn new(descriptors: Vec<ChainDescriptor>) -> Result<Self, RegistryError> {
        let mut chains = HashMap::with_capacity(descriptors.len());
        let mut domains: HashMap<u32, String> = HashMap::new();

        for descriptor in descriptors {
            if chains.contains_key(&descriptor.name) {
                return Err(RegistryError::DuplicateName {
                    name: descriptor.name,
                });
            }

            if let Some(first) = domains.insert(descriptor.domain, descriptor.name.clone()) {
                return Err(RegistryError::DuplicateDomain {
                    domain: descriptor.domain,
                    first,
                    second: descriptor.name,
                });
            }

            chains.insert(descriptor.name.clone(), descriptor);
        }

        Ok(Self { chains })
    }

    pub fn get(&self, name: &str) -> Option<&ChainDescriptor> {
        self.chains.get(name)
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Registry construction errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("domain id {domain} is registered by both '{first}' and '{second}'")]
    DuplicateDomain {
        domain: u32,
        first: String,
        second: String,
    },
    #[error("chain '{name}' is registered twice")]
    DuplicateName { name: String },
}
