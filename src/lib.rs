//! Cross-chain stablecoin transfer orchestration over a burn-and-mint
//! bridge.
//!
//! A transfer burns USDC on a source chain, waits for an off-chain
//! attestation service to certify the burn, and submits the signed proof on
//! a destination chain to mint the equivalent value. This crate owns the
//! orchestration of that pipeline:
//!
//! - [`orchestrator::TransferOrchestrator`] sequences burn, attestation
//!   wait, and mint; emits progress at every transition; and returns a
//!   resumable result so minting can happen in a second session or with a
//!   second signer.
//! - [`attestation`] polls the eventually-consistent attestation service
//!   with a bounded wait and fractional progress reporting.
//! - [`hooks`] encodes post-mint hook payloads into burns and runs
//!   merchant-level automation (notify, rebalance, swap) on completion.
//! - [`gateway`] is the chain-facing capability surface; the EVM
//!   implementation drives wallet-bound alloy providers.
//!
//! Chains are described by a static registry ([`registry`]) keyed by name,
//! with the bridging protocol's own domain-id space and per-chain
//! capability flags gating the fast-finality path.

pub mod amount;
pub mod attestation;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod hooks;
pub mod orchestrator;
pub mod registry;
pub mod telemetry;

pub use amount::Usdc;
pub use error::TransferError;
pub use orchestrator::{
    CrossChainTransferResult, TransferOptions, TransferOrchestrator, TransferProgress,
    TransferStatus, TransferStep,
};
pub use registry::{ChainDescriptor, ChainRegistry};
