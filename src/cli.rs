//! CLI commands for initiating, completing, and inspecting transfers.
//!
//! `transfer` prints (and optionally saves) the attested transfer token as
//! JSON; `complete` reads that token back and submits the mint, so the two
//! halves of a transfer can run in separate sessions.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::amount::Usdc;
use crate::attestation::AttestationClient;
use crate::config::Env;
use crate::events::{EventNotifier, WebhookNotifier};
use crate::gateway::{EvmGateway, LedgerGateway};
use crate::hooks::dispatcher::{HookDispatcher, InMemoryMerchantStore};
use crate::orchestrator::{CrossChainTransferResult, TransferOptions, TransferOrchestrator};

#[derive(Parser, Debug)]
#[clap(name = "stablebridge", about = "Cross-chain USDC transfers")]
pub struct Cli {
    #[clap(flatten)]
    pub env: Env,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Burn on the source chain and wait for the attestation.
    Transfer {
        #[clap(long)]
        from: String,
        #[clap(long)]
        to: String,
        /// Amount in USDC, e.g. "100.00"
        #[clap(long)]
        amount: String,
        #[clap(long)]
        recipient: Address,
        /// Request the fast-finality path (falls back to standard when a
        /// chain lacks the capability)
        #[clap(long)]
        fast: bool,
        /// File to save the resumable transfer token to
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Grant the burn-initiator contract an allowance.
    Approve {
        #[clap(long)]
        chain: String,
        #[clap(long)]
        amount: String,
    },
    /// Mint on the destination chain from a saved transfer token.
    Complete {
        #[clap(long)]
        token: PathBuf,
    },
    /// Best-effort attestation status for a message hash.
    Status {
        #[clap(long)]
        message_hash: B256,
    },
    /// Run a merchant's configured hooks against a saved transfer token.
    Dispatch {
        #[clap(long)]
        merchant: String,
        #[clap(long)]
        token: PathBuf,
    },
}

pub async fn run<W: Write>(stdout: &mut W, cli: Cli) -> anyhow::Result<()> {
    let command = cli.command;
    let ctx = cli.env.into_ctx()?;

    crate::telemetry::init(ctx.log_level)?;

    let signer = PrivateKeySigner::from_bytes(&ctx.private_key)?;
    let sender = signer.address();
    let wallet = EthereumWallet::from(signer);

    let mut connections = Vec::new();
    for descriptor in ctx.registry.chains() {
        let provider = ProviderBuilder::new()
            .wallet(wallet.clone())
            .connect(descriptor.rpc_url.as_str())
            .await
            .with_context(|| format!("failed to connect to {}", descriptor.name))?;
        connections.push((descriptor.clone(), provider));
    }

    let registry = Arc::new(ctx.registry.clone());
    let gateway: Arc<dyn LedgerGateway> = Arc::new(EvmGateway::new(sender, connections));
    let attestation_client = Arc::new(AttestationClient::new(ctx.attestation_api.clone())?);
    let notifier: Arc<dyn EventNotifier> =
        Arc::new(WebhookNotifier::new(ctx.webhook_endpoint.clone())?);

    let orchestrator = Arc::new(
        TransferOrchestrator::new(
            registry,
            Arc::clone(&gateway),
            attestation_client,
            Arc::clone(&notifier),
        )
        .with_poll_interval(ctx.poll_interval),
    );

    match command {
        Command::Transfer {
            from,
            to,
            amount,
            recipient,
            fast,
            output,
        } => {
            let options = TransferOptions {
                use_fast_transfer: fast,
                ..TransferOptions::default()
            };

            let result = orchestrator
                .initiate(&from, &to, &amount, recipient, sender, options)
                .await?;

            let json = serde_json::to_string_pretty(&result)?;
            if let Some(path) = &output {
                std::fs::write(path, &json)?;
                writeln!(stdout, "Transfer token saved to {}", path.display())?;
            }
            writeln!(stdout, "{json}")?;
        }
        Command::Approve { chain, amount } => {
            let descriptor = ctx
                .registry
                .get(&chain)
                .with_context(|| format!("unknown chain: {chain}"))?;

            let units = amount.parse::<Usdc>()?.to_base_units()?;
            let tx_hash = gateway.approve(descriptor, units).await?;

            writeln!(stdout, "Approval submitted: {tx_hash}")?;
        }
        Command::Complete { token } => {
            let contents = std::fs::read_to_string(&token)
                .with_context(|| format!("failed to read {}", token.display()))?;
            let result: CrossChainTransferResult = serde_json::from_str(&contents)?;

            let completed = orchestrator.complete(&result).await?;

            writeln!(stdout, "{}", serde_json::to_string_pretty(&completed)?)?;
        }
        Command::Status { message_hash } => {
            let progress = orchestrator.status(message_hash).await;

            writeln!(
                stdout,
                "{:?} ({}%): {}",
                progress.step, progress.percent, progress.message
            )?;
        }
        Command::Dispatch { merchant, token } => {
            let contents = std::fs::read_to_string(&token)
                .with_context(|| format!("failed to read {}", token.display()))?;
            let result: CrossChainTransferResult = serde_json::from_str(&contents)?;

            let store = Arc::new(InMemoryMerchantStore::with_configs(ctx.merchants.clone()));
            let dispatcher = HookDispatcher::new(Arc::clone(&orchestrator), store, notifier);

            for hook in dispatcher.dispatch(&merchant, &result).await {
                writeln!(stdout, "{hook}")?;
            }
        }
    }

    Ok(())
}
