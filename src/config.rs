//! Configuration loading and runtime context assembly.
//!
//! Settings are split across two TOML files: a plaintext config (chains,
//! attestation service, merchants, log level) and a secrets file holding
//! the signer key. [`Env`] parses the file paths from the command line and
//! [`Env::into_ctx`] assembles the validated runtime [`Ctx`].

use alloy::primitives::B256;
use clap::Parser;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::attestation::DEFAULT_POLL_INTERVAL;
use crate::hooks::dispatcher::MerchantHookConfig;
use crate::registry::{ChainDescriptor, ChainRegistry, RegistryError};

#[derive(Parser, Debug)]
pub struct Env {
    /// Path to plaintext TOML configuration file
    #[clap(long)]
    pub config: PathBuf,
    /// Path to TOML secrets file
    #[clap(long)]
    pub secrets: PathBuf,
}

/// Non-secret settings deserialized from the plaintext config TOML.
#[derive(Deserialize)]
struct Config {
    log_level: Option<LogLevel>,
    attestation: AttestationConfig,
    chains: Vec<ChainDescriptor>,
    #[serde(default)]
    merchants: Vec<MerchantHookConfig>,
    /// Default webhook endpoint for lifecycle events.
    webhook_endpoint: Option<Url>,
}

#[derive(Deserialize)]
struct AttestationConfig {
    api_base: Url,
    poll_interval_secs: Option<u64>,
}

/// Secret credentials deserialized from the secrets TOML.
#[derive(Deserialize)]
struct Secrets {
    evm: EvmSecrets,
}

#[derive(Deserialize)]
struct EvmSecrets {
    private_key: B256,
}

/// Combined runtime context assembled from config and secrets.
#[derive(Debug, Clone)]
pub struct Ctx {
    pub log_level: LogLevel,
    pub registry: ChainRegistry,
    pub attestation_api: Url,
    pub poll_interval: Duration,
    pub merchants: Vec<MerchantHookConfig>,
    pub webhook_endpoint: Option<Url>,
    pub private_key: B256,
}

impl Env {
    pub fn into_ctx(self) -> Result<Ctx, ConfigError> {
        let config = read_toml::<Config>(&self.config)?;
        let secrets = read_toml::<Secrets>(&self.secrets)?;

        let registry = ChainRegistry::new(config.chains)?;

        let poll_interval = config
            .attestation
            .poll_interval_secs
            .map_or(DEFAULT_POLL_INTERVAL, Duration::from_secs);

        Ok(Ctx {
            log_level: config.log_level.unwrap_or(LogLevel::Info),
            registry,
            attestation_api: config.attestation.api_base,
            poll_interval,
            merchants: config.merchants,
            webhook_endpoint: config.webhook_endpoint,
            private_key: secrets.evm.private_key,
        })
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(toml::from_str(&contents)?)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let level = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        write!(f, "{level}")
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
log_level = "debug"
webhook_endpoint = "https://events.example/webhooks"

[attestation]
api_base = "https://attestation.example"
poll_interval_secs = 5

[[chains]]
name = "ethereum"
chain_id = 1
rpc_url = "https://eth.example"
domain = 0
token_messenger = "0x28b5a0e9C621a5BadaA536219b3a228C8168cf5d"
message_transmitter = "0x81D40F21F12A8F0E3252Bccb954D722d4c464B64"
token_minter = "0xfd78EE919681417d192449715b2594ab58f5D002"
usdc = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
supports_burn = true
supports_mint = true
supports_fast_transfer = true

[[chains]]
name = "base"
chain_id = 8453
rpc_url = "https://base.example"
domain = 6
token_messenger = "0x28b5a0e9C621a5BadaA536219b3a228C8168cf5d"
message_transmitter = "0x81D40F21F12A8F0E3252Bccb954D722d4c464B64"
token_minter = "0xfd78EE919681417d192449715b2594ab58f5D002"
usdc = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
supports_burn = true
supports_mint = true
supports_fast_transfer = true

[[merchants]]
merchant_id = "acme"
webhook_url = "https://acme.example/hooks"
"#;

    const SECRETS: &str = r#"
[evm]
private_key = "0x0101010101010101010101010101010101010101010101010101010101010101"
"#;

    fn write_pair(config: &str, secrets: &str) -> (tempfile::TempDir, Env) {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        let secrets_path = dir.path().join("secrets.toml");
        std::fs::write(&config_path, config).unwrap();
        std::fs::write(&secrets_path, secrets).unwrap();

        (
            dir,
            Env {
                config: config_path,
                secrets: secrets_path,
            },
        )
    }

    #[test]
    fn assembles_ctx_from_config_and_secrets() {
        let (_dir, env) = write_pair(CONFIG, SECRETS);

        let ctx = env.into_ctx().unwrap();

        assert_eq!(ctx.log_level, LogLevel::Debug);
        assert_eq!(ctx.registry.len(), 2);
        assert_eq!(ctx.poll_interval, Duration::from_secs(5));
        assert_eq!(ctx.merchants.len(), 1);
        assert_eq!(ctx.private_key, B256::repeat_byte(0x01));
    }

    #[test]
    fn rejects_duplicate_domain_ids() {
        let config = CONFIG.replace("domain = 6", "domain = 0");
        let (_dir, env) = write_pair(&config, SECRETS);

        assert!(matches!(
            env.into_ctx().unwrap_err(),
            ConfigError::Registry(RegistryError::DuplicateDomain { .. })
        ));
    }
}
