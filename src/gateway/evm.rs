//! EVM implementation of the ledger gateway.

use alloy::primitives::{Address, Bytes, FixedBytes, TxHash, U256};
use alloy::providers::Provider;
use std::collections::HashMap;
use tracing::{info, trace};

use super::{
    BurnCall, BurnConfirmation, BurnVariant, FinalityMode, GatewayError, IERC20, IMessageTransmitter,
    ITokenMessenger, LedgerGateway,
};
use crate::registry::ChainDescriptor;

/// One connected chain: its descriptor plus a wallet-bound provider.
struct Connection<P> {
    descriptor: ChainDescriptor,
    provider: P,
}

/// [`LedgerGateway`] over wallet-bound alloy providers, one per chain.
///
/// The signing key is baked into each provider's wallet; `owner` is the
/// resolved signer address used for read calls.
pub struct EvmGateway<P>
where
    P: Provider + Clone,
{
    owner: Address,
    connections: HashMap<String, Connection<P>>,
}

impl<P> EvmGateway<P>
where
    P: Provider + Clone,
{
    pub fn new(owner: Address, connections: Vec<(ChainDescriptor, P)>) -> Self {
        let connections = connections
            .into_iter()
            .map(|(descriptor, provider)| {
                (
                    descriptor.name.clone(),
                    Connection {
                        descriptor,
                        provider,
                    },
                )
            })
            .collect();

        Self { owner, connections }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    fn connection(&self, chain: &ChainDescriptor) -> Result<&Connection<P>, GatewayError> {
        self.connections
            .get(&chain.name)
            .ok_or_else(|| GatewayError::UnknownChain {
                chain: chain.name.clone(),
            })
    }
}

#[async_trait::async_trait]
impl<P> LedgerGateway for EvmGateway<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    async fn balance_of(
        &self,
        chain: &ChainDescriptor,
        owner: Address,
    ) -> Result<U256, GatewayError> {
        let connection = self.connection(chain)?;
        let usdc = IERC20::new(connection.descriptor.usdc, &connection.provider);

        Ok(usdc.balanceOf(owner).call().await?)
    }

    async fn allowance(
        &self,
        chain: &ChainDescriptor,
        owner: Address,
    ) -> Result<U256, GatewayError> {
        let connection = self.connection(chain)?;
        let usdc = IERC20::new(connection.descriptor.usdc, &connection.provider);
        let spender = connection.descriptor.token_messenger;

        let allowance = usdc.allowance(owner, spender).call().await?;

        trace!(chain = %chain.name, %allowance, "Read burn-initiator allowance");

        Ok(allowance)
    }

    async fn approve(&self, chain: &ChainDescriptor, amount: U256) -> Result<TxHash, GatewayError> {
        let connection = self.connection(chain)?;
        let usdc = IERC20::new(connection.descriptor.usdc, &connection.provider);
        let spender = connection.descriptor.token_messenger;

        info!(chain = %chain.name, %amount, "Approving burn-initiator allowance");

        let receipt = usdc
            .approve(spender, amount)
            .send()
            .await?
            .get_receipt()
            .await?;

        Ok(receipt.transaction_hash)
    }

    async fn submit_burn(
        &self,
        chain: &ChainDescriptor,
        burn: BurnCall,
    ) -> Result<BurnConfirmation, GatewayError> {
        let connection = self.connection(chain)?;
        let messenger =
            ITokenMessenger::new(connection.descriptor.token_messenger, &connection.provider);

        let recipient = FixedBytes::<32>::left_padding_from(burn.recipient.as_slice());

        // bytes32(0) allows any address to submit the mint on the destination.
        let destination_caller = FixedBytes::<32>::ZERO;

        info!(
            chain = %chain.name,
            amount = %burn.amount,
            destination_domain = burn.destination_domain,
            variant = ?burn.variant,
            "Submitting burn"
        );

        let pending = match &burn.variant {
            BurnVariant::Standard => {
                let mut call = messenger.depositForBurn(
                    burn.amount,
                    burn.destination_domain,
                    recipient,
                    connection.descriptor.usdc,
                    destination_caller,
                    U256::ZERO,
                    super::STANDARD_FINALITY_THRESHOLD,
                );
                if let Some(gas) = burn.gas_limit {
                    call = call.gas(gas);
                }
                call.send().await?
            }
            BurnVariant::FastFinality {
                max_fee,
                min_finality_threshold,
            } => {
                let mut call = messenger.depositForBurn(
                    burn.amount,
                    burn.destination_domain,
                    recipient,
                    connection.descriptor.usdc,
                    destination_caller,
                    *max_fee,
                    *min_finality_threshold,
                );
                if let Some(gas) = burn.gas_limit {
                    call = call.gas(gas);
                }
                call.send().await?
            }
            BurnVariant::WithHook { payload } => {
                let mut call = messenger.depositForBurnWithHook(
                    burn.amount,
                    burn.destination_domain,
                    recipient,
                    connection.descriptor.usdc,
                    destination_caller,
                    U256::ZERO,
                    super::STANDARD_FINALITY_THRESHOLD,
                    payload.clone(),
                );
                if let Some(gas) = burn.gas_limit {
                    call = call.gas(gas);
                }
                call.send().await?
            }
        };

        let receipt = pending.get_receipt().await?;

        Ok(BurnConfirmation {
            tx_hash: receipt.transaction_hash,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        })
    }

    async fn submit_mint(
        &self,
        chain: &ChainDescriptor,
        message: Bytes,
        attestation: Bytes,
        finality: FinalityMode,
    ) -> Result<TxHash, GatewayError> {
        let connection = self.connection(chain)?;
        let transmitter = IMessageTransmitter::new(
            connection.descriptor.message_transmitter,
            &connection.provider,
        );

        info!(chain = %chain.name, ?finality, "Submitting mint");

        let receipt = match finality {
            FinalityMode::Finalized => {
                transmitter
                    .receiveMessage(message, attestation)
                    .send()
                    .await?
                    .get_receipt()
                    .await?
            }
            FinalityMode::Unfinalized => {
                transmitter
                    .receiveUnfinalizedMessage(message, attestation)
                    .send()
                    .await?
                    .get_receipt()
                    .await?
            }
        };

        Ok(receipt.transaction_hash)
    }
}
