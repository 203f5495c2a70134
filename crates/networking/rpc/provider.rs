use async_trait::async_trait;
use bytes::Bytes;
use hebao_common::{Address, H256, U256, types::LocalSigner};
use hebao_sdk::transaction::Eip1559Transaction;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::{
    clients::{EthClient, EthClientError},
    types::{block_tag::BlockTag, receipt::RpcReceipt},
};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Client(#[from] EthClientError),
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("{0}")]
    Custom(String),
}

/// What the deployer asks the chain to execute. `to == None` creates a
/// contract from `data`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionRequest {
    pub to: Option<Address>,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

impl TransactionRequest {
    pub fn deploy(creation_code: Bytes, gas_limit: u64) -> Self {
        Self {
            to: None,
            data: creation_code,
            value: U256::zero(),
            gas_limit,
        }
    }

    pub fn call(to: Address, calldata: Bytes, gas_limit: u64) -> Self {
        Self {
            to: Some(to),
            data: calldata,
            value: U256::zero(),
            gas_limit,
        }
    }
}

/// Chain access needed to deploy contracts and create wallets.
///
/// Implementations sign and submit on behalf of a single account and must
/// hand out that account's nonces in submission order.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// Account that pays for and signs submitted transactions.
    fn sender(&self) -> Address;

    async fn submit_transaction(&self, request: TransactionRequest) -> Result<H256, ProviderError>;

    /// `Ok(None)` while the transaction is not yet mined.
    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<RpcReceipt>, ProviderError>;

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError>;

    async fn block_number(&self) -> Result<u64, ProviderError>;

    async fn get_code(&self, address: Address) -> Result<Bytes, ProviderError>;
}

/// `ChainProvider` over JSON-RPC that signs locally with one key.
pub struct SigningProvider {
    client: EthClient,
    signer: LocalSigner,
    chain_id: OnceCell<u64>,
    next_nonce: Mutex<Option<u64>>,
}

impl SigningProvider {
    pub fn new(client: EthClient, signer: LocalSigner) -> Self {
        Self {
            client,
            signer,
            chain_id: OnceCell::new(),
            next_nonce: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &EthClient {
        &self.client
    }

    pub async fn chain_id(&self) -> Result<u64, ProviderError> {
        let chain_id = self
            .chain_id
            .get_or_try_init(|| self.client.get_chain_id())
            .await?;
        Ok(*chain_id)
    }

    async fn fees(&self) -> Result<(U256, U256), ProviderError> {
        let gas_price = self.client.get_gas_price().await?;
        let priority_fee = match self.client.get_max_priority_fee().await {
            Ok(fee) => fee,
            Err(error) => {
                debug!(%error, "eth_maxPriorityFeePerGas unavailable, using gas price");
                gas_price
            }
        };
        let max_fee = gas_price.saturating_mul(U256::from(2));
        Ok((priority_fee.min(max_fee), max_fee))
    }
}

#[async_trait]
impl ChainProvider for SigningProvider {
    fn sender(&self) -> Address {
        self.signer.address()
    }

    async fn submit_transaction(&self, request: TransactionRequest) -> Result<H256, ProviderError> {
        let chain_id = self.chain_id().await?;
        // Held until the transaction is accepted so nonces stay sequential.
        let mut next_nonce = self.next_nonce.lock().await;
        let nonce = match *next_nonce {
            Some(nonce) => nonce,
            None => {
                self.client
                    .get_nonce(self.sender(), BlockTag::Pending)
                    .await?
            }
        };
        let (max_priority_fee_per_gas, max_fee_per_gas) = self.fees().await?;

        let tx = Eip1559Transaction {
            chain_id,
            nonce,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas_limit: request.gas_limit,
            to: request.to,
            value: request.value,
            data: request.data,
        };
        let signed = tx.sign(&self.signer);

        match self.client.send_raw_transaction(&signed.raw).await {
            Ok(tx_hash) => {
                *next_nonce = Some(nonce + 1);
                info!(tx_hash = ?tx_hash, nonce, "Transaction submitted");
                Ok(tx_hash)
            }
            Err(error) => {
                // Refetch on the next submission, the node may not have
                // seen this nonce.
                *next_nonce = None;
                Err(ProviderError::Rejected(error.to_string()))
            }
        }
    }

    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<RpcReceipt>, ProviderError> {
        Ok(self.client.get_transaction_receipt(tx_hash).await?)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        Ok(self.client.call(Some(self.sender()), to, &data).await?)
    }

    async fn block_number(&self) -> Result<u64, ProviderError> {
        Ok(self.client.get_block_number().await?)
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, ProviderError> {
        Ok(self.client.get_code(address, BlockTag::Latest).await?)
    }
}
