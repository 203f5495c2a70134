use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use bytes::Bytes;
use hebao_common::{Address, H256, U256, utils::keccak};
use hebao_rpc::{ChainProvider, ProviderError, TransactionRequest, types::receipt::RpcReceipt};
use hebao_deployer::wallet_implementation_calldata;
use hebao_sdk::{create2::compute_wallet_address, transaction::create_address};

/// In-process chain: every accepted transaction is mined in its own block.
#[derive(Clone)]
pub struct MockChain {
    sender: Address,
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    nonce: u64,
    block: u64,
    attempts: usize,
    submitted: Vec<TransactionRequest>,
    receipts: HashMap<H256, RpcReceipt>,
    code: HashMap<Address, Bytes>,
    reject_attempt: Option<usize>,
    revert_attempt: Option<usize>,
    never_mine: bool,
    wallet_implementation: Address,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            sender: Address::from_low_u64_be(0xdeadbeef),
            state: Arc::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock")
    }

    /// Rejects the `attempt`-th submission (zero based) at the node.
    pub fn reject_attempt(&self, attempt: usize) {
        self.state().reject_attempt = Some(attempt);
    }

    /// Mines the `attempt`-th submission with a failed status.
    pub fn revert_attempt(&self, attempt: usize) {
        self.state().revert_attempt = Some(attempt);
    }

    pub fn never_mine(&self) {
        self.state().never_mine = true;
    }

    pub fn heal(&self) {
        let mut state = self.state();
        state.reject_attempt = None;
        state.revert_attempt = None;
        state.never_mine = false;
    }

    pub fn set_wallet_implementation(&self, implementation: Address) {
        self.state().wallet_implementation = implementation;
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        self.state().code.insert(address, code);
    }

    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.state().submitted.clone()
    }

    pub fn deployment_count(&self) -> usize {
        self.state()
            .submitted
            .iter()
            .filter(|request| request.to.is_none())
            .count()
    }

    /// Contract creations whose code ends with `name`'s marker.
    pub fn deployments_of(&self, name: &str) -> usize {
        let marker = name.as_bytes();
        self.state()
            .submitted
            .iter()
            .filter(|request| request.to.is_none() && contains(&request.data, marker))
            .count()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

fn word(data: &[u8], index: usize) -> Option<&[u8]> {
    data.get(4 + index * 32..4 + (index + 1) * 32)
}

#[async_trait]
impl ChainProvider for MockChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn submit_transaction(&self, request: TransactionRequest) -> Result<H256, ProviderError> {
        let mut state = self.state();
        let attempt = state.attempts;
        state.attempts += 1;
        if state.reject_attempt == Some(attempt) {
            return Err(ProviderError::Rejected("insufficient funds".to_string()));
        }

        let nonce = state.nonce;
        state.nonce += 1;
        state.block += 1;
        let mut preimage = self.sender.as_bytes().to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let tx_hash = keccak(preimage);
        let status = state.revert_attempt != Some(attempt);

        let contract_address = match request.to {
            None => Some(create_address(self.sender, nonce)),
            Some(_) => None,
        };
        if status {
            match request.to {
                None => {
                    if let Some(address) = contract_address {
                        state.code.insert(address, request.data.clone());
                    }
                }
                Some(factory) => {
                    // createWallet((owner, ..., salt, signature), fee): the
                    // tuple starts at the offset held in the first word.
                    let owner = word(&request.data, 2).map(|w| Address::from_slice(&w[12..]));
                    let salt = word(&request.data, 2 + 7).map(U256::from_big_endian);
                    if let (Some(owner), Some(salt)) = (owner, salt) {
                        let wallet = compute_wallet_address(
                            factory,
                            owner,
                            salt,
                            state.wallet_implementation,
                        );
                        state.code.insert(wallet, Bytes::from_static(&[0x60, 0x80]));
                    }
                }
            }
        }

        let block_number = state.block;
        state.receipts.insert(
            tx_hash,
            RpcReceipt {
                transaction_hash: tx_hash,
                block_number,
                status,
                contract_address,
                gas_used: 21_000,
            },
        );
        state.submitted.push(request);
        Ok(tx_hash)
    }

    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<RpcReceipt>, ProviderError> {
        let state = self.state();
        if state.never_mine {
            return Ok(None);
        }
        Ok(state.receipts.get(&tx_hash).cloned())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        let selector = wallet_implementation_calldata()
            .map_err(|err| ProviderError::Custom(err.to_string()))?;
        if data.as_ref() != selector.as_slice() {
            return Err(ProviderError::Custom(format!("unknown call to {to:#x}")));
        }
        let mut output = [0u8; 32];
        output[12..].copy_from_slice(self.state().wallet_implementation.as_bytes());
        Ok(Bytes::copy_from_slice(&output))
    }

    async fn block_number(&self) -> Result<u64, ProviderError> {
        Ok(self.state().block)
    }

    async fn get_code(&self, address: Address) -> Result<Bytes, ProviderError> {
        Ok(self.state().code.get(&address).cloned().unwrap_or_default())
    }
}
