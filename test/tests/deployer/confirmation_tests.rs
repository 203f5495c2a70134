use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use hebao_common::{Address, H256, types::ConfirmationStatus};
use hebao_deployer::{
    ConfirmationError, ConfirmationPolicy, confirmation::wait_for_confirmation,
};
use hebao_rpc::{ChainProvider, ProviderError, TransactionRequest, types::receipt::RpcReceipt};

use super::mock::MockChain;

fn policy(confirmations: u64) -> ConfirmationPolicy {
    ConfirmationPolicy {
        confirmations,
        timeout: Duration::from_secs(60),
        poll_interval: Duration::from_secs(2),
    }
}

async fn deploy(chain: &MockChain) -> H256 {
    chain
        .submit_transaction(TransactionRequest::deploy(
            vec![0x60, 0x80].into(),
            1_000_000,
        ))
        .await
        .expect("accepted")
}

#[tokio::test]
async fn mined_transaction_is_confirmed() {
    let chain = MockChain::new();
    let tx_hash = deploy(&chain).await;

    let (receipt, status) = wait_for_confirmation(&chain, tx_hash, &policy(1))
        .await
        .expect("confirmed");

    assert_eq!(receipt.transaction_hash, tx_hash);
    assert!(receipt.contract_address.is_some());
    assert_eq!(
        status,
        ConfirmationStatus::Confirmed {
            block_number: 1,
            confirmations: 1
        }
    );
}

#[tokio::test(start_paused = true)]
async fn waits_for_blocks_on_top() {
    let chain = MockChain::new();
    let tx_hash = deploy(&chain).await;

    let waiter = tokio::spawn({
        let chain = chain.clone();
        async move { wait_for_confirmation(&chain, tx_hash, &policy(3)).await }
    });
    // Two more blocks bring the first transaction to three confirmations.
    tokio::time::sleep(Duration::from_secs(5)).await;
    deploy(&chain).await;
    deploy(&chain).await;

    let (_, status) = waiter
        .await
        .expect("task completes")
        .expect("confirmed");
    assert_eq!(
        status,
        ConfirmationStatus::Confirmed {
            block_number: 1,
            confirmations: 3
        }
    );
}

#[tokio::test(start_paused = true)]
async fn unmined_transaction_times_out() {
    let chain = MockChain::new();
    let tx_hash = deploy(&chain).await;
    chain.never_mine();

    let error = wait_for_confirmation(&chain, tx_hash, &policy(1))
        .await
        .expect_err("never mined");

    assert_eq!(error, ConfirmationError::Timeout(tx_hash));
}

#[tokio::test]
async fn reverted_transaction_is_reported() {
    let chain = MockChain::new();
    chain.revert_attempt(0);
    let tx_hash = deploy(&chain).await;

    let error = wait_for_confirmation(&chain, tx_hash, &policy(1))
        .await
        .expect_err("reverted");

    assert_eq!(error, ConfirmationError::Reverted(tx_hash));
    assert_eq!(error.tx_hash(), tx_hash);
}

/// Accepts every request and never answers.
struct UnresponsiveNode;

#[async_trait]
impl ChainProvider for UnresponsiveNode {
    fn sender(&self) -> Address {
        Address::zero()
    }

    async fn submit_transaction(&self, _: TransactionRequest) -> Result<H256, ProviderError> {
        std::future::pending().await
    }

    async fn get_receipt(&self, _: H256) -> Result<Option<RpcReceipt>, ProviderError> {
        std::future::pending().await
    }

    async fn call(&self, _: Address, _: Bytes) -> Result<Bytes, ProviderError> {
        std::future::pending().await
    }

    async fn block_number(&self) -> Result<u64, ProviderError> {
        std::future::pending().await
    }

    async fn get_code(&self, _: Address) -> Result<Bytes, ProviderError> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn unanswered_receipt_request_times_out() {
    let tx_hash = H256::repeat_byte(0x11);
    let started = tokio::time::Instant::now();

    let result = tokio::time::timeout(
        Duration::from_secs(3600),
        wait_for_confirmation(&UnresponsiveNode, tx_hash, &policy(1)),
    )
    .await
    .expect("gives up at the policy deadline");

    assert_eq!(
        result.expect_err("never answered"),
        ConfirmationError::Timeout(tx_hash)
    );
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(60) && waited < Duration::from_secs(61));
}
