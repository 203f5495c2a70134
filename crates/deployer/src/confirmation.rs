use std::time::Duration;

use hebao_common::{H256, types::ConfirmationStatus};
use hebao_rpc::{ChainProvider, types::receipt::RpcReceipt};
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Blocks that must include or follow the transaction's block, counting
    /// that block itself. `0` and `1` both mean "mined".
    pub confirmations: u64,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfirmationError {
    #[error("Transaction {0:#x} reverted")]
    Reverted(H256),
    #[error("Transaction {0:#x} was not confirmed before the deadline")]
    Timeout(H256),
}

impl ConfirmationError {
    pub fn tx_hash(&self) -> H256 {
        match self {
            ConfirmationError::Reverted(tx_hash) | ConfirmationError::Timeout(tx_hash) => *tx_hash,
        }
    }
}

/// Polls until `tx_hash` is mined with enough blocks on top, it reverts, or
/// the policy's deadline passes.
///
/// Errors from the node while polling are logged and polling continues; the
/// transaction itself is never resubmitted. The deadline also bounds requests
/// the node never answers.
pub async fn wait_for_confirmation(
    provider: &dyn ChainProvider,
    tx_hash: H256,
    policy: &ConfirmationPolicy,
) -> Result<(RpcReceipt, ConfirmationStatus), ConfirmationError> {
    let deadline = Instant::now() + policy.timeout;
    match timeout_at(deadline, poll_confirmation(provider, tx_hash, policy)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(tx_hash = ?tx_hash, timeout = ?policy.timeout, "Gave up waiting for confirmation");
            Err(ConfirmationError::Timeout(tx_hash))
        }
    }
}

async fn poll_confirmation(
    provider: &dyn ChainProvider,
    tx_hash: H256,
    policy: &ConfirmationPolicy,
) -> Result<(RpcReceipt, ConfirmationStatus), ConfirmationError> {
    let required = policy.confirmations.max(1);

    loop {
        match provider.get_receipt(tx_hash).await {
            Ok(Some(receipt)) if !receipt.status => {
                return Err(ConfirmationError::Reverted(tx_hash));
            }
            Ok(Some(receipt)) => match provider.block_number().await {
                Ok(head) => {
                    let confirmations = head.saturating_sub(receipt.block_number) + 1;
                    if confirmations >= required {
                        debug!(tx_hash = ?tx_hash, block_number = receipt.block_number, confirmations, "Transaction confirmed");
                        let status = ConfirmationStatus::Confirmed {
                            block_number: receipt.block_number,
                            confirmations,
                        };
                        return Ok((receipt, status));
                    }
                    trace!(tx_hash = ?tx_hash, confirmations, required, "Waiting for confirmations");
                }
                Err(error) => warn!(tx_hash = ?tx_hash, %error, "Failed to fetch block number"),
            },
            Ok(None) => trace!(tx_hash = ?tx_hash, "Transaction not mined yet"),
            Err(error) => warn!(tx_hash = ?tx_hash, %error, "Failed to fetch receipt"),
        }

        sleep(policy.poll_interval).await;
    }
}
