use hebao_common::H256;
use hebao_rpc::ProviderError;
use hebao_sdk::{ArtifactError, CalldataEncodeError, LinkError, ResolveError};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DeployerError {
    #[error("Dependency resolution failed: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Linking failed: {0}")]
    Link(#[from] LinkError),
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("Failed to encode calldata: {0}")]
    CalldataEncodeError(#[from] CalldataEncodeError),
    #[error("Failed to submit deployment of {contract}: {source}")]
    SubmissionFailure {
        contract: String,
        source: ProviderError,
    },
    #[error("Deployment of {contract} ({tx_hash:#x}) was not confirmed before the deadline")]
    ConfirmationTimeout { contract: String, tx_hash: H256 },
    #[error("Deployment of {contract} ({tx_hash:#x}) reverted")]
    TransactionReverted { contract: String, tx_hash: H256 },
    #[error("Receipt of {tx_hash:#x} for {contract} carries no contract address")]
    MissingContractAddress { contract: String, tx_hash: H256 },
    #[error("Manifest lists {dependent} but not {dependency}, which it depends on")]
    InconsistentManifest {
        dependent: String,
        dependency: String,
    },
    #[error("Manifest store error: {0}")]
    Store(#[from] StoreError),
    #[error("Deployment cancelled")]
    Cancelled,
}

impl DeployerError {
    /// Hash of the transaction involved, when one was already sent.
    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            DeployerError::ConfirmationTimeout { tx_hash, .. }
            | DeployerError::TransactionReverted { tx_hash, .. }
            | DeployerError::MissingContractAddress { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }
}
