use bytes::Bytes;
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Parameters of a wallet the factory is asked to create.
///
/// Field order mirrors the factory's `WalletConfig` struct; the signed
/// creation message commits to every field except the signature itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    pub owner: Address,
    pub guardians: Vec<Address>,
    pub quota: U256,
    pub inheritor: Address,
    pub fee_recipient: Address,
    pub fee_token: Address,
    pub max_fee_amount: U256,
    pub salt: U256,
}

impl WalletConfig {
    /// A config with no guardians, quota, inheritor or fees.
    pub fn bare(owner: Address, salt: U256) -> Self {
        Self {
            owner,
            guardians: Vec::new(),
            quota: U256::zero(),
            inheritor: Address::zero(),
            fee_recipient: Address::zero(),
            fee_token: Address::zero(),
            max_fee_amount: U256::zero(),
            salt,
        }
    }
}

/// An owner's off-chain approval for a relayer to create `config` through
/// the factory at `factory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationAuthorization {
    pub config: WalletConfig,
    pub factory: Address,
    #[serde(with = "crate::serde_utils::bytes")]
    pub signature: Bytes,
}

/// Output of the counterfactual address computation. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputedWalletAddress {
    pub owner: Address,
    pub salt: U256,
    pub address: Address,
}
