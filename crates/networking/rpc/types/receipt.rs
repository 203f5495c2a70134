use hebao_common::{Address, H256, serde_utils};
use serde::{Deserialize, Serialize};

/// The subset of `eth_getTransactionReceipt` the deployer relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: H256,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub block_number: u64,
    /// `false` when execution reverted.
    #[serde(with = "serde_utils::bool_hex")]
    pub status: bool,
    #[serde(default)]
    pub contract_address: Option<Address>,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub gas_used: u64,
}
