use std::collections::BTreeMap;

use ethereum_types::{Address, H256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    /// Mined at `block_number` with at least `confirmations` blocks on top,
    /// counting its own.
    Confirmed {
        block_number: u64,
        confirmations: u64,
    },
    /// Loaded from a manifest written by an earlier run.
    Recovered,
}

/// One confirmed contract deployment of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    pub address: Address,
    pub tx_hash: H256,
    pub status: ConfirmationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub address: Address,
    pub tx_hash: H256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

/// Contract name to deployed address mapping, persisted between runs so an
/// interrupted deployment can be resumed without redeploying anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    pub contracts: BTreeMap<String, ManifestEntry>,
}

impl DeploymentManifest {
    pub fn get(&self, name: &str) -> Option<&ManifestEntry> {
        self.contracts.get(name)
    }

    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.contracts.get(name).map(|entry| entry.address)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn record(&mut self, record: &DeploymentRecord) {
        let block_number = match record.status {
            ConfirmationStatus::Confirmed { block_number, .. } => Some(block_number),
            ConfirmationStatus::Recovered => None,
        };
        self.contracts.insert(
            record.name.clone(),
            ManifestEntry {
                address: record.address,
                tx_hash: record.tx_hash,
                block_number,
            },
        );
    }

    /// Name to address map of every entry, in the shape the bytecode linker
    /// consumes.
    pub fn addresses(&self) -> BTreeMap<String, Address> {
        self.contracts
            .iter()
            .map(|(name, entry)| (name.clone(), entry.address))
            .collect()
    }
}
