use std::time::Duration;

use hebao_common::Address;

use crate::confirmation::ConfirmationPolicy;

pub const DEFAULT_GAS_LIMIT: u64 = 6_000_000;
pub const DEFAULT_CONFIRMATIONS: u64 = 1;
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Libraries of the standard wallet, in the order they are declared.
pub const DEFAULT_LIBRARIES: [&str; 10] = [
    "ERC1271Lib",
    "ERC20Lib",
    "GuardianLib",
    "InheritanceLib",
    "LockLib",
    "MetaTxLib",
    "QuotaLib",
    "RecoverLib",
    "UpgradeLib",
    "WhitelistLib",
];

/// Artifact names for each role of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractNames {
    pub libraries: Vec<String>,
    pub implementation: String,
    pub manager: String,
    pub proxy: String,
    pub factory: String,
}

impl Default for ContractNames {
    fn default() -> Self {
        Self {
            libraries: DEFAULT_LIBRARIES.iter().map(ToString::to_string).collect(),
            implementation: "SmartWallet".to_string(),
            manager: "DelayedImplementationManager".to_string(),
            proxy: "ForwardProxy".to_string(),
            factory: "WalletFactory".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub gas_limit: u64,
    /// First constructor argument of the wallet implementation.
    pub price_oracle: Address,
    /// Second constructor argument of the wallet implementation.
    pub owner_setter: Address,
    pub confirmations: u64,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub contracts: ContractNames,
}

impl DeploymentConfig {
    pub fn new(owner_setter: Address) -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            price_oracle: Address::zero(),
            owner_setter,
            confirmations: DEFAULT_CONFIRMATIONS,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            contracts: ContractNames::default(),
        }
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            confirmations: self.confirmations,
            timeout: self.confirmation_timeout,
            poll_interval: self.poll_interval,
        }
    }
}
