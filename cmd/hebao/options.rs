use std::{path::PathBuf, time::Duration};

use clap::Parser;
use hebao_common::{Address, U256};
use hebao_deployer::{
    ConfirmationPolicy, ContractNames, DeploymentConfig,
    config::{DEFAULT_CONFIRMATIONS, DEFAULT_GAS_LIMIT},
};
use secp256k1::SecretKey;
use tracing::Level;
use url::Url;

use crate::utils::{parse_private_key, parse_u256};

#[derive(Parser, Debug)]
pub struct EthOptions {
    #[arg(
        long = "eth.rpc-url",
        default_value = "http://localhost:8545",
        value_name = "RPC_URL",
        env = "HEBAO_ETH_RPC_URL",
        help = "List of rpc urls to use.",
        help_heading = "Eth options",
        num_args = 1..10
    )]
    pub rpc_url: Vec<String>,
    #[arg(
        long = "eth.private-key",
        value_name = "PRIVATE_KEY",
        value_parser = parse_private_key,
        env = "HEBAO_PRIVATE_KEY",
        help_heading = "Eth options",
        help = "Private key that signs and pays for every submitted transaction."
    )]
    pub private_key: SecretKey,
}

#[derive(Parser, Debug)]
pub struct TransactionOptions {
    #[arg(
        long = "tx.gas-limit",
        default_value_t = DEFAULT_GAS_LIMIT,
        value_name = "UINT64",
        env = "HEBAO_GAS_LIMIT",
        help_heading = "Transaction options"
    )]
    pub gas_limit: u64,
    #[arg(
        long = "tx.confirmations",
        default_value_t = DEFAULT_CONFIRMATIONS,
        value_name = "UINT64",
        env = "HEBAO_CONFIRMATIONS",
        help_heading = "Transaction options",
        help = "Blocks, counting the inclusion block, before a transaction is considered final."
    )]
    pub confirmations: u64,
    #[arg(
        long = "tx.confirmation-timeout",
        default_value = "300",
        value_name = "SECONDS",
        env = "HEBAO_CONFIRMATION_TIMEOUT",
        help_heading = "Transaction options"
    )]
    pub confirmation_timeout_secs: u64,
    #[arg(
        long = "tx.poll-interval",
        default_value = "2000",
        value_name = "MILLISECONDS",
        env = "HEBAO_POLL_INTERVAL",
        help_heading = "Transaction options"
    )]
    pub poll_interval_ms: u64,
}

impl TransactionOptions {
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            confirmations: self.confirmations,
            timeout: Duration::from_secs(self.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DeployerOptions {
    #[command(flatten)]
    pub eth_options: EthOptions,
    #[command(flatten)]
    pub tx_options: TransactionOptions,
    #[arg(
        long = "deployer.artifacts",
        default_value = "artifacts",
        value_name = "PATH",
        env = "HEBAO_DEPLOYER_ARTIFACTS_PATH",
        help_heading = "Deployer options",
        help = "Hardhat artifacts directory holding the compiled contracts."
    )]
    pub artifacts_path: PathBuf,
    #[arg(
        long = "deployer.manifest",
        default_value = "deployments.json",
        value_name = "PATH",
        env = "HEBAO_DEPLOYER_MANIFEST_PATH",
        help_heading = "Deployer options",
        help = "Manifest of deployed contracts. An existing manifest is resumed."
    )]
    pub manifest_path: PathBuf,
    #[arg(
        long = "deployer.price-oracle",
        default_value = "0x0000000000000000000000000000000000000000",
        value_name = "ADDRESS",
        env = "HEBAO_DEPLOYER_PRICE_ORACLE",
        help_heading = "Deployer options"
    )]
    pub price_oracle: Address,
    #[arg(
        long = "deployer.owner-setter",
        value_name = "ADDRESS",
        env = "HEBAO_DEPLOYER_OWNER_SETTER",
        help_heading = "Deployer options",
        help = "Account allowed to set wallet owners. Defaults to the deployer account."
    )]
    pub owner_setter: Option<Address>,
    #[arg(
        long = "deployer.libraries",
        value_name = "NAMES",
        value_delimiter = ',',
        env = "HEBAO_DEPLOYER_LIBRARIES",
        help_heading = "Deployer options",
        help = "Library artifacts to deploy. Defaults to the standard wallet libraries."
    )]
    pub libraries: Vec<String>,
    #[command(flatten)]
    pub explorer_options: ExplorerOptions,
}

impl DeployerOptions {
    pub fn deployment_config(&self, deployer: Address) -> DeploymentConfig {
        let mut contracts = ContractNames::default();
        if !self.libraries.is_empty() {
            contracts.libraries = self.libraries.clone();
        }
        let policy = self.tx_options.confirmation_policy();
        DeploymentConfig {
            gas_limit: self.tx_options.gas_limit,
            price_oracle: self.price_oracle,
            owner_setter: self.owner_setter.unwrap_or(deployer),
            confirmations: policy.confirmations,
            confirmation_timeout: policy.timeout,
            poll_interval: policy.poll_interval,
            contracts,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ExplorerOptions {
    #[arg(
        long = "explorer.url",
        default_value = "https://api.etherscan.io/api",
        value_name = "URL",
        env = "HEBAO_EXPLORER_URL",
        help_heading = "Explorer options"
    )]
    pub url: Url,
    #[arg(
        long = "explorer.api-key",
        value_name = "API_KEY",
        env = "HEBAO_EXPLORER_API_KEY",
        help_heading = "Explorer options",
        help = "If set, deployed contracts are submitted for source verification."
    )]
    pub api_key: Option<String>,
}

#[derive(Parser, Debug)]
pub struct CounterfactualOptions {
    #[arg(
        long = "wallet.factory",
        value_name = "ADDRESS",
        env = "HEBAO_WALLET_FACTORY",
        help_heading = "Wallet options"
    )]
    pub factory: Address,
    #[arg(
        long = "wallet.owner",
        value_name = "ADDRESS",
        help_heading = "Wallet options"
    )]
    pub owner: Address,
    #[arg(
        long = "wallet.salt",
        value_name = "UINT256",
        value_parser = parse_u256,
        help_heading = "Wallet options",
        help = "Decimal, or hexadecimal with a 0x prefix."
    )]
    pub salt: U256,
    #[arg(
        long = "wallet.implementation",
        value_name = "ADDRESS",
        env = "HEBAO_WALLET_IMPLEMENTATION",
        help_heading = "Wallet options",
        help = "Address returned by the factory's walletImplementation(). Queried over RPC if omitted."
    )]
    pub implementation: Option<Address>,
    #[arg(
        long = "eth.rpc-url",
        default_value = "http://localhost:8545",
        value_name = "RPC_URL",
        env = "HEBAO_ETH_RPC_URL",
        help_heading = "Eth options"
    )]
    pub rpc_url: String,
}

#[derive(Parser, Debug)]
pub struct SignCreationOptions {
    #[arg(
        long = "wallet.config",
        value_name = "PATH",
        help_heading = "Wallet options",
        help = "JSON file with the wallet config to authorize."
    )]
    pub config_path: PathBuf,
    #[arg(
        long = "wallet.factory",
        value_name = "ADDRESS",
        env = "HEBAO_WALLET_FACTORY",
        help_heading = "Wallet options"
    )]
    pub factory: Address,
    #[arg(
        long = "wallet.chain-id",
        value_name = "UINT64",
        env = "HEBAO_CHAIN_ID",
        help_heading = "Wallet options"
    )]
    pub chain_id: u64,
    #[arg(
        long = "wallet.owner-key",
        value_name = "PRIVATE_KEY",
        value_parser = parse_private_key,
        env = "HEBAO_WALLET_OWNER_KEY",
        help_heading = "Wallet options",
        help = "Private key of the wallet owner."
    )]
    pub owner_key: SecretKey,
    #[arg(
        long = "output",
        value_name = "PATH",
        help = "Where to write the authorization. Printed to stdout if omitted."
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CreateWalletOptions {
    #[command(flatten)]
    pub eth_options: EthOptions,
    #[command(flatten)]
    pub tx_options: TransactionOptions,
    #[arg(
        long = "wallet.factory",
        value_name = "ADDRESS",
        env = "HEBAO_WALLET_FACTORY",
        help_heading = "Wallet options",
        help = "Factory to relay through. Authorizations for other factories are rejected."
    )]
    pub factory: Address,
    #[arg(
        long = "wallet.authorization",
        value_name = "PATH",
        help_heading = "Wallet options",
        help = "Authorization JSON produced by `sign-creation`."
    )]
    pub authorization_path: PathBuf,
    #[arg(
        long = "wallet.fee-amount",
        default_value = "0",
        value_name = "UINT256",
        value_parser = parse_u256,
        help_heading = "Wallet options",
        help = "Fee charged for relaying, at most the config's max fee amount."
    )]
    pub fee_amount: U256,
}

#[derive(Parser, Debug)]
pub struct VerifyOptions {
    #[arg(
        long = "deployer.artifacts",
        default_value = "artifacts",
        value_name = "PATH",
        env = "HEBAO_DEPLOYER_ARTIFACTS_PATH",
        help_heading = "Deployer options"
    )]
    pub artifacts_path: PathBuf,
    #[arg(
        long = "deployer.manifest",
        default_value = "deployments.json",
        value_name = "PATH",
        env = "HEBAO_DEPLOYER_MANIFEST_PATH",
        help_heading = "Deployer options"
    )]
    pub manifest_path: PathBuf,
    #[arg(
        long = "deployer.price-oracle",
        default_value = "0x0000000000000000000000000000000000000000",
        value_name = "ADDRESS",
        env = "HEBAO_DEPLOYER_PRICE_ORACLE",
        help_heading = "Deployer options"
    )]
    pub price_oracle: Address,
    #[arg(
        long = "deployer.owner-setter",
        value_name = "ADDRESS",
        env = "HEBAO_DEPLOYER_OWNER_SETTER",
        help_heading = "Deployer options",
        help = "Owner setter the implementation was deployed with."
    )]
    pub owner_setter: Address,
    #[arg(
        long = "explorer.url",
        default_value = "https://api.etherscan.io/api",
        value_name = "URL",
        env = "HEBAO_EXPLORER_URL",
        help_heading = "Explorer options"
    )]
    pub explorer_url: Url,
    #[arg(
        long = "explorer.api-key",
        value_name = "API_KEY",
        env = "HEBAO_EXPLORER_API_KEY",
        help_heading = "Explorer options"
    )]
    pub api_key: String,
}

#[derive(Parser, Debug)]
pub struct LogOptions {
    #[arg(
        long = "log.level",
        default_value_t = Level::INFO,
        value_name = "LOG_LEVEL",
        global = true,
        help_heading = "Log options"
    )]
    pub log_level: Level,
}
