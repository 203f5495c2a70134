use std::sync::Arc;

use clap::{Parser as ClapParser, Subcommand as ClapSubcommand};
use eyre::{OptionExt, bail};
use hebao_common::types::{CreationAuthorization, LocalSigner, WalletConfig};
use hebao_deployer::{
    DeploymentConfig, DeploymentPlan, ExplorerVerifier, JsonFileStore, ManifestStore,
    Orchestrator, WalletCreator, decode_wallet_implementation, verification_requests,
    wallet_implementation_calldata,
};
use hebao_rpc::{ChainProvider, EthClient};
use hebao_sdk::{CreationValidator, WalletAddressCalculator};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    initializers::init_provider,
    options::{
        CounterfactualOptions, CreateWalletOptions, DeployerOptions, LogOptions,
        SignCreationOptions, VerifyOptions,
    },
    utils::read_json,
};

pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[allow(clippy::upper_case_acronyms)]
#[derive(ClapParser)]
#[command(name = "hebao", author, version = VERSION_STRING, about = "Smart wallet deployment and relayed wallet creation", long_about = None)]
pub struct CLI {
    #[command(flatten)]
    pub log_opts: LogOptions,
    #[command(subcommand)]
    pub command: Subcommand,
}

#[derive(ClapSubcommand)]
pub enum Subcommand {
    #[command(
        name = "deploy",
        about = "Deploy the libraries, wallet implementation, manager, proxy and factory"
    )]
    Deploy(Box<DeployerOptions>),
    #[command(
        name = "compute-address",
        about = "Print the counterfactual address of a wallet"
    )]
    ComputeAddress(CounterfactualOptions),
    #[command(
        name = "sign-creation",
        about = "Sign a wallet creation authorization as the wallet owner"
    )]
    SignCreation(SignCreationOptions),
    #[command(
        name = "create-wallet",
        about = "Relay an owner's authorization to the factory"
    )]
    CreateWallet(Box<CreateWalletOptions>),
    #[command(
        name = "verify",
        about = "Submit the contracts of a manifest for source verification"
    )]
    Verify(VerifyOptions),
}

impl Subcommand {
    pub async fn run(self) -> eyre::Result<()> {
        match self {
            Subcommand::Deploy(opts) => deploy(*opts).await,
            Subcommand::ComputeAddress(opts) => compute_address(opts).await,
            Subcommand::SignCreation(opts) => sign_creation(opts),
            Subcommand::CreateWallet(opts) => create_wallet(*opts).await,
            Subcommand::Verify(opts) => verify(opts).await,
        }
    }
}

async fn deploy(opts: DeployerOptions) -> eyre::Result<()> {
    let provider = init_provider(&opts.eth_options).await?;
    let config = opts.deployment_config(provider.sender());
    let plan = DeploymentPlan::load(&opts.artifacts_path, &config.contracts)?;
    let store = Arc::new(JsonFileStore::new(&opts.manifest_path));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping before the next deployment");
                cancel.cancel();
            }
        }
    });

    let mut orchestrator =
        Orchestrator::new(provider, store, config.clone()).with_cancellation(cancel);
    let manifest = match orchestrator.run_deployment(&plan).await {
        Ok(manifest) => manifest,
        Err(failure) => {
            error!(
                manifest = %opts.manifest_path.display(),
                contracts = failure.manifest.len(),
                "Partial manifest saved, run again to resume"
            );
            return Err(eyre::Report::new(*failure));
        }
    };
    println!("{}", serde_json::to_string_pretty(&manifest)?);

    if let Some(api_key) = opts.explorer_options.api_key {
        let verifier = ExplorerVerifier::new(opts.explorer_options.url, api_key);
        let requests = verification_requests(&plan, &manifest, &config)?;
        verifier.submit_detached(requests).await?;
    }
    Ok(())
}

async fn compute_address(opts: CounterfactualOptions) -> eyre::Result<()> {
    let implementation = match opts.implementation {
        Some(implementation) => implementation,
        None => {
            let client = EthClient::new(&opts.rpc_url)?;
            let output = client
                .call(None, opts.factory, &wallet_implementation_calldata()?)
                .await?;
            decode_wallet_implementation(&output)?
        }
    };

    let computed = WalletAddressCalculator::new(implementation).compute_wallet_address(
        opts.factory,
        opts.owner,
        opts.salt,
    );
    info!(owner = ?computed.owner, salt = %computed.salt, implementation = ?implementation, "Wallet address computed");
    println!("{:#x}", computed.address);
    Ok(())
}

fn sign_creation(opts: SignCreationOptions) -> eyre::Result<()> {
    let config: WalletConfig = read_json(&opts.config_path)?;
    let signer = LocalSigner::new(opts.owner_key);
    if signer.address() != config.owner {
        bail!(
            "Key belongs to {:#x}, but the wallet owner is {:#x}",
            signer.address(),
            config.owner
        );
    }

    let authorization =
        CreationValidator::new(opts.chain_id).authorize(config, opts.factory, &signer)?;
    let json = serde_json::to_string_pretty(&authorization)?;
    match opts.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            info!(path = %path.display(), "Authorization written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn create_wallet(opts: CreateWalletOptions) -> eyre::Result<()> {
    let authorization: CreationAuthorization = read_json(&opts.authorization_path)?;
    let provider = init_provider(&opts.eth_options).await?;
    let chain_id = provider.chain_id().await?;

    let creator = WalletCreator::new(
        provider,
        opts.factory,
        CreationValidator::new(chain_id),
        opts.tx_options.gas_limit,
        opts.tx_options.confirmation_policy(),
    );
    let created = creator
        .create_wallet(&authorization, opts.fee_amount)
        .await?;
    info!(
        wallet = ?created.address,
        tx_hash = ?created.tx_hash,
        block_number = created.block_number,
        "Wallet ready"
    );
    println!("{:#x}", created.address);
    Ok(())
}

async fn verify(opts: VerifyOptions) -> eyre::Result<()> {
    let manifest = JsonFileStore::new(&opts.manifest_path)
        .load()
        .await?
        .ok_or_eyre("No manifest found, nothing to verify")?;

    let mut config = DeploymentConfig::new(opts.owner_setter);
    config.price_oracle = opts.price_oracle;
    let plan = DeploymentPlan::load(&opts.artifacts_path, &config.contracts)?;

    let verifier = ExplorerVerifier::new(opts.explorer_url, opts.api_key);
    for request in verification_requests(&plan, &manifest, &config)? {
        match verifier.submit(&request).await {
            Ok(guid) => {
                info!(contract = %request.contract_name, address = ?request.address, %guid, "Verification queued")
            }
            Err(error) => warn!(contract = %request.contract_name, %error, "Verification failed"),
        }
    }
    Ok(())
}
