use std::sync::Arc;

use hebao_common::types::LocalSigner;
use hebao_rpc::{ChainProvider, EthClient, SigningProvider};
use tracing::{Level, info};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Directive, fmt, layer::SubscriberExt,
};

use crate::options::EthOptions;

pub fn init_tracing(log_level: Level) -> eyre::Result<()> {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(log_level))
        .from_env_lossy();

    let fmt_layer = fmt::layer().with_filter(log_filter);
    let subscriber = Registry::default().with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| eyre::eyre!("Setting default subscriber failed: {err}"))
}

pub async fn init_provider(opts: &EthOptions) -> eyre::Result<Arc<SigningProvider>> {
    let client = EthClient::new_with_multiple_urls(opts.rpc_url.clone())?;
    let provider = SigningProvider::new(client, LocalSigner::new(opts.private_key));
    let chain_id = provider.chain_id().await?;
    info!(sender = ?provider.sender(), chain_id, "Connected to chain");
    Ok(Arc::new(provider))
}
