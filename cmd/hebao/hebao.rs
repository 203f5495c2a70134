use clap::Parser;

mod cli;
mod initializers;
mod options;
mod utils;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli::CLI { log_opts, command } = cli::CLI::parse();
    initializers::init_tracing(log_opts.log_level)?;
    command.run().await
}
