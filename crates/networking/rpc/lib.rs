pub mod clients;
pub mod provider;
pub mod types;
pub mod utils;

pub use clients::{EthClient, EthClientError};
pub use provider::{ChainProvider, ProviderError, SigningProvider, TransactionRequest};
