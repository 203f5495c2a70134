pub mod config;
pub mod confirmation;
pub mod errors;
pub mod explorer;
pub mod orchestrator;
pub mod store;
pub mod wallet;

pub use config::{ContractNames, DeploymentConfig};
pub use confirmation::{ConfirmationError, ConfirmationPolicy};
pub use errors::DeployerError;
pub use explorer::{ExplorerError, ExplorerVerifier, VerificationRequest, verification_requests};
pub use orchestrator::{
    DeploymentPlan, DeploymentState, DeploymentStep, FailureReason, Orchestrator, RunFailure,
};
pub use store::{InMemoryStore, JsonFileStore, ManifestStore, StoreError};
pub use wallet::{
    CreatedWallet, SaltRegistry, WalletCreator, WalletError, decode_wallet_implementation,
    wallet_implementation_calldata,
};
