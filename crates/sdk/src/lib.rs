pub mod artifact;
pub mod authorization;
pub mod calldata;
pub mod create2;
pub mod linker;
pub mod resolver;
pub mod transaction;

pub use artifact::{
    ArtifactError, ArtifactLoader, CompilerInput, ContractArtifact, LinkOffset, LinkReference,
};
pub use authorization::{AuthorizationError, CreationValidator};
pub use calldata::{CalldataEncodeError, Value, encode_calldata, encode_tuple};
pub use create2::WalletAddressCalculator;
pub use linker::{LinkError, link_bytecode};
pub use resolver::{ResolveError, resolve_deployment_order};
