mod deployment;
mod signer;
mod wallet;

pub use deployment::*;
pub use signer::*;
pub use wallet::*;
