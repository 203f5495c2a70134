use ethereum_types::{Address, H256, U256};
use hebao_common::{types::ComputedWalletAddress, utils::keccak};

/// Domain tag the factory mixes into every wallet salt.
pub const WALLET_CREATION_SALT_PREFIX: &[u8] = b"WALLET_CREATION";

const MINIMAL_PROXY_INIT: [u8; 10] = [0x3d, 0x60, 0x2d, 0x80, 0x60, 0x0a, 0x3d, 0x39, 0x81, 0xf3];
const MINIMAL_PROXY_RUNTIME_PREFIX: [u8; 10] =
    [0x36, 0x3d, 0x3d, 0x37, 0x3d, 0x3d, 0x3d, 0x36, 0x3d, 0x73];
const MINIMAL_PROXY_RUNTIME_SUFFIX: [u8; 15] = [
    0x5a, 0xf4, 0x3d, 0x82, 0x80, 0x3e, 0x90, 0x3d, 0x91, 0x60, 0x2b, 0x57, 0xfd, 0x5b, 0xf3,
];

/// EIP-1167 creation code of a clone delegating every call to
/// `implementation`. This is the init code the factory deploys each wallet
/// with.
pub fn minimal_proxy_creation_code(implementation: Address) -> [u8; 55] {
    let mut code = [0u8; 55];
    code[..10].copy_from_slice(&MINIMAL_PROXY_INIT);
    code[10..20].copy_from_slice(&MINIMAL_PROXY_RUNTIME_PREFIX);
    code[20..40].copy_from_slice(implementation.as_bytes());
    code[40..].copy_from_slice(&MINIMAL_PROXY_RUNTIME_SUFFIX);
    code
}

/// The 32-byte CREATE2 salt the factory derives from an owner and the
/// caller-chosen salt: `keccak256("WALLET_CREATION" ++ owner ++ uint256(salt))`.
pub fn wallet_salt(owner: Address, salt: U256) -> H256 {
    let mut preimage = Vec::with_capacity(WALLET_CREATION_SALT_PREFIX.len() + 20 + 32);
    preimage.extend_from_slice(WALLET_CREATION_SALT_PREFIX);
    preimage.extend_from_slice(owner.as_bytes());
    preimage.extend_from_slice(&salt.to_big_endian());
    keccak(preimage)
}

/// `keccak256(0xff ++ deployer ++ salt ++ init_code_hash)[12..]`
pub fn compute_create2_address(deployer: Address, salt: H256, init_code_hash: H256) -> Address {
    let mut preimage = [0u8; 85];
    preimage[0] = 0xff;
    preimage[1..21].copy_from_slice(deployer.as_bytes());
    preimage[21..53].copy_from_slice(salt.as_bytes());
    preimage[53..].copy_from_slice(init_code_hash.as_bytes());
    Address::from(keccak(preimage))
}

/// Counterfactual wallet addresses for factories sharing one wallet
/// implementation. The init code hash is computed once on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletAddressCalculator {
    init_code_hash: H256,
}

impl WalletAddressCalculator {
    /// `wallet_implementation` is what the factory reports through
    /// `walletImplementation()`, the forwarding proxy in a standard
    /// deployment.
    pub fn new(wallet_implementation: Address) -> Self {
        Self {
            init_code_hash: keccak(minimal_proxy_creation_code(wallet_implementation)),
        }
    }

    pub fn init_code_hash(&self) -> H256 {
        self.init_code_hash
    }

    /// Same result for the same triple whether or not the wallet exists yet.
    pub fn compute_wallet_address(
        &self,
        factory: Address,
        owner: Address,
        salt: U256,
    ) -> ComputedWalletAddress {
        ComputedWalletAddress {
            owner,
            salt,
            address: compute_create2_address(factory, wallet_salt(owner, salt), self.init_code_hash),
        }
    }
}

pub fn compute_wallet_address(
    factory: Address,
    owner: Address,
    salt: U256,
    wallet_implementation: Address,
) -> Address {
    WalletAddressCalculator::new(wallet_implementation)
        .compute_wallet_address(factory, owner, salt)
        .address
}
