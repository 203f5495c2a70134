//! Owner approval of relayed wallet creation.
//!
//! The owner signs an EIP-712 message over every field of the wallet config,
//! bound to one factory on one chain. The factory recomputes the same digest
//! on chain, so the encoding here has to match it byte for byte.

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hebao_common::{
    types::{CreationAuthorization, LocalSigner, RecoverableSig, WalletConfig, recover_address},
    utils::{address_to_word, keccak},
};

use crate::calldata::{CalldataEncodeError, Value, encode_tuple};

pub const DOMAIN_NAME: &str = "WalletFactory";
pub const DOMAIN_VERSION: &str = "2.0.0";

const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
const CREATE_WALLET_TYPE: &str = "createWallet(address owner,address[] guardians,uint256 quota,address inheritor,address feeRecipient,address feeToken,uint256 maxFeeAmount,uint256 salt)";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Signature does not recover to the wallet owner {owner:?}")]
    InvalidSignature { owner: Address },
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Salt {salt} was already used for owner {owner:?}")]
    SaltReuse { owner: Address, salt: U256 },
    #[error("Authorization is for factory {signed:?}, not {expected:?}")]
    FactoryMismatch { signed: Address, expected: Address },
    #[error("Failed to encode creation message: {0}")]
    Encoding(#[from] CalldataEncodeError),
}

/// Checks creation authorizations for factories on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationValidator {
    chain_id: u64,
}

impl CreationValidator {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn domain_separator(&self, factory: Address) -> Result<H256, AuthorizationError> {
        let encoded = encode_tuple(&[
            Value::FixedBytes(Bytes::copy_from_slice(
                keccak(EIP712_DOMAIN_TYPE.as_bytes()).as_bytes(),
            )),
            Value::FixedBytes(Bytes::copy_from_slice(
                keccak(DOMAIN_NAME.as_bytes()).as_bytes(),
            )),
            Value::FixedBytes(Bytes::copy_from_slice(
                keccak(DOMAIN_VERSION.as_bytes()).as_bytes(),
            )),
            Value::Uint(U256::from(self.chain_id)),
            Value::Address(factory),
        ])?;
        Ok(keccak(encoded))
    }

    /// `keccak256(0x1901 ++ domainSeparator ++ hashStruct(config))`
    pub fn creation_digest(
        &self,
        config: &WalletConfig,
        factory: Address,
    ) -> Result<H256, AuthorizationError> {
        let mut preimage = Vec::with_capacity(66);
        preimage.extend_from_slice(&[0x19, 0x01]);
        preimage.extend_from_slice(self.domain_separator(factory)?.as_bytes());
        preimage.extend_from_slice(struct_hash(config)?.as_bytes());
        Ok(keccak(preimage))
    }

    /// Returns the owner when `signature` is the owner's signature over
    /// `config` for `factory`. Has no side effects.
    pub fn verify(
        &self,
        config: &WalletConfig,
        factory: Address,
        signature: &[u8],
    ) -> Result<Address, AuthorizationError> {
        let sig = parse_signature(signature)?;
        let digest = self.creation_digest(config, factory)?;
        let signer = recover_address(digest, &sig)
            .map_err(|err| AuthorizationError::MalformedSignature(err.to_string()))?;

        if signer != config.owner {
            return Err(AuthorizationError::InvalidSignature {
                owner: config.owner,
            });
        }
        Ok(signer)
    }

    pub fn verify_authorization(
        &self,
        authorization: &CreationAuthorization,
    ) -> Result<Address, AuthorizationError> {
        self.verify(
            &authorization.config,
            authorization.factory,
            &authorization.signature,
        )
    }

    /// Produces the 65-byte `r ++ s ++ v` signature `verify` accepts.
    pub fn sign_creation(
        &self,
        config: &WalletConfig,
        factory: Address,
        signer: &LocalSigner,
    ) -> Result<Bytes, AuthorizationError> {
        let digest = self.creation_digest(config, factory)?;
        Ok(Bytes::copy_from_slice(
            &signer.sign_digest(digest).to_rsv_bytes(),
        ))
    }

    pub fn authorize(
        &self,
        config: WalletConfig,
        factory: Address,
        signer: &LocalSigner,
    ) -> Result<CreationAuthorization, AuthorizationError> {
        let signature = self.sign_creation(&config, factory, signer)?;
        Ok(CreationAuthorization {
            config,
            factory,
            signature,
        })
    }
}

/// EIP-712 `hashStruct` of the creation message. Guardians are hashed as the
/// concatenation of their left-padded 32-byte words.
pub fn struct_hash(config: &WalletConfig) -> Result<H256, AuthorizationError> {
    let guardians: Vec<u8> = config
        .guardians
        .iter()
        .flat_map(|guardian| address_to_word(*guardian))
        .collect();

    let encoded = encode_tuple(&[
        Value::FixedBytes(Bytes::copy_from_slice(
            keccak(CREATE_WALLET_TYPE.as_bytes()).as_bytes(),
        )),
        Value::Address(config.owner),
        Value::FixedBytes(Bytes::copy_from_slice(keccak(guardians).as_bytes())),
        Value::Uint(config.quota),
        Value::Address(config.inheritor),
        Value::Address(config.fee_recipient),
        Value::Address(config.fee_token),
        Value::Uint(config.max_fee_amount),
        Value::Uint(config.salt),
    ])?;
    Ok(keccak(encoded))
}

fn parse_signature(signature: &[u8]) -> Result<RecoverableSig, AuthorizationError> {
    if signature.len() != 65 {
        return Err(AuthorizationError::MalformedSignature(format!(
            "expected 65 bytes, got {}",
            signature.len()
        )));
    }
    let v = signature[64];
    if v != 27 && v != 28 {
        return Err(AuthorizationError::MalformedSignature(format!(
            "recovery byte {v} is not 27 or 28"
        )));
    }
    Ok(RecoverableSig {
        r: H256::from_slice(&signature[..32]),
        s: H256::from_slice(&signature[32..64]),
        recovery_id: v - 27,
    })
}
