use ethereum_types::{Address, H256};
use keccak_hash::keccak;
use secp256k1::{
    Message, PublicKey, SECP256K1, SecretKey,
    ecdsa::{RecoverableSignature, RecoveryId},
};

/// A recoverable secp256k1 signature split into its components.
/// `recovery_id` is 0 or 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSig {
    pub r: H256,
    pub s: H256,
    pub recovery_id: u8,
}

impl RecoverableSig {
    /// 65-byte `r ++ s ++ v` encoding with `v = recovery_id + 27`.
    pub fn to_rsv_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(self.r.as_bytes());
        out[32..64].copy_from_slice(self.s.as_bytes());
        out[64] = self.recovery_id + 27;
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Invalid recovery id {0}")]
    InvalidRecoveryId(i32),
    #[error("Failed to recover public key: {0}")]
    Recovery(#[from] secp256k1::Error),
}

#[derive(Clone, Debug)]
pub struct LocalSigner {
    private_key: SecretKey,
    pub address: Address,
}

impl LocalSigner {
    pub fn new(private_key: SecretKey) -> Self {
        let address = public_key_to_address(&private_key.public_key(SECP256K1));
        Self {
            private_key,
            address,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs an already hashed 32-byte digest.
    pub fn sign_digest(&self, digest: H256) -> RecoverableSig {
        let msg = Message::from_digest(digest.0);
        let (recovery_id, signature) = SECP256K1
            .sign_ecdsa_recoverable(&msg, &self.private_key)
            .serialize_compact();

        RecoverableSig {
            r: H256::from_slice(&signature[..32]),
            s: H256::from_slice(&signature[32..]),
            // recovery ids are always 0..=3
            recovery_id: recovery_id.to_i32() as u8,
        }
    }

    /// Keccak-hashes `data` and signs the digest.
    pub fn sign(&self, data: &[u8]) -> RecoverableSig {
        self.sign_digest(keccak(data))
    }
}

pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    Address::from(keccak(&public_key.serialize_uncompressed()[1..]))
}

/// Recovers the address that produced `sig` over `digest`.
pub fn recover_address(digest: H256, sig: &RecoverableSig) -> Result<Address, SignerError> {
    let recovery_id = RecoveryId::from_i32(i32::from(sig.recovery_id))
        .map_err(|_| SignerError::InvalidRecoveryId(i32::from(sig.recovery_id)))?;
    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(sig.r.as_bytes());
    compact[32..].copy_from_slice(sig.s.as_bytes());
    let signature = RecoverableSignature::from_compact(&compact, recovery_id)?;
    let public_key = SECP256K1.recover_ecdsa(&Message::from_digest(digest.0), &signature)?;
    Ok(public_key_to_address(&public_key))
}
