use alloy_rlp::{BufMut, Encodable, Header};
use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use hebao_common::{
    types::{LocalSigner, RecoverableSig},
    utils::{keccak, u256_to_trimmed_bytes},
};

pub const EIP1559_TX_TYPE: u8 = 0x02;

/// A type 2 (EIP-1559) transaction. `to == None` deploys `data` as creation
/// code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Eip1559Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas_limit: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
}

impl Eip1559Transaction {
    /// Hash the sender signs: `keccak256(0x02 ++ rlp(fields))`.
    pub fn signing_hash(&self) -> H256 {
        keccak(self.encode_typed(None))
    }

    pub fn sign(&self, signer: &LocalSigner) -> SignedTransaction {
        let signature = signer.sign_digest(self.signing_hash());
        let raw = self.encode_typed(Some(&signature));
        SignedTransaction {
            hash: keccak(&raw),
            raw: Bytes::from(raw),
        }
    }

    fn encode_typed(&self, signature: Option<&RecoverableSig>) -> Vec<u8> {
        let mut payload = Vec::new();
        self.chain_id.encode(&mut payload);
        self.nonce.encode(&mut payload);
        encode_u256(self.max_priority_fee_per_gas, &mut payload);
        encode_u256(self.max_fee_per_gas, &mut payload);
        self.gas_limit.encode(&mut payload);
        match self.to {
            Some(to) => to.0.encode(&mut payload),
            None => [0u8; 0].as_slice().encode(&mut payload),
        }
        encode_u256(self.value, &mut payload);
        self.data.encode(&mut payload);
        // empty access list
        Header {
            list: true,
            payload_length: 0,
        }
        .encode(&mut payload);

        if let Some(signature) = signature {
            signature.recovery_id.encode(&mut payload);
            trim_leading_zeros(signature.r.as_bytes()).encode(&mut payload);
            trim_leading_zeros(signature.s.as_bytes()).encode(&mut payload);
        }

        let mut out = Vec::with_capacity(payload.len() + 4);
        out.push(EIP1559_TX_TYPE);
        Header {
            list: true,
            payload_length: payload.len(),
        }
        .encode(&mut out);
        out.extend_from_slice(&payload);
        out
    }
}

/// Address of a contract created by `sender` with a plain CREATE at `nonce`.
pub fn create_address(sender: Address, nonce: u64) -> Address {
    let mut payload = Vec::new();
    sender.0.encode(&mut payload);
    nonce.encode(&mut payload);

    let mut out = Vec::with_capacity(payload.len() + 1);
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut out);
    out.extend_from_slice(&payload);
    Address::from(keccak(out))
}

fn encode_u256(value: U256, out: &mut dyn BufMut) {
    u256_to_trimmed_bytes(value).as_slice().encode(out);
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first_non_zero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first_non_zero..]
}
