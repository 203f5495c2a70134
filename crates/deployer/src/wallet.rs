//! Relayed creation of counterfactual wallets through a deployed factory.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use hebao_common::{
    Address, H256, U256,
    types::{ComputedWalletAddress, CreationAuthorization, WalletConfig},
};
use hebao_rpc::{ChainProvider, ProviderError, TransactionRequest};
use hebao_sdk::{
    AuthorizationError, CalldataEncodeError, CreationValidator, Value, WalletAddressCalculator,
    encode_calldata,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::confirmation::{ConfirmationError, ConfirmationPolicy, wait_for_confirmation};

const CREATE_WALLET_SIGNATURE: &str = "createWallet((address,address[],uint256,address,address,address,uint256,uint256,bytes),uint256)";
const WALLET_IMPLEMENTATION_SIGNATURE: &str = "walletImplementation()";

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("Wallet creation failed: {0}")]
    Confirmation(#[from] ConfirmationError),
    #[error("Failed to encode calldata: {0}")]
    CalldataEncodeError(#[from] CalldataEncodeError),
    #[error("Factory returned an invalid wallet implementation: 0x{0}")]
    InvalidImplementation(String),
    #[error("Failed to lock the salt registry")]
    RegistryPoisoned,
}

/// A wallet the factory created and the chain confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedWallet {
    pub address: Address,
    pub tx_hash: H256,
    pub block_number: u64,
}

/// (owner, salt) pairs claimed through this process. A pair stays claimed
/// once its creation was sent, unless the transaction was rejected or
/// reverted.
#[derive(Debug, Default, Clone)]
pub struct SaltRegistry(Arc<Mutex<HashSet<(Address, U256)>>>);

impl SaltRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the pair, failing with `SaltReuse` if it is already taken.
    pub fn reserve(&self, owner: Address, salt: U256) -> Result<(), WalletError> {
        let mut used = self.0.lock().map_err(|_| WalletError::RegistryPoisoned)?;
        if !used.insert((owner, salt)) {
            return Err(AuthorizationError::SaltReuse { owner, salt }.into());
        }
        Ok(())
    }

    pub fn release(&self, owner: Address, salt: U256) {
        match self.0.lock() {
            Ok(mut used) => {
                used.remove(&(owner, salt));
            }
            Err(_) => warn!(owner = ?owner, %salt, "Salt registry poisoned, reservation kept"),
        }
    }

    pub fn contains(&self, owner: Address, salt: U256) -> bool {
        self.0
            .lock()
            .map(|used| used.contains(&(owner, salt)))
            .unwrap_or(false)
    }
}

pub struct WalletCreator {
    provider: Arc<dyn ChainProvider>,
    factory: Address,
    validator: CreationValidator,
    registry: SaltRegistry,
    calculator: OnceCell<(WalletAddressCalculator, Address)>,
    gas_limit: u64,
    policy: ConfirmationPolicy,
}

impl WalletCreator {
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        factory: Address,
        validator: CreationValidator,
        gas_limit: u64,
        policy: ConfirmationPolicy,
    ) -> Self {
        Self {
            provider,
            factory,
            validator,
            registry: SaltRegistry::new(),
            calculator: OnceCell::new(),
            gas_limit,
            policy,
        }
    }

    /// Shares `registry` with other creators of the same process.
    pub fn with_registry(mut self, registry: SaltRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn registry(&self) -> &SaltRegistry {
        &self.registry
    }

    /// The factory's `walletImplementation()`, read once.
    pub async fn wallet_implementation(&self) -> Result<Address, WalletError> {
        Ok(self.calculator().await?.1)
    }

    async fn calculator(&self) -> Result<(WalletAddressCalculator, Address), WalletError> {
        let cached = self
            .calculator
            .get_or_try_init(|| async {
                let implementation = self.fetch_wallet_implementation().await?;
                debug!(factory = ?self.factory, implementation = ?implementation, "Wallet implementation fetched");
                Ok::<_, WalletError>((WalletAddressCalculator::new(implementation), implementation))
            })
            .await?;
        Ok(*cached)
    }

    async fn fetch_wallet_implementation(&self) -> Result<Address, WalletError> {
        let output = self
            .provider
            .call(self.factory, wallet_implementation_calldata()?.into())
            .await?;
        decode_wallet_implementation(&output)
    }

    /// Address the factory will create for (owner, salt).
    pub async fn compute_address(
        &self,
        owner: Address,
        salt: U256,
    ) -> Result<ComputedWalletAddress, WalletError> {
        let (calculator, _) = self.calculator().await?;
        Ok(calculator.compute_wallet_address(self.factory, owner, salt))
    }

    /// Checks `authorization`, then asks the factory to create the wallet
    /// and waits for the creation to be confirmed. `fee_amount` is what the
    /// relayer charges, bounded on chain by `max_fee_amount`.
    pub async fn create_wallet(
        &self,
        authorization: &CreationAuthorization,
        fee_amount: U256,
    ) -> Result<CreatedWallet, WalletError> {
        if authorization.factory != self.factory {
            return Err(AuthorizationError::FactoryMismatch {
                signed: authorization.factory,
                expected: self.factory,
            }
            .into());
        }
        let owner = self.validator.verify_authorization(authorization)?;
        let salt = authorization.config.salt;
        let computed = self.compute_address(owner, salt).await?;

        self.registry.reserve(owner, salt)?;
        match self.submit_creation(authorization, fee_amount, computed).await {
            Ok(created) => Ok(created),
            Err(error) => {
                if releases_reservation(&error) {
                    self.registry.release(owner, salt);
                }
                Err(error)
            }
        }
    }

    async fn submit_creation(
        &self,
        authorization: &CreationAuthorization,
        fee_amount: U256,
        computed: ComputedWalletAddress,
    ) -> Result<CreatedWallet, WalletError> {
        let code = self.provider.get_code(computed.address).await?;
        if !code.is_empty() {
            return Err(AuthorizationError::SaltReuse {
                owner: computed.owner,
                salt: computed.salt,
            }
            .into());
        }

        let calldata = encode_calldata(
            CREATE_WALLET_SIGNATURE,
            &[
                wallet_config_value(&authorization.config, &authorization.signature),
                Value::Uint(fee_amount),
            ],
        )?;
        let tx_hash = self
            .provider
            .submit_transaction(TransactionRequest::call(
                self.factory,
                calldata.into(),
                self.gas_limit,
            ))
            .await?;

        let (receipt, _) = wait_for_confirmation(self.provider.as_ref(), tx_hash, &self.policy).await?;
        info!(
            owner = ?computed.owner,
            salt = %computed.salt,
            wallet = ?computed.address,
            tx_hash = ?tx_hash,
            "Wallet created"
        );
        Ok(CreatedWallet {
            address: computed.address,
            tx_hash,
            block_number: receipt.block_number,
        })
    }
}

/// A reservation is kept when the salt may be consumed on chain: the wallet
/// already exists, or a creation was sent and might still be mined.
fn releases_reservation(error: &WalletError) -> bool {
    !matches!(
        error,
        WalletError::Authorization(AuthorizationError::SaltReuse { .. })
            | WalletError::Confirmation(ConfirmationError::Timeout(_))
    )
}

/// The factory's `WalletConfig` tuple, signature last.
fn wallet_config_value(config: &WalletConfig, signature: &Bytes) -> Value {
    Value::Tuple(vec![
        Value::Address(config.owner),
        Value::Array(config.guardians.iter().copied().map(Value::Address).collect()),
        Value::Uint(config.quota),
        Value::Address(config.inheritor),
        Value::Address(config.fee_recipient),
        Value::Address(config.fee_token),
        Value::Uint(config.max_fee_amount),
        Value::Uint(config.salt),
        Value::Bytes(signature.clone()),
    ])
}

/// Calldata of the factory's `walletImplementation()` view.
pub fn wallet_implementation_calldata() -> Result<Vec<u8>, CalldataEncodeError> {
    encode_calldata(WALLET_IMPLEMENTATION_SIGNATURE, &[])
}

/// Decodes the address word `walletImplementation()` returns.
pub fn decode_wallet_implementation(output: &[u8]) -> Result<Address, WalletError> {
    if output.len() != 32 || output[..12].iter().any(|byte| *byte != 0) {
        return Err(WalletError::InvalidImplementation(hex::encode(output)));
    }
    Ok(Address::from_slice(&output[12..]))
}
