use std::{sync::Arc, time::Duration};

use hebao_common::{
    Address, U256,
    types::{CreationAuthorization, LocalSigner, WalletConfig},
};
use hebao_deployer::{ConfirmationError, ConfirmationPolicy, WalletCreator, WalletError};
use hebao_rpc::ChainProvider;
use hebao_sdk::{AuthorizationError, CreationValidator, create2::compute_wallet_address};
use hex_literal::hex;
use secp256k1::SecretKey;

use super::mock::MockChain;

const CHAIN_ID: u64 = 5;
const FACTORY: Address = Address::repeat_byte(0xfa);
const IMPLEMENTATION: Address = Address::repeat_byte(0x77);

fn signer(key: [u8; 32]) -> LocalSigner {
    LocalSigner::new(SecretKey::from_slice(&key).expect("valid key"))
}

fn owner() -> LocalSigner {
    signer(hex!(
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
    ))
}

fn authorization(salt: u64) -> CreationAuthorization {
    let owner = owner();
    let config = WalletConfig {
        guardians: vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)],
        quota: U256::from(10u64).pow(U256::from(18)),
        max_fee_amount: U256::from(1_000),
        ..WalletConfig::bare(owner.address(), U256::from(salt))
    };
    CreationValidator::new(CHAIN_ID)
        .authorize(config, FACTORY, &owner)
        .expect("signs")
}

fn chain() -> MockChain {
    let chain = MockChain::new();
    chain.set_wallet_implementation(IMPLEMENTATION);
    chain
}

fn creator(chain: &MockChain) -> WalletCreator {
    WalletCreator::new(
        Arc::new(chain.clone()),
        FACTORY,
        CreationValidator::new(CHAIN_ID),
        1_000_000,
        ConfirmationPolicy {
            confirmations: 1,
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        },
    )
}

#[tokio::test]
async fn creates_wallet_at_the_counterfactual_address() {
    let chain = chain();
    let creator = creator(&chain);
    let owner = owner().address();

    let computed = creator
        .compute_address(owner, U256::from(1000))
        .await
        .expect("computes");
    assert_eq!(
        computed.address,
        compute_wallet_address(FACTORY, owner, U256::from(1000), IMPLEMENTATION)
    );
    assert_eq!(
        creator.wallet_implementation().await.expect("reads"),
        IMPLEMENTATION
    );

    let created = creator
        .create_wallet(&authorization(1000), U256::from(10))
        .await
        .expect("wallet is created");

    assert_eq!(created.address, computed.address);
    assert!(
        !chain
            .get_code(created.address)
            .await
            .expect("code")
            .is_empty()
    );
    let submitted = chain.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].to, Some(FACTORY));
}

#[tokio::test]
async fn second_creation_with_same_salt_is_rejected() {
    let chain = chain();
    let creator = creator(&chain);
    creator
        .create_wallet(&authorization(7), U256::zero())
        .await
        .expect("first creation");

    let error = creator
        .create_wallet(&authorization(7), U256::zero())
        .await
        .expect_err("salt reuse");
    assert!(matches!(
        error,
        WalletError::Authorization(AuthorizationError::SaltReuse { .. })
    ));

    // A fresh process has no reservations but sees the deployed code.
    let error = self::creator(&chain)
        .create_wallet(&authorization(7), U256::zero())
        .await
        .expect_err("wallet already exists");
    assert!(matches!(
        error,
        WalletError::Authorization(AuthorizationError::SaltReuse { .. })
    ));
    assert_eq!(chain.submitted().len(), 1);

    creator
        .create_wallet(&authorization(8), U256::zero())
        .await
        .expect("other salt is free");
}

#[tokio::test]
async fn authorization_for_another_factory_is_rejected() {
    let chain = chain();
    let mut authorization = authorization(1);
    authorization.factory = Address::repeat_byte(0xfb);

    let error = creator(&chain)
        .create_wallet(&authorization, U256::zero())
        .await
        .expect_err("factory mismatch");

    assert!(matches!(
        error,
        WalletError::Authorization(AuthorizationError::FactoryMismatch { .. })
    ));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn signature_from_someone_else_is_rejected() {
    let chain = chain();
    let intruder = signer(hex!(
        "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
    ));
    let mut authorization = authorization(1);
    authorization.signature = CreationValidator::new(CHAIN_ID)
        .sign_creation(&authorization.config, FACTORY, &intruder)
        .expect("signs");

    let error = creator(&chain)
        .create_wallet(&authorization, U256::zero())
        .await
        .expect_err("invalid signature");

    assert!(matches!(
        error,
        WalletError::Authorization(AuthorizationError::InvalidSignature { .. })
    ));
    assert!(chain.submitted().is_empty());
}

#[tokio::test]
async fn rejected_submission_frees_the_salt() {
    let chain = chain();
    let creator = creator(&chain);
    chain.reject_attempt(0);

    let error = creator
        .create_wallet(&authorization(3), U256::zero())
        .await
        .expect_err("node rejects");
    assert!(matches!(error, WalletError::Provider(_)));
    assert!(!creator.registry().contains(owner().address(), U256::from(3)));

    chain.heal();
    creator
        .create_wallet(&authorization(3), U256::zero())
        .await
        .expect("retry succeeds");
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_creation_keeps_the_salt() {
    let chain = chain();
    let creator = creator(&chain);
    chain.never_mine();

    let error = creator
        .create_wallet(&authorization(4), U256::zero())
        .await
        .expect_err("never mined");
    assert!(matches!(
        error,
        WalletError::Confirmation(ConfirmationError::Timeout(_))
    ));
    assert!(creator.registry().contains(owner().address(), U256::from(4)));
}
