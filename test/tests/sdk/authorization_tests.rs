use hebao_common::{
    Address, U256,
    types::{LocalSigner, WalletConfig},
};
use hebao_sdk::{AuthorizationError, CreationValidator};
use hex_literal::hex;
use secp256k1::SecretKey;

const FACTORY: Address = Address::repeat_byte(0xfa);

fn owner() -> LocalSigner {
    LocalSigner::new(
        SecretKey::from_slice(&hex!(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        ))
        .expect("valid key"),
    )
}

fn config(owner: Address) -> WalletConfig {
    WalletConfig {
        owner,
        guardians: vec![Address::repeat_byte(0x01), Address::repeat_byte(0x02)],
        quota: U256::from(5_000),
        inheritor: Address::repeat_byte(0x03),
        fee_recipient: Address::repeat_byte(0x04),
        fee_token: Address::zero(),
        max_fee_amount: U256::from(100),
        salt: U256::from(1000),
    }
}

#[test]
fn round_trip_recovers_the_owner() {
    let owner = owner();
    let validator = CreationValidator::new(1);
    let authorization = validator
        .authorize(config(owner.address()), FACTORY, &owner)
        .expect("signs");

    assert_eq!(authorization.signature.len(), 65);
    assert_eq!(
        validator.verify_authorization(&authorization),
        Ok(owner.address())
    );
}

#[test]
fn mutating_any_field_invalidates_the_signature() {
    let owner = owner();
    let validator = CreationValidator::new(1);
    let signed = config(owner.address());
    let signature = validator
        .sign_creation(&signed, FACTORY, &owner)
        .expect("signs");

    let mutations: Vec<Box<dyn Fn(&mut WalletConfig)>> = vec![
        Box::new(|c: &mut WalletConfig| c.guardians.push(Address::repeat_byte(0x09))),
        Box::new(|c: &mut WalletConfig| c.guardians.swap(0, 1)),
        Box::new(|c: &mut WalletConfig| c.quota += U256::one()),
        Box::new(|c: &mut WalletConfig| c.inheritor = Address::zero()),
        Box::new(|c: &mut WalletConfig| c.fee_recipient = Address::repeat_byte(0x05)),
        Box::new(|c: &mut WalletConfig| c.fee_token = Address::repeat_byte(0x06)),
        Box::new(|c: &mut WalletConfig| c.max_fee_amount = U256::from(101)),
        Box::new(|c: &mut WalletConfig| c.salt = U256::from(1001)),
    ];
    for mutate in mutations {
        let mut config = signed.clone();
        mutate(&mut config);
        assert_eq!(
            validator.verify(&config, FACTORY, &signature),
            Err(AuthorizationError::InvalidSignature {
                owner: owner.address()
            })
        );
    }

    // Claiming another owner is rejected against that owner.
    let mut config = signed.clone();
    config.owner = Address::repeat_byte(0x07);
    assert!(matches!(
        validator.verify(&config, FACTORY, &signature),
        Err(AuthorizationError::InvalidSignature { .. })
    ));
}

#[test]
fn signature_is_bound_to_factory_and_chain() {
    let owner = owner();
    let config = config(owner.address());
    let signature = CreationValidator::new(1)
        .sign_creation(&config, FACTORY, &owner)
        .expect("signs");

    assert!(
        CreationValidator::new(1)
            .verify(&config, Address::repeat_byte(0xfb), &signature)
            .is_err()
    );
    assert!(
        CreationValidator::new(5)
            .verify(&config, FACTORY, &signature)
            .is_err()
    );
}

#[test]
fn truncated_signature_is_malformed() {
    let owner = owner();
    let config = config(owner.address());
    let signature = CreationValidator::new(1)
        .sign_creation(&config, FACTORY, &owner)
        .expect("signs");

    assert!(matches!(
        CreationValidator::new(1).verify(&config, FACTORY, &signature[..64]),
        Err(AuthorizationError::MalformedSignature(_))
    ));
}
