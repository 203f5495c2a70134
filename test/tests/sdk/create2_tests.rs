use hebao_common::{Address, U256};
use hebao_sdk::{
    WalletAddressCalculator,
    create2::{compute_wallet_address, minimal_proxy_creation_code},
};
use hex_literal::hex;

const FACTORY: Address = Address::repeat_byte(0xfa);
const OWNER: Address = Address::repeat_byte(0x0e);
const IMPLEMENTATION: Address = Address::repeat_byte(0x1e);

#[test]
fn same_inputs_give_the_same_address() {
    let first = compute_wallet_address(FACTORY, OWNER, U256::from(1000), IMPLEMENTATION);
    let second = compute_wallet_address(FACTORY, OWNER, U256::from(1000), IMPLEMENTATION);
    let next_salt = compute_wallet_address(FACTORY, OWNER, U256::from(1001), IMPLEMENTATION);

    assert_eq!(first, second);
    assert_ne!(first, next_salt);
}

#[test]
fn every_input_changes_the_address() {
    let base = compute_wallet_address(FACTORY, OWNER, U256::from(1), IMPLEMENTATION);
    let other = Address::repeat_byte(0x99);

    assert_ne!(base, compute_wallet_address(other, OWNER, U256::from(1), IMPLEMENTATION));
    assert_ne!(base, compute_wallet_address(FACTORY, other, U256::from(1), IMPLEMENTATION));
    assert_ne!(base, compute_wallet_address(FACTORY, OWNER, U256::from(1), other));
}

#[test]
fn calculator_matches_free_function() {
    let calculator = WalletAddressCalculator::new(IMPLEMENTATION);
    let computed = calculator.compute_wallet_address(FACTORY, OWNER, U256::from(42));

    assert_eq!(computed.owner, OWNER);
    assert_eq!(computed.salt, U256::from(42));
    assert_eq!(
        computed.address,
        compute_wallet_address(FACTORY, OWNER, U256::from(42), IMPLEMENTATION)
    );
}

#[test]
fn proxy_creation_code_is_eip1167() {
    let code = minimal_proxy_creation_code(IMPLEMENTATION);
    assert_eq!(&code[..20], &hex!("3d602d80600a3d3981f3363d3d373d3d3d363d73"));
    assert_eq!(&code[20..40], IMPLEMENTATION.as_bytes());
    assert_eq!(&code[40..], &hex!("5af43d82803e903d91602b57fd5bf3"));
}
