use std::collections::BTreeMap;

use hebao_common::Address;
use hebao_sdk::{
    ContractArtifact, LinkError, link_bytecode, linker::is_fully_linked,
    resolve_deployment_order,
};

use crate::fixtures::artifact;

fn addresses() -> BTreeMap<String, Address> {
    BTreeMap::from([
        ("A".to_string(), Address::repeat_byte(0xaa)),
        ("B".to_string(), Address::repeat_byte(0xbb)),
    ])
}

#[test]
fn linking_the_last_contract_leaves_no_placeholders() {
    let artifacts = vec![
        artifact("A", &[]),
        artifact("B", &["A"]),
        artifact("C", &["A", "B"]),
    ];
    let order = resolve_deployment_order(&artifacts).expect("acyclic");
    let c = order.last().expect("three contracts");
    assert!(!is_fully_linked(&c.bytecode));

    let linked = link_bytecode(c, &addresses()).expect("links");

    assert!(is_fully_linked(&hex::encode(&linked)));
    for address in addresses().values() {
        assert!(linked.windows(20).any(|window| window == address.as_bytes()));
    }
}

#[test]
fn linking_is_deterministic_and_idempotent() {
    let c = artifact("C", &["A", "B"]);
    let first = link_bytecode(&c, &addresses()).expect("links");
    assert_eq!(first, link_bytecode(&c, &addresses()).expect("links"));

    // Unrelated addresses do not change the output.
    let mut more = addresses();
    more.insert("Z".to_string(), Address::repeat_byte(0x11));
    assert_eq!(first, link_bytecode(&c, &more).expect("links"));

    // Patching already linked code with the same addresses is a no-op.
    let relinked = ContractArtifact::new("C", hex::encode(&first), c.link_references.clone());
    assert_eq!(first, link_bytecode(&relinked, &addresses()).expect("links"));
}

#[test]
fn missing_address_names_the_library() {
    let c = artifact("C", &["A", "B"]);
    let mut addresses = addresses();
    addresses.remove("B");

    assert_eq!(
        link_bytecode(&c, &addresses),
        Err(LinkError::MissingLinkAddress {
            contract: "C".to_string(),
            library: "B".to_string(),
        })
    );
}
