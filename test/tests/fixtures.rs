use hebao_deployer::DeploymentPlan;
use hebao_sdk::{
    ContractArtifact, LinkOffset, LinkReference, artifact::library_placeholder,
};

/// Creation code that embeds one placeholder per dependency, each preceded
/// by a PUSH20 opcode.
pub fn artifact(name: &str, dependencies: &[&str]) -> ContractArtifact {
    let mut bytecode = String::from("6080604052");
    let mut link_references = Vec::new();
    for dependency in dependencies {
        let source = format!("contracts/lib/{dependency}.sol");
        bytecode.push_str("73");
        let start = bytecode.len() / 2;
        bytecode.push_str(&library_placeholder(&format!("{source}:{dependency}")));
        link_references.push(LinkReference {
            source,
            library: dependency.to_string(),
            offsets: vec![LinkOffset { start, length: 20 }],
        });
    }
    // Distinguishes otherwise identical contracts.
    bytecode.push_str(&hex::encode(name.as_bytes()));
    ContractArtifact::new(name, bytecode, link_references)
}

/// Three libraries (`GuardianLib` depends on `ERC20Lib`) and the four
/// infrastructure contracts, with the implementation linking all three.
pub fn small_plan() -> DeploymentPlan {
    DeploymentPlan {
        libraries: vec![
            artifact("GuardianLib", &["ERC20Lib"]),
            artifact("ERC20Lib", &[]),
            artifact("QuotaLib", &[]),
        ],
        implementation: artifact("SmartWallet", &["ERC20Lib", "GuardianLib", "QuotaLib"]),
        manager: artifact("DelayedImplementationManager", &[]),
        proxy: artifact("ForwardProxy", &[]),
        factory: artifact("WalletFactory", &[]),
    }
}

pub const LIBRARY_ORDER: [&str; 3] = ["ERC20Lib", "GuardianLib", "QuotaLib"];
