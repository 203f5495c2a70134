use std::collections::BTreeMap;

use hebao_common::{Address, types::DeploymentManifest};
use hebao_sdk::{CalldataEncodeError, ContractArtifact, Value, encode_tuple};
use reqwest::Client;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

use crate::{config::DeploymentConfig, orchestrator::DeploymentPlan};

#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Explorer rejected verification of {contract}: {message}")]
    Rejected { contract: String, message: String },
    #[error("Failed to encode constructor arguments: {0}")]
    CalldataEncodeError(#[from] CalldataEncodeError),
    #[error("Invalid compiler input for {contract}: {message}")]
    InvalidCompilerInput { contract: String, message: String },
}

/// One source verification submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub address: Address,
    /// `source.sol:Name` when the source file is known.
    pub contract_name: String,
    pub constructor_arguments: Vec<u8>,
    pub libraries: BTreeMap<String, Address>,
    /// Standard JSON input of the compilation with the linked library
    /// addresses filled in.
    pub source: Option<String>,
    /// As the explorer expects it, e.g. `v0.7.6+commit.7338295f`.
    pub compiler_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: serde_json::Value,
}

/// Client for Etherscan compatible `verifysourcecode` endpoints.
#[derive(Debug, Clone)]
pub struct ExplorerVerifier {
    client: Client,
    api_url: Url,
    api_key: String,
}

impl ExplorerVerifier {
    pub fn new(api_url: Url, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }

    pub fn form_fields(&self, request: &VerificationRequest) -> Vec<(String, String)> {
        let mut fields = vec![
            ("apikey".to_string(), self.api_key.clone()),
            ("module".to_string(), "contract".to_string()),
            ("action".to_string(), "verifysourcecode".to_string()),
            (
                "contractaddress".to_string(),
                format!("{:#x}", request.address),
            ),
            ("contractname".to_string(), request.contract_name.clone()),
            (
                "constructorArguements".to_string(),
                hex::encode(&request.constructor_arguments),
            ),
        ];
        if let Some(source) = &request.source {
            fields.push(("codeformat".to_string(), "solidity-standard-json-input".to_string()));
            fields.push(("sourceCode".to_string(), source.clone()));
        }
        if let Some(compiler_version) = &request.compiler_version {
            fields.push(("compilerversion".to_string(), compiler_version.clone()));
        }
        for (i, (name, address)) in request.libraries.iter().enumerate() {
            fields.push((format!("libraryname{}", i + 1), name.clone()));
            fields.push((format!("libraryaddress{}", i + 1), format!("{address:#x}")));
        }
        fields
    }

    /// Submits `request` and returns the explorer's tracking id.
    pub async fn submit(&self, request: &VerificationRequest) -> Result<String, ExplorerError> {
        let response: ExplorerResponse = self
            .client
            .post(self.api_url.as_str())
            .form(&self.form_fields(request))
            .send()
            .await?
            .json()
            .await?;

        let result = match response.result {
            serde_json::Value::String(result) => result,
            other => other.to_string(),
        };
        if response.status != "1" {
            return Err(ExplorerError::Rejected {
                contract: request.contract_name.clone(),
                message: format!("{} {}", response.message, result),
            });
        }
        info!(contract = %request.contract_name, guid = %result, "Verification submitted");
        Ok(result)
    }

    /// Submits every request in the background. Failures are only logged.
    pub fn submit_detached(&self, requests: Vec<VerificationRequest>) -> JoinHandle<()> {
        let verifier = self.clone();
        tokio::spawn(async move {
            for request in requests {
                if let Err(error) = verifier.submit(&request).await {
                    warn!(contract = %request.contract_name, address = ?request.address, %error, "Verification failed");
                }
            }
        })
    }
}

/// Verification requests for every contract of `plan` found in `manifest`,
/// with the same libraries and constructor arguments the deployment used.
pub fn verification_requests(
    plan: &DeploymentPlan,
    manifest: &DeploymentManifest,
    config: &DeploymentConfig,
) -> Result<Vec<VerificationRequest>, ExplorerError> {
    let mut requests = Vec::new();
    let mut push =
        |artifact: &ContractArtifact, constructor_arguments: Vec<u8>| -> Result<(), ExplorerError> {
            if let Some(address) = manifest.address_of(&artifact.name) {
                requests.push(verification_request(
                    artifact,
                    address,
                    manifest,
                    constructor_arguments,
                )?);
            }
            Ok(())
        };

    for library in &plan.libraries {
        push(library, Vec::new())?;
    }
    push(
        &plan.implementation,
        encode_tuple(&[
            Value::Address(config.price_oracle),
            Value::Address(config.owner_setter),
        ])?,
    )?;
    let address_arg = |name: &str| -> Result<Vec<u8>, CalldataEncodeError> {
        encode_tuple(&[Value::Address(
            manifest.address_of(name).unwrap_or_default(),
        )])
    };
    push(&plan.manager, address_arg(&plan.implementation.name)?)?;
    push(&plan.proxy, address_arg(&plan.manager.name)?)?;
    push(&plan.factory, address_arg(&plan.proxy.name)?)?;

    Ok(requests)
}

fn verification_request(
    artifact: &ContractArtifact,
    address: Address,
    manifest: &DeploymentManifest,
    constructor_arguments: Vec<u8>,
) -> Result<VerificationRequest, ExplorerError> {
    // Source file to library name to address, the shape of the standard JSON
    // `settings.libraries` entry.
    let mut linked: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut libraries = BTreeMap::new();
    for reference in &artifact.link_references {
        if let Some(library_address) = manifest.address_of(&reference.library) {
            linked
                .entry(reference.source.clone())
                .or_default()
                .insert(reference.library.clone(), format!("{library_address:#x}"));
            libraries.insert(reference.library.clone(), library_address);
        }
    }

    let (source, compiler_version) = match &artifact.compiler_input {
        Some(input) => (
            Some(with_libraries(&artifact.name, &input.standard_json, &linked)?),
            Some(format!("v{}", input.solc_version)),
        ),
        None => {
            warn!(contract = %artifact.name, "No build info for contract, the explorer will not be able to verify it");
            (None, None)
        }
    };

    Ok(VerificationRequest {
        address,
        contract_name: artifact.fully_qualified_name(),
        constructor_arguments,
        libraries,
        source,
        compiler_version,
    })
}

fn with_libraries(
    contract: &str,
    standard_json: &str,
    linked: &BTreeMap<String, BTreeMap<String, String>>,
) -> Result<String, ExplorerError> {
    if linked.is_empty() {
        return Ok(standard_json.to_string());
    }
    let invalid = |message: String| ExplorerError::InvalidCompilerInput {
        contract: contract.to_string(),
        message,
    };

    let mut input: serde_json::Value =
        serde_json::from_str(standard_json).map_err(|err| invalid(err.to_string()))?;
    let libraries = serde_json::to_value(linked).map_err(|err| invalid(err.to_string()))?;
    let settings = input
        .as_object_mut()
        .map(|input| {
            input
                .entry("settings")
                .or_insert_with(|| serde_json::Value::Object(Default::default()))
        })
        .and_then(serde_json::Value::as_object_mut)
        .ok_or_else(|| invalid("settings is not an object".to_string()))?;
    settings.insert("libraries".to_string(), libraries);
    Ok(input.to_string())
}
