//! Deployment of the wallet infrastructure as an explicit state machine.
//!
//! A run walks `Pending -> LibrariesDeploying -> ImplementationLinking ->
//! ImplementationDeployed -> ManagerDeployed -> ProxyDeployed ->
//! FactoryDeployed -> Complete`. Every step submits at most one transaction,
//! waits for it to be confirmed and flushes the manifest before moving on.
//! Anything already present in the stored manifest is reused, so a failed
//! run can be resumed by running again against the same store.

use std::{collections::BTreeMap, fmt, path::Path, sync::Arc};

use bytes::Bytes;
use hebao_common::{
    Address, H256,
    types::{ConfirmationStatus, DeploymentManifest, DeploymentRecord},
};
use hebao_rpc::{ChainProvider, TransactionRequest};
use hebao_sdk::{
    ArtifactError, ArtifactLoader, CalldataEncodeError, ContractArtifact, LinkError,
    ResolveError, Value, encode_tuple, link_bytecode, resolve_deployment_order,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{
    config::{ContractNames, DeploymentConfig},
    confirmation::{ConfirmationError, wait_for_confirmation},
    errors::DeployerError,
    store::{ManifestStore, StoreError},
};

/// Artifacts of one deployment, grouped by role.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    pub libraries: Vec<ContractArtifact>,
    pub implementation: ContractArtifact,
    pub manager: ContractArtifact,
    pub proxy: ContractArtifact,
    pub factory: ContractArtifact,
}

impl DeploymentPlan {
    /// Loads every artifact named in `names`, with its compiler input, from
    /// a Hardhat artifacts directory.
    pub fn load(artifacts_dir: &Path, names: &ContractNames) -> Result<Self, ArtifactError> {
        let mut loader = ArtifactLoader::new(artifacts_dir);
        let libraries = names
            .libraries
            .iter()
            .map(|name| loader.load(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            libraries,
            implementation: loader.load(&names.implementation)?,
            manager: loader.load(&names.manager)?,
            proxy: loader.load(&names.proxy)?,
            factory: loader.load(&names.factory)?,
        })
    }

    fn all_artifacts(&self) -> Vec<ContractArtifact> {
        let mut all = self.libraries.clone();
        all.extend([
            self.implementation.clone(),
            self.manager.clone(),
            self.proxy.clone(),
            self.factory.clone(),
        ]);
        all
    }

    /// Constructor dependencies of the four non-library roles, as
    /// (dependent, dependency) pairs.
    fn constructor_dependencies(&self) -> [(&str, &str); 3] {
        [
            (self.manager.name.as_str(), self.implementation.name.as_str()),
            (self.proxy.name.as_str(), self.manager.name.as_str()),
            (self.factory.name.as_str(), self.proxy.name.as_str()),
        ]
    }
}

/// The step a failed run was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStep {
    Preflight,
    Libraries,
    Implementation,
    Manager,
    Proxy,
    Factory,
}

impl fmt::Display for DeploymentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            DeploymentStep::Preflight => "preflight",
            DeploymentStep::Libraries => "libraries",
            DeploymentStep::Implementation => "implementation",
            DeploymentStep::Manager => "manager",
            DeploymentStep::Proxy => "proxy",
            DeploymentStep::Factory => "factory",
        };
        f.write_str(step)
    }
}

#[derive(Debug, Clone)]
pub struct FailureReason {
    pub step: DeploymentStep,
    /// Contract being deployed when the step failed, if any.
    pub contract: Option<String>,
    /// Hash of the transaction in flight, if one was sent.
    pub tx_hash: Option<H256>,
    pub error: Arc<DeployerError>,
}

#[derive(Debug)]
pub enum DeploymentState {
    Pending,
    LibrariesDeploying,
    ImplementationLinking,
    ImplementationDeployed,
    ManagerDeployed,
    ProxyDeployed,
    FactoryDeployed,
    Complete,
    Failed(FailureReason),
}

impl DeploymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Complete | DeploymentState::Failed(_))
    }
}

/// A failed run: why it stopped and everything confirmed up to that point.
/// The same manifest has already been written to the store.
#[derive(Debug)]
pub struct RunFailure {
    pub reason: FailureReason,
    pub manifest: DeploymentManifest,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deployment failed at {} step", self.reason.step)?;
        if let Some(contract) = &self.reason.contract {
            write!(f, " ({contract})")?;
        }
        write!(f, ": {}", self.reason.error)?;
        if let Some(tx_hash) = self.reason.tx_hash {
            write!(f, " [tx {tx_hash:#x}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for RunFailure {}

/// Failure inside one step, before it is turned into a `FailureReason`.
struct StepError {
    contract: Option<String>,
    error: DeployerError,
}

impl From<DeployerError> for StepError {
    fn from(error: DeployerError) -> Self {
        StepError {
            contract: None,
            error,
        }
    }
}

macro_rules! step_error_from {
    ($($source:ty),*) => {
        $(impl From<$source> for StepError {
            fn from(error: $source) -> Self {
                DeployerError::from(error).into()
            }
        })*
    };
}

step_error_from!(ResolveError, LinkError, CalldataEncodeError, StoreError);

pub struct Orchestrator {
    provider: Arc<dyn ChainProvider>,
    store: Arc<dyn ManifestStore>,
    config: DeploymentConfig,
    cancel: CancellationToken,
    state: DeploymentState,
    manifest: DeploymentManifest,
    records: Vec<DeploymentRecord>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ChainProvider>,
        store: Arc<dyn ManifestStore>,
        config: DeploymentConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            cancel: CancellationToken::new(),
            state: DeploymentState::Pending,
            manifest: DeploymentManifest::default(),
            records: Vec::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    pub fn manifest(&self) -> &DeploymentManifest {
        &self.manifest
    }

    /// Records of this run, in the order they were confirmed or recovered.
    pub fn records(&self) -> &[DeploymentRecord] {
        &self.records
    }

    /// Drives `plan` to completion and returns the final manifest.
    ///
    /// Nothing is sent if the plan cannot be ordered or linked, or if the
    /// stored manifest contradicts it. On any later failure the run stops,
    /// and the manifest of everything confirmed so far is stored and
    /// returned with the failure.
    pub async fn run_deployment(
        &mut self,
        plan: &DeploymentPlan,
    ) -> Result<DeploymentManifest, Box<RunFailure>> {
        self.state = DeploymentState::Pending;
        self.records.clear();

        let mut step = DeploymentStep::Preflight;
        match self.drive(plan, &mut step).await {
            Ok(()) => {
                self.state = DeploymentState::Complete;
                info!(
                    factory = ?self.manifest.address_of(&plan.factory.name),
                    contracts = self.manifest.len(),
                    "Deployment complete"
                );
                Ok(self.manifest.clone())
            }
            Err(StepError { contract, error }) => {
                let reason = FailureReason {
                    step,
                    tx_hash: error.tx_hash(),
                    contract,
                    error: Arc::new(error),
                };
                error!(
                    step = %reason.step,
                    contract = ?reason.contract,
                    tx_hash = ?reason.tx_hash,
                    error = %reason.error,
                    "Deployment failed"
                );
                self.state = DeploymentState::Failed(reason.clone());
                Err(Box::new(RunFailure {
                    reason,
                    manifest: self.manifest.clone(),
                }))
            }
        }
    }

    async fn drive(
        &mut self,
        plan: &DeploymentPlan,
        step: &mut DeploymentStep,
    ) -> Result<(), StepError> {
        let all = plan.all_artifacts();
        let order = resolve_deployment_order(&all)?;
        self.preflight_link(plan)?;

        self.manifest = self.store.load().await?.unwrap_or_default();
        self.check_manifest(plan, &order)?;
        if !self.manifest.is_empty() {
            info!(
                contracts = self.manifest.len(),
                "Resuming from stored manifest"
            );
        }

        *step = DeploymentStep::Libraries;
        self.state = DeploymentState::LibrariesDeploying;
        let library_names: Vec<&str> = plan.libraries.iter().map(|l| l.name.as_str()).collect();
        for library in order
            .iter()
            .filter(|artifact| library_names.contains(&artifact.name.as_str()))
        {
            self.ensure_not_cancelled()?;
            let code = self.link(library)?;
            self.deploy_or_reuse(&library.name, code).await?;
        }

        *step = DeploymentStep::Implementation;
        self.ensure_not_cancelled()?;
        self.state = DeploymentState::ImplementationLinking;
        let mut code = self.link(&plan.implementation)?.to_vec();
        code.extend(encode_tuple(&[
            Value::Address(self.config.price_oracle),
            Value::Address(self.config.owner_setter),
        ])?);
        let implementation = self
            .deploy_or_reuse(&plan.implementation.name, code.into())
            .await?;
        self.state = DeploymentState::ImplementationDeployed;

        *step = DeploymentStep::Manager;
        let manager = self
            .deploy_with_address_arg(&plan.manager, implementation)
            .await?;
        self.state = DeploymentState::ManagerDeployed;

        *step = DeploymentStep::Proxy;
        let proxy = self.deploy_with_address_arg(&plan.proxy, manager).await?;
        self.state = DeploymentState::ProxyDeployed;

        *step = DeploymentStep::Factory;
        self.deploy_with_address_arg(&plan.factory, proxy).await?;
        self.state = DeploymentState::FactoryDeployed;

        Ok(())
    }

    /// Links every artifact against placeholder addresses so malformed
    /// bytecode is reported before anything is sent.
    fn preflight_link(&self, plan: &DeploymentPlan) -> Result<(), DeployerError> {
        let zero_addresses: BTreeMap<String, Address> = plan
            .libraries
            .iter()
            .map(|library| (library.name.clone(), Address::zero()))
            .collect();
        for artifact in plan.all_artifacts() {
            link_bytecode(&artifact, &zero_addresses)?;
        }
        Ok(())
    }

    /// A stored manifest must be closed under dependencies: whatever it
    /// lists, it also lists everything that was deployed before it.
    fn check_manifest(
        &self,
        plan: &DeploymentPlan,
        order: &[&ContractArtifact],
    ) -> Result<(), DeployerError> {
        let inconsistent = |dependent: &str, dependency: &str| DeployerError::InconsistentManifest {
            dependent: dependent.to_string(),
            dependency: dependency.to_string(),
        };

        for artifact in order {
            if !self.manifest.contains(&artifact.name) {
                continue;
            }
            if let Some(missing) = artifact
                .dependencies()
                .into_iter()
                .find(|dependency| !self.manifest.contains(dependency))
            {
                return Err(inconsistent(&artifact.name, &missing));
            }
        }
        for (dependent, dependency) in plan.constructor_dependencies() {
            if self.manifest.contains(dependent) && !self.manifest.contains(dependency) {
                return Err(inconsistent(dependent, dependency));
            }
        }
        Ok(())
    }

    fn ensure_not_cancelled(&self) -> Result<(), DeployerError> {
        if self.cancel.is_cancelled() {
            return Err(DeployerError::Cancelled);
        }
        Ok(())
    }

    fn link(&self, artifact: &ContractArtifact) -> Result<Bytes, StepError> {
        link_bytecode(artifact, &self.manifest.addresses()).map_err(|err| StepError {
            contract: Some(artifact.name.clone()),
            error: err.into(),
        })
    }

    async fn deploy_with_address_arg(
        &mut self,
        artifact: &ContractArtifact,
        argument: Address,
    ) -> Result<Address, StepError> {
        self.ensure_not_cancelled()?;
        let mut code = self.link(artifact)?.to_vec();
        code.extend(encode_tuple(&[Value::Address(argument)])?);
        self.deploy_or_reuse(&artifact.name, code.into()).await
    }

    /// Deploys `name` unless the manifest already has it. A new deployment
    /// is flushed to the store before returning; a reused entry came from the
    /// store and is left as is.
    async fn deploy_or_reuse(
        &mut self,
        name: &str,
        creation_code: Bytes,
    ) -> Result<Address, StepError> {
        let with_contract = |error: DeployerError| StepError {
            contract: Some(name.to_string()),
            error,
        };

        if let Some(entry) = self.manifest.get(name) {
            debug!(contract = name, address = ?entry.address, "Reusing deployed contract");
            let address = entry.address;
            self.records.push(DeploymentRecord {
                name: name.to_string(),
                address,
                tx_hash: entry.tx_hash,
                status: ConfirmationStatus::Recovered,
            });
            return Ok(address);
        }

        info!(contract = name, "Deploying contract");
        let tx_hash = self
            .provider
            .submit_transaction(TransactionRequest::deploy(
                creation_code,
                self.config.gas_limit,
            ))
            .await
            .map_err(|source| {
                with_contract(DeployerError::SubmissionFailure {
                    contract: name.to_string(),
                    source,
                })
            })?;

        let (receipt, status) = wait_for_confirmation(
            self.provider.as_ref(),
            tx_hash,
            &self.config.confirmation_policy(),
        )
        .await
        .map_err(|err| {
            with_contract(match err {
                ConfirmationError::Reverted(tx_hash) => DeployerError::TransactionReverted {
                    contract: name.to_string(),
                    tx_hash,
                },
                ConfirmationError::Timeout(tx_hash) => DeployerError::ConfirmationTimeout {
                    contract: name.to_string(),
                    tx_hash,
                },
            })
        })?;

        let address = receipt.contract_address.ok_or_else(|| {
            with_contract(DeployerError::MissingContractAddress {
                contract: name.to_string(),
                tx_hash,
            })
        })?;

        let record = DeploymentRecord {
            name: name.to_string(),
            address,
            tx_hash,
            status,
        };
        self.manifest.record(&record);
        self.records.push(record);
        self.store
            .save(&self.manifest)
            .await
            .map_err(|err| with_contract(err.into()))?;

        info!(contract = name, address = ?address, tx_hash = ?tx_hash, "Contract deployed");
        Ok(address)
    }
}
