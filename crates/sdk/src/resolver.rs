use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::artifact::ContractArtifact;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Cyclic library dependency between {}", .0.join(", "))]
    CyclicDependency(Vec<String>),
    #[error("{contract} references library {library}, which is not part of the deployment")]
    UnresolvedReference { contract: String, library: String },
    #[error("Contract {0} is declared more than once")]
    DuplicateContract(String),
}

/// Orders `artifacts` so every library comes before the contracts linking
/// against it (Kahn's algorithm over the link reference graph).
///
/// Among contracts whose dependencies are all satisfied, the one declared
/// first is emitted first, so the order is reproducible across runs.
pub fn resolve_deployment_order(
    artifacts: &[ContractArtifact],
) -> Result<Vec<&ContractArtifact>, ResolveError> {
    let mut index_of = HashMap::with_capacity(artifacts.len());
    for (index, artifact) in artifacts.iter().enumerate() {
        if index_of.insert(artifact.name.as_str(), index).is_some() {
            return Err(ResolveError::DuplicateContract(artifact.name.clone()));
        }
    }

    let mut in_degree = vec![0usize; artifacts.len()];
    let mut dependents = vec![Vec::new(); artifacts.len()];
    for (index, artifact) in artifacts.iter().enumerate() {
        for library in artifact.dependencies() {
            let &dependency = index_of.get(library.as_str()).ok_or_else(|| {
                ResolveError::UnresolvedReference {
                    contract: artifact.name.clone(),
                    library: library.clone(),
                }
            })?;
            dependents[dependency].push(index);
            in_degree[index] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| index)
        .collect();
    let mut order = Vec::with_capacity(artifacts.len());

    while let Some(index) = ready.pop_first() {
        order.push(&artifacts[index]);
        for &dependent in &dependents[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < artifacts.len() {
        let involved = artifacts
            .iter()
            .zip(&in_degree)
            .filter(|(_, degree)| **degree > 0)
            .map(|(artifact, _)| artifact.name.clone())
            .collect();
        return Err(ResolveError::CyclicDependency(involved));
    }

    debug!(
        order = ?order.iter().map(|artifact| artifact.name.as_str()).collect::<Vec<_>>(),
        "Resolved deployment order"
    );
    Ok(order)
}
