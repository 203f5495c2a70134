use std::collections::HashMap;

use hebao_sdk::{ResolveError, resolve_deployment_order};
use proptest::{collection::vec, prelude::any, proptest};

use crate::fixtures::artifact;

#[test]
fn chain_of_three_deploys_in_order() {
    let artifacts = vec![
        artifact("C", &["A", "B"]),
        artifact("B", &["A"]),
        artifact("A", &[]),
    ];

    let order: Vec<&str> = resolve_deployment_order(&artifacts)
        .expect("acyclic")
        .into_iter()
        .map(|artifact| artifact.name.as_str())
        .collect();

    assert_eq!(order, ["A", "B", "C"]);
}

#[test]
fn self_reference_is_a_cycle() {
    let artifacts = vec![artifact("A", &["A"])];
    assert_eq!(
        resolve_deployment_order(&artifacts),
        Err(ResolveError::CyclicDependency(vec!["A".to_string()]))
    );
}

proptest! {
    // Edges only point to earlier indices, so every generated graph is a DAG.
    #[test]
    fn order_respects_every_edge(edges in vec(vec(any::<bool>(), 0..12), 1..12), seed in any::<u64>()) {
        let names: Vec<String> = (0..edges.len()).map(|i| format!("Lib{i}")).collect();
        let dependencies: Vec<Vec<&str>> = edges
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .take(i)
                    .enumerate()
                    .filter(|(_, linked)| **linked)
                    .map(|(j, _)| names[j].as_str())
                    .collect()
            })
            .collect();

        // Declare in a shuffled order so the input is not already sorted.
        let mut declared: Vec<usize> = (0..names.len()).collect();
        declared.sort_by_key(|i| (*i as u64).wrapping_mul(seed | 1).rotate_left(17));
        let artifacts: Vec<_> = declared
            .iter()
            .map(|&i| artifact(&names[i], &dependencies[i]))
            .collect();

        let order = resolve_deployment_order(&artifacts).expect("acyclic");
        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(position, artifact)| (artifact.name.as_str(), position))
            .collect();

        assert_eq!(order.len(), artifacts.len());
        for artifact in &artifacts {
            for dependency in artifact.dependencies() {
                assert!(position[dependency.as_str()] < position[artifact.name.as_str()]);
            }
        }
    }
}
