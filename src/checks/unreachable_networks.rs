//! Network islands: typed networks with no routing path to the rest.

use super::{Analyzer, AnalyzerOutput};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, IssueType, Isolation, Severity};
use crate::graph::BacnetGraph;
use crate::topology::{Adjacency, connected_components};
use crate::vocab::{class, prop};
use std::collections::{BTreeMap, BTreeSet};

pub struct UnreachableNetworks;

/// Comma-joined first `limit` names, with a trailing ellipsis when truncated.
fn preview(names: &[String], limit: usize) -> String {
    let shown = names.iter().take(limit).cloned().collect::<Vec<_>>().join(", ");
    if names.len() > limit {
        format!("{shown}...")
    } else {
        shown
    }
}

impl Analyzer for UnreachableNetworks {
    fn key(&self) -> &str {
        "unreachable-networks"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::UnreachableNetworks]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        _config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut output = AnalyzerOutput::new();
        let mut networks: BTreeSet<String> =
            graph.instances_of(class::NETWORK)?.into_iter().collect();
        if networks.len() < 2 {
            return Ok(output);
        }

        // Every router joins all networks it touches into one clique.
        let mut adjacency = Adjacency::new();
        for router in graph.instances_of(class::ROUTER)? {
            let mut touched: BTreeSet<String> = BTreeSet::new();
            touched.extend(graph.objects(&router, prop::DEVICE_ON_NETWORK)?);
            touched.extend(graph.objects(&router, prop::SERVES_NETWORK)?);
            for subnet in graph.objects(&router, prop::DEVICE_ON_SUBNET)? {
                touched.extend(graph.objects(&subnet, prop::SUBNET_OF_NETWORK)?);
            }
            for a in &touched {
                for b in touched.iter().filter(|b| *b != a) {
                    adjacency.entry(a.clone()).or_default().insert(b.clone());
                }
            }
            networks.extend(touched);
        }

        let islands = connected_components(&networks, &adjacency);
        if islands.len() < 2 {
            return Ok(output);
        }

        let mut names: BTreeMap<&str, String> = BTreeMap::new();
        for network in &networks {
            names.insert(network, graph.network_name(network)?);
        }
        let name_of = |network: &str| names.get(network).cloned().unwrap_or_default();
        let total = networks.len();
        let island_count = islands.len();

        for (index, island) in islands.iter().enumerate() {
            let outside: Vec<String> = islands
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != index)
                .flat_map(|(_, other)| other.iter().map(|n| name_of(n)))
                .collect();
            let island_networks: Vec<String> = island.iter().cloned().collect();

            for network in island {
                let network_name = name_of(network);
                let finding = if island.len() == 1 {
                    Finding::new(
                        IssueType::UnreachableNetworks,
                        Severity::High,
                        format!(
                            "Network {network_name} is completely isolated with no routing connections"
                        ),
                        FindingDetails::UnreachableNetwork {
                            network: network.clone(),
                            network_name: network_name.clone(),
                            isolation: Isolation::Isolated,
                            total_networks: total,
                            reachable_networks: 0,
                            network_islands: island_count,
                            island_networks: island_networks.clone(),
                        },
                    )
                    .verbose_with(verbose, || {
                        format!(
                            "Network {network_name} is completely isolated and cannot communicate \
                             with {} other networks in the system: {}. This network needs router \
                             connections to enable inter-network communication.",
                            total - 1,
                            preview(&outside, 5)
                        )
                    })
                } else {
                    let unreachable = total - island.len();
                    let reachable: Vec<String> = island
                        .iter()
                        .filter(|n| *n != network)
                        .map(|n| name_of(n))
                        .collect();
                    Finding::new(
                        IssueType::UnreachableNetworks,
                        Severity::High,
                        format!("Network {network_name} cannot reach {unreachable} other networks"),
                        FindingDetails::UnreachableNetwork {
                            network: network.clone(),
                            network_name: network_name.clone(),
                            isolation: Isolation::Partial,
                            total_networks: total,
                            reachable_networks: island.len() - 1,
                            network_islands: island_count,
                            island_networks: island_networks.clone(),
                        },
                    )
                    .verbose_with(verbose, || {
                        format!(
                            "Network {network_name} can only reach {} networks ({}) but cannot \
                             reach {unreachable} other networks: {}. Additional router connections \
                             are needed to bridge network islands.",
                            reachable.len(),
                            preview(&reachable, 3),
                            preview(&outside, 3)
                        )
                    })
                };
                output.push(finding.affecting([network.clone()]));
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run;

    const NETWORKS: &str = r#"
        <bacnet://network/1> a bacnet:BACnetNetwork .
        <bacnet://network/2> a bacnet:BACnetNetwork .
    "#;

    const ROUTER: &str = r#"
        <bacnet://router/1> a bacnet:Router ;
            bacnet:device-on-network <bacnet://network/1> ;
            bacnet:serves-network <bacnet://network/2> .
    "#;

    #[test]
    fn connected_pair_has_no_findings() {
        let output = run(&UnreachableNetworks, &format!("{NETWORKS}{ROUTER}"), false);
        assert!(output.is_empty());
    }

    #[test]
    fn isolated_and_partial_islands() {
        let body = format!(
            r#"{NETWORKS}{ROUTER}
            <bacnet://network/3> a bacnet:BACnetNetwork ; rdfs:label "Annex" .
            "#
        );
        let output = run(&UnreachableNetworks, &body, true);
        assert_eq!(output.len(), 3);
        assert!(output.findings.iter().all(|f| f.severity() == Severity::High));

        let isolated: Vec<_> = output
            .findings
            .iter()
            .filter(|f| {
                matches!(
                    f.details,
                    FindingDetails::UnreachableNetwork { isolation: Isolation::Isolated, reachable_networks: 0, .. }
                )
            })
            .collect();
        assert_eq!(isolated.len(), 1);
        assert_eq!(
            isolated[0].description(),
            "Network Annex is completely isolated with no routing connections"
        );

        let partial = output
            .findings
            .iter()
            .find(|f| f.affected_entities() == ["bacnet://network/1"])
            .unwrap();
        assert_eq!(partial.description(), "Network 1 cannot reach 1 other networks");
        assert!(
            partial
                .verbose_description
                .as_deref()
                .is_some_and(|v| v.contains("can only reach 1 networks (2)"))
        );
    }

    #[test]
    fn subnet_mediated_router_connects_networks() {
        let output = run(
            &UnreachableNetworks,
            &format!(
                r#"{NETWORKS}
                <bacnet://subnet/a> bacnet:subnet-of-network <bacnet://network/2> .
                <bacnet://router/1> a bacnet:Router ;
                    bacnet:device-on-network <bacnet://network/1> ;
                    bacnet:device-on-subnet <bacnet://subnet/a> .
                "#
            ),
            false,
        );
        assert!(output.is_empty());
    }

    #[test]
    fn single_network_is_skipped() {
        let output = run(
            &UnreachableNetworks,
            r#"<bacnet://network/1> a bacnet:BACnetNetwork ."#,
            false,
        );
        assert!(output.is_empty());
    }

    #[test]
    fn preview_truncates() {
        let names: Vec<String> = ["a", "b", "c", "d"].map(String::from).to_vec();
        assert_eq!(preview(&names, 3), "a, b, c...");
        assert_eq!(preview(&names[..2], 3), "a, b");
    }
}
