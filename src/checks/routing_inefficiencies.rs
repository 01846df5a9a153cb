//! Routing topology inefficiencies over the typed router/network graph.
//!
//! All five sub-checks share one [`RoutingGraph`] built per pass:
//! routing loops, overly long shortest paths, routers that are the only way
//! onto a network, one-directional connections and networks whose removal
//! would split the topology.

use super::{Analyzer, AnalyzerOutput};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, IssueType, Severity};
use crate::graph::{BacnetGraph, uri_tail};
use crate::topology::{
    RoutingGraph, articulation_points, back_edge_cycles, normalize_closed_path, shortest_paths,
};
use std::collections::BTreeSet;

const CRITICAL_LOOP_SIZE: usize = 4;

pub struct RoutingInefficiencies;

fn names(uris: &[String]) -> Vec<&str> {
    uris.iter().map(|u| uri_tail(u)).collect()
}

fn routing_loops(routing: &RoutingGraph, verbose: bool) -> Vec<Finding> {
    let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
    let mut findings = Vec::new();

    for closed in back_edge_cycles(&routing.all_networks, &routing.connections) {
        let path = normalize_closed_path(&closed);
        let networks: Vec<String> = path[..path.len().saturating_sub(1)].to_vec();
        let distinct: BTreeSet<&String> = networks.iter().collect();
        if distinct.len() <= 2 || !seen.insert(path.clone()) {
            continue;
        }

        let mut routers = BTreeSet::new();
        for hop in path.windows(2) {
            routers.extend(routing.routers_between(&hop[0], &hop[1]));
        }
        let routers: Vec<String> = routers.into_iter().collect();
        let loop_length = networks.len();
        let critical = loop_length <= CRITICAL_LOOP_SIZE;
        let (severity, impact, recommendation) = if critical {
            (
                Severity::Critical,
                format!(
                    "Severe routing instability with {loop_length}-network loop causing packet circulation"
                ),
                format!(
                    "Immediately break the {loop_length}-network routing loop by disabling one \
                     router connection. Implement Spanning Tree Protocol or reconfigure routing \
                     tables to prevent loops. Verify all router configurations for consistency."
                ),
            )
        } else {
            (
                Severity::Warning,
                format!(
                    "Potential routing inefficiency with {loop_length}-network loop affecting performance"
                ),
                format!(
                    "Review and optimize the {loop_length}-network routing configuration. Consider \
                     implementing loop prevention mechanisms and verify routing table consistency."
                ),
            )
        };

        let route = names(&path).join(" -> ");
        let router_count = routers.len();
        findings.push(
            Finding::new(
                IssueType::RoutingLoop,
                severity,
                format!("Routing loop detected: {loop_length} networks in cycle"),
                FindingDetails::RoutingLoop {
                    loop_length,
                    loop_networks: networks.clone(),
                    loop_routers: routers.clone(),
                    loop_path: path,
                    performance_impact: impact,
                    recommendation,
                    routing_risk: "Potential for broadcast storms and routing instability"
                        .to_string(),
                },
            )
            .verbose_with(verbose, || {
                format!(
                    "Routing loop detected involving networks: {route}. This creates a potential \
                     for routing instability and broadcast storms. The loop involves \
                     {router_count} routers and could cause packets to circulate indefinitely \
                     without reaching their destination."
                )
            })
            .affecting(networks.into_iter().chain(routers)),
        );
    }
    findings
}

fn suboptimal_paths(routing: &RoutingGraph, max_hops: usize, verbose: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    for source in &routing.all_networks {
        for (target, path) in shortest_paths(source, &routing.connections) {
            let hops = path.len().saturating_sub(1);
            if hops <= max_hops {
                continue;
            }
            let route = names(&path).join(" -> ");
            let (from, to) = (uri_tail(source), uri_tail(&target));
            findings.push(
                Finding::new(
                    IssueType::SuboptimalRoutingPath,
                    Severity::Warning,
                    format!("Long routing path: {hops} hops from {from} to {to}"),
                    FindingDetails::SuboptimalPath {
                        source_network: source.clone(),
                        target_network: target.clone(),
                        path_length: hops,
                        routing_path: path.clone(),
                        performance_impact: format!(
                            "Increased latency due to {hops}-hop routing path"
                        ),
                        recommendation: "Consider adding direct routing connections or \
                                         intermediate routers to reduce path length"
                            .to_string(),
                        efficiency_loss: format!(
                            "Potential {}% latency increase vs direct connection",
                            (hops - 1) * 10
                        ),
                    },
                )
                .verbose_with(verbose, || {
                    format!(
                        "Routing path from {from} to {to} requires {hops} hops: {route}. This may \
                         indicate missing direct routing connections or suboptimal network \
                         topology design."
                    )
                })
                .affecting(path),
            );
        }
    }
    findings
}

fn single_points_of_failure(routing: &RoutingGraph, verbose: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (network, routers) in &routing.network_routers {
        if routers.len() != 1 {
            continue;
        }
        let Some(router) = routers.first() else {
            continue;
        };
        let connected: Vec<String> = routing.neighbors(network).cloned().collect();
        if connected.len() < 2 {
            continue;
        }
        let (router_name, network_name) = (uri_tail(router), uri_tail(network));
        let count = connected.len();
        let connected_names = names(&connected).join(", ");
        findings.push(
            Finding::new(
                IssueType::RouterSinglePointFailure,
                Severity::Warning,
                format!(
                    "Single router failure point: {router_name} is the only router on network {network_name}"
                ),
                FindingDetails::RouterSinglePointOfFailure {
                    router: router.clone(),
                    network: network.clone(),
                    connected_networks_count: count,
                    connected_networks: connected,
                    failure_impact: format!(
                        "Loss of connectivity to {count} networks if router fails"
                    ),
                    recommendation: "Consider adding redundant routers for high availability"
                        .to_string(),
                    availability_risk: "Single point of failure in network topology".to_string(),
                },
            )
            .verbose_with(verbose, || {
                format!(
                    "Router {router_name} on network {network_name} is a single point of failure. \
                     If this router fails, connectivity will be lost to {count} networks: \
                     {connected_names}."
                )
            })
            .affecting([router.clone(), network.clone()]),
        );
    }
    findings
}

fn asymmetric_routes(routing: &RoutingGraph, verbose: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (a, targets) in &routing.connections {
        for b in targets {
            if routing.connections.get(b).is_some_and(|back| back.contains(a)) {
                continue;
            }
            let (a_name, b_name) = (uri_tail(a), uri_tail(b));
            findings.push(
                Finding::new(
                    IssueType::AsymmetricRouting,
                    Severity::Warning,
                    format!("Asymmetric routing: {a_name} can reach {b_name} but not vice versa"),
                    FindingDetails::AsymmetricRouting {
                        source_network: a.clone(),
                        target_network: b.clone(),
                        routing_direction: format!("{a} -> {b}"),
                        missing_direction: format!("{b} -> {a}"),
                        recommendation:
                            "Verify router configurations to ensure bidirectional connectivity"
                                .to_string(),
                        connectivity_risk:
                            "Partial network reachability may cause communication failures"
                                .to_string(),
                    },
                )
                .verbose_with(verbose, || {
                    format!(
                        "Asymmetric routing detected between {a_name} and {b_name}. Traffic can \
                         flow from {a_name} to {b_name} but the reverse path is not configured, \
                         which may cause communication failures."
                    )
                })
                .affecting([a.clone(), b.clone()]),
            );
        }
    }
    findings
}

fn missing_redundancy(routing: &RoutingGraph, verbose: bool) -> Vec<Finding> {
    if routing.all_networks.len() <= 2 {
        return Vec::new();
    }
    articulation_points(&routing.all_networks, &routing.connections)
        .into_iter()
        .map(|network| {
            let connected: Vec<String> = routing.neighbors(&network).cloned().collect();
            let name = uri_tail(&network).to_owned();
            Finding::new(
                IssueType::MissingRedundancy,
                Severity::Warning,
                format!("Critical network {name} lacks redundant paths"),
                FindingDetails::MissingRedundancy {
                    network: network.clone(),
                    connected_networks_count: connected.len(),
                    connected_networks: connected,
                    redundancy_impact: "Network removal would disconnect the topology".to_string(),
                    recommendation: "Add redundant routing paths to improve network resilience"
                        .to_string(),
                    availability_risk: "Single point of failure in network connectivity"
                        .to_string(),
                },
            )
            .verbose_with(verbose, || {
                format!(
                    "Network {name} is a critical connection point. If this network becomes \
                     unreachable, it would disconnect other parts of the network topology. \
                     Consider adding redundant routing paths to improve network resilience."
                )
            })
            .affecting([network])
        })
        .collect()
}

/// Runs every routing sub-check over a prepared routing graph.
pub fn analyze_routing(routing: &RoutingGraph, config: &CheckConfig, verbose: bool) -> AnalyzerOutput {
    let mut output = AnalyzerOutput::new();
    output.extend(routing_loops(routing, verbose));
    output.extend(suboptimal_paths(routing, config.max_route_hops, verbose));
    output.extend(single_points_of_failure(routing, verbose));
    output.extend(asymmetric_routes(routing, verbose));
    output.extend(missing_redundancy(routing, verbose));
    output
}

impl Analyzer for RoutingInefficiencies {
    fn key(&self) -> &str {
        "routing-inefficiencies"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[
            IssueType::RoutingLoop,
            IssueType::SuboptimalRoutingPath,
            IssueType::RouterSinglePointFailure,
            IssueType::AsymmetricRouting,
            IssueType::MissingRedundancy,
        ]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let routing = RoutingGraph::build(graph)?;
        Ok(analyze_routing(&routing, config, verbose))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::{config, run};

    fn chain(length: usize) -> String {
        let mut body = String::new();
        for n in 0..=length {
            body.push_str(&format!("<bacnet://network/n{n}> a bacnet:BACnetNetwork .\n"));
        }
        for n in 0..length {
            body.push_str(&format!(
                "<bacnet://router/r{n}> a bacnet:Router ; \
                 bacnet:device-on-network <bacnet://network/n{n}> ; \
                 bacnet:serves-network <bacnet://network/n{}> .\n",
                n + 1
            ));
        }
        body
    }

    #[test]
    fn triangle_is_one_routing_loop() {
        let body = r#"
            <bacnet://network/a> a bacnet:BACnetNetwork .
            <bacnet://network/b> a bacnet:BACnetNetwork .
            <bacnet://network/c> a bacnet:BACnetNetwork .
            <bacnet://router/1> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/a> ;
                bacnet:serves-network <bacnet://network/b> .
            <bacnet://router/2> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/b> ;
                bacnet:serves-network <bacnet://network/c> .
            <bacnet://router/3> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/c> ;
                bacnet:serves-network <bacnet://network/a> .
        "#;
        let output = run(&RoutingInefficiencies, body, true);
        let loops: Vec<_> = output.of_type(IssueType::RoutingLoop).collect();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].severity(), Severity::Critical);
        assert_eq!(loops[0].description(), "Routing loop detected: 3 networks in cycle");
        let FindingDetails::RoutingLoop { loop_path, .. } = &loops[0].details else {
            panic!("expected routing loop details");
        };
        assert_eq!(loop_path.first().map(String::as_str), Some("bacnet://network/a"));
        assert_eq!(loop_path.first(), loop_path.last());
        assert_eq!(output.of_type(IssueType::MissingRedundancy).count(), 0);
    }

    #[test]
    fn single_link_is_not_a_loop() {
        let output = run(&RoutingInefficiencies, &chain(1), false);
        assert_eq!(output.of_type(IssueType::RoutingLoop).count(), 0);
    }

    #[test]
    fn long_chain_reports_long_paths_and_cut_vertices() {
        let output = run(&RoutingInefficiencies, &chain(5), false);
        let long: Vec<_> = output.of_type(IssueType::SuboptimalRoutingPath).collect();
        // n0 <-> n5 in both directions.
        assert_eq!(long.len(), 2);
        assert_eq!(long[0].description(), "Long routing path: 5 hops from n0 to n5");
        let FindingDetails::SuboptimalPath { efficiency_loss, .. } = &long[0].details else {
            panic!("expected path details");
        };
        assert_eq!(efficiency_loss, "Potential 40% latency increase vs direct connection");

        let cut: BTreeSet<&str> = output
            .of_type(IssueType::MissingRedundancy)
            .flat_map(|f| f.affected_entities().iter().map(String::as_str))
            .collect();
        assert_eq!(cut.len(), 4);
        assert!(!cut.contains("bacnet://network/n0"));
    }

    #[test]
    fn lone_router_on_a_hub_network() {
        let body = r#"
            <bacnet://network/hub> a bacnet:BACnetNetwork .
            <bacnet://network/x> a bacnet:BACnetNetwork .
            <bacnet://network/y> a bacnet:BACnetNetwork .
            <bacnet://router/core> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/hub> ;
                bacnet:serves-network <bacnet://network/x>, <bacnet://network/y> .
        "#;
        let output = run(&RoutingInefficiencies, body, false);
        let spof: Vec<_> = output.of_type(IssueType::RouterSinglePointFailure).collect();
        assert_eq!(spof.len(), 1);
        assert_eq!(
            spof[0].description(),
            "Single router failure point: core is the only router on network hub"
        );
        assert_eq!(output.of_type(IssueType::MissingRedundancy).count(), 1);
    }

    #[test]
    fn one_way_connection_is_asymmetric() {
        let mut routing = RoutingGraph::default();
        for n in ["net/a", "net/b"] {
            routing.all_networks.insert(n.to_string());
        }
        routing
            .connections
            .entry("net/a".to_string())
            .or_default()
            .insert("net/b".to_string());

        let output = analyze_routing(&routing, &config(), false);
        let asymmetric: Vec<_> = output.of_type(IssueType::AsymmetricRouting).collect();
        assert_eq!(asymmetric.len(), 1);
        assert_eq!(
            asymmetric[0].description(),
            "Asymmetric routing: a can reach b but not vice versa"
        );
    }
}
