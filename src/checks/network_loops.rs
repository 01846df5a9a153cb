//! Circular routing between networks, a source of broadcast storms.

use super::{Analyzer, AnalyzerOutput};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, IssueType, LoopRouter, Severity};
use crate::graph::{BacnetGraph, uri_tail};
use crate::topology::{NetworkAdjacency, bounded_cycles};

const RECOMMENDATION: &str =
    "Remove redundant routing connections or implement spanning tree protocol";

/// Cycles up to this many networks are critical; longer ones are warnings.
const CRITICAL_LOOP_SIZE: usize = 4;

pub struct NetworkLoops;

/// Routers on each consecutive edge of the cycle, wrapping around, first occurrence wins.
fn loop_routers(cycle: &[String], topology: &NetworkAdjacency) -> Vec<LoopRouter> {
    let mut routers: Vec<LoopRouter> = Vec::new();
    for (index, from) in cycle.iter().enumerate() {
        let to = &cycle[(index + 1) % cycle.len()];
        for router in topology.routers_between(from, to) {
            if routers.iter().any(|r| &r.router_uri == router) {
                continue;
            }
            routers.push(LoopRouter {
                router_uri: router.clone(),
                router_name: uri_tail(router).to_owned(),
                connects_from: uri_tail(from).to_owned(),
                connects_to: uri_tail(to).to_owned(),
            });
        }
    }
    routers
}

fn loop_finding(
    networks: Vec<String>,
    loop_path: Vec<String>,
    severity: Severity,
    topology: &NetworkAdjacency,
    verbose: bool,
) -> Finding {
    let loop_size = networks.len();
    let routers = loop_routers(&networks, topology);
    let router_names: Vec<&str> = routers.iter().map(|r| r.router_name.as_str()).collect();
    let route: Vec<&str> = loop_path.iter().map(|n| uri_tail(n)).collect();
    let verbose_text = format!(
        "Networks {} form a routing loop through routers {}. Broadcast traffic can circulate \
         indefinitely and saturate every network in the loop.",
        route.join(" → "),
        if router_names.is_empty() {
            "unknown".to_string()
        } else {
            router_names.join(", ")
        }
    );

    Finding::new(
        IssueType::NetworkLoops,
        severity,
        format!("Network loop detected involving {loop_size} networks"),
        FindingDetails::NetworkLoop {
            loop_size,
            loop_path,
            networks_in_loop: networks.clone(),
            routers_causing_loop: routers,
            broadcast_storm_risk: "high".to_string(),
            recommendation: RECOMMENDATION.to_string(),
        },
    )
    .affecting(networks)
    .verbose_with(verbose, || verbose_text)
}

impl Analyzer for NetworkLoops {
    fn key(&self) -> &str {
        "network-loops"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::NetworkLoops]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let topology = NetworkAdjacency::from_routers(graph)?;
        Ok(detect_loops(&topology, config.max_loop_depth, verbose))
    }
}

/// Loop findings over an already-built network adjacency.
pub fn detect_loops(topology: &NetworkAdjacency, max_depth: usize, verbose: bool) -> AnalyzerOutput {
    let mut output = AnalyzerOutput::new();
    let networks: Vec<String> = topology.networks().cloned().collect();

    match networks.as_slice() {
        [] | [_] => {}
        [a, b] => {
            if topology.is_declared(a, b) && topology.is_declared(b, a) {
                output.push(loop_finding(
                    vec![a.clone(), b.clone()],
                    vec![a.clone(), b.clone(), a.clone()],
                    Severity::Critical,
                    topology,
                    verbose,
                ));
            }
        }
        _ => {
            for cycle in bounded_cycles(topology.adjacency(), max_depth) {
                let severity = if cycle.len() <= CRITICAL_LOOP_SIZE {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                output.push(loop_finding(cycle.clone(), cycle, severity, topology, verbose));
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run;

    #[test]
    fn mutual_routing_between_two_networks_is_one_loop() {
        let body = r#"
            <bacnet://router/1> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/1> ;
                bacnet:serves-network <bacnet://network/2> .
            <bacnet://router/2> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/2> ;
                bacnet:serves-network <bacnet://network/1> .
        "#;
        let output = run(&NetworkLoops, body, false);
        assert_eq!(output.len(), 1);
        let finding = &output.findings[0];
        assert_eq!(finding.severity(), Severity::Critical);
        let FindingDetails::NetworkLoop {
            loop_size,
            loop_path,
            routers_causing_loop,
            ..
        } = &finding.details
        else {
            panic!("expected network loop details");
        };
        assert_eq!(*loop_size, 2);
        assert_eq!(loop_path.first(), loop_path.last());
        assert_eq!(routers_causing_loop.len(), 2);
    }

    #[test]
    fn one_way_routing_between_two_networks_is_not_a_loop() {
        let body = r#"
            <bacnet://router/1> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/1> ;
                bacnet:serves-network <bacnet://network/2> .
        "#;
        assert!(run(&NetworkLoops, body, false).is_empty());
    }

    #[test]
    fn triangle_is_reported_once() {
        let body = r#"
            <bacnet://router/a> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/1> ;
                bacnet:serves-network <bacnet://network/2> .
            <bacnet://router/b> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/2> ;
                bacnet:serves-network <bacnet://network/3> .
            <bacnet://router/c> a bacnet:Router ;
                bacnet:device-on-network <bacnet://network/3> ;
                bacnet:serves-network <bacnet://network/1> .
        "#;
        let output = run(&NetworkLoops, body, true);
        assert_eq!(output.len(), 1);
        let finding = &output.findings[0];
        assert_eq!(finding.description(), "Network loop detected involving 3 networks");
        assert_eq!(finding.severity(), Severity::Critical);
        let FindingDetails::NetworkLoop {
            loop_path,
            routers_causing_loop,
            ..
        } = &finding.details
        else {
            panic!("expected network loop details");
        };
        assert_eq!(loop_path[0], "bacnet://network/1");
        assert_eq!(routers_causing_loop.len(), 3);
        assert!(finding.verbose_description.is_some());
    }

    #[test]
    fn long_cycles_are_warnings() {
        let mut topology = NetworkAdjacency::default();
        let ring: Vec<String> = (1..=5).map(|n| format!("net/{n}")).collect();
        for (index, from) in ring.iter().enumerate() {
            let to = &ring[(index + 1) % ring.len()];
            topology.add_route(&format!("router/{index}"), from, to);
        }
        let output = detect_loops(&topology, 5, false);
        assert_eq!(output.len(), 1);
        assert_eq!(output.findings[0].severity(), Severity::Warning);
    }

    #[test]
    fn tree_topology_has_no_loops() {
        let mut topology = NetworkAdjacency::default();
        topology.add_route("r1", "net/1", "net/2");
        topology.add_route("r2", "net/1", "net/3");
        topology.add_route("r3", "net/3", "net/4");
        assert!(detect_loops(&topology, 5, false).is_empty());
    }
}
