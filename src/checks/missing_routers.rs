//! Device-bearing networks with no router presence.

use super::{Analyzer, AnalyzerOutput};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, IssueType, NetworkRef, Severity};
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};
use std::collections::BTreeSet;

pub struct MissingRouters;

/// Networks `entity` reaches directly or through one of its subnets.
fn placed_networks(graph: &BacnetGraph<'_>, entity: &str) -> Result<BTreeSet<String>> {
    let mut networks: BTreeSet<String> = graph
        .objects(entity, prop::DEVICE_ON_NETWORK)?
        .into_iter()
        .collect();
    for subnet in graph.objects(entity, prop::DEVICE_ON_SUBNET)? {
        networks.extend(graph.objects(&subnet, prop::SUBNET_OF_NETWORK)?);
    }
    Ok(networks)
}

impl Analyzer for MissingRouters {
    fn key(&self) -> &str {
        "missing-routers"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::MissingRouters]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        _config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut with_devices = BTreeSet::new();
        for device in graph.instances_of(class::DEVICE)? {
            with_devices.extend(placed_networks(graph, &device)?);
        }

        let mut with_routers = BTreeSet::new();
        for router in graph.instances_of(class::ROUTER)? {
            with_routers.extend(placed_networks(graph, &router)?);
            with_routers.extend(graph.objects(&router, prop::SERVES_NETWORK)?);
        }

        let mut output = AnalyzerOutput::new();
        if with_devices.len() < 2 {
            return Ok(output);
        }

        let isolated: Vec<&String> = with_devices.difference(&with_routers).collect();
        if isolated.is_empty() {
            return Ok(output);
        }

        let mut isolated_networks = Vec::with_capacity(isolated.len());
        for network in &isolated {
            isolated_networks.push(NetworkRef {
                network: (*network).clone(),
                name: graph.display_name(network)?,
            });
        }

        let total = with_devices.len();
        let routed = with_routers.len();
        output.push(
            Finding::new(
                IssueType::MissingRouters,
                Severity::Medium,
                format!(
                    "Found {} networks with devices but no routing infrastructure",
                    isolated.len()
                ),
                FindingDetails::MissingRouters {
                    isolated_networks,
                    total_networks: total,
                    routed_networks: routed,
                },
            )
            .affecting(isolated.into_iter().cloned())
            .verbose_with(verbose, || {
                format!(
                    "Networks with devices lack router connections to other networks, which \
                     prevents inter-network communication. Networks with devices: {total}, \
                     networks with routing: {routed}."
                )
            }),
        );
        Ok(output)
    }
}
