//! One network number claimed by several routers.
//!
//! Routers sharing a single subnet are most likely a duplicated router
//! definition; routers spread over several subnets point at two physical
//! networks colliding in the network-number space.

use super::{Analyzer, AnalyzerOutput};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, IssueType, RouterSubnets, Severity};
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};
use std::collections::{BTreeMap, BTreeSet};

pub struct DuplicateNetworks;

impl Analyzer for DuplicateNetworks {
    fn key(&self) -> &str {
        "duplicate-networks"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::DuplicateNetwork, IssueType::DuplicateRouter]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        _config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut by_network: BTreeMap<String, Vec<RouterSubnets>> = BTreeMap::new();
        for router in graph.instances_of(class::ROUTER)? {
            let subnets = graph.objects(&router, prop::DEVICE_ON_SUBNET)?;
            for network in graph.objects(&router, prop::DEVICE_ON_NETWORK)? {
                by_network.entry(network).or_default().push(RouterSubnets {
                    router: router.clone(),
                    subnets: subnets.clone(),
                });
            }
        }

        let mut output = AnalyzerOutput::new();
        for (network, routers) in by_network {
            if routers.len() < 2 {
                continue;
            }
            let subnets: BTreeSet<&String> = routers.iter().flat_map(|r| &r.subnets).collect();
            let (issue_type, severity, description) = if subnets.len() == 1 {
                (
                    IssueType::DuplicateRouter,
                    Severity::Error,
                    "Same network number on multiple routers in the same subnet",
                )
            } else {
                (
                    IssueType::DuplicateNetwork,
                    Severity::Warning,
                    "Same network number on routers in different subnets",
                )
            };

            let router_uris: Vec<String> = routers.iter().map(|r| r.router.clone()).collect();
            let subnet_list = subnets
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let router_count = routers.len();
            output.push(
                Finding::new(
                    issue_type,
                    severity,
                    description,
                    FindingDetails::DuplicateNetwork {
                        network: network.clone(),
                        router_count,
                        routers,
                    },
                )
                .verbose_with(verbose, || {
                    format!(
                        "Network {network} is claimed by {router_count} routers ({}) on subnets: {}.",
                        router_uris.join(", "),
                        if subnet_list.is_empty() { "none" } else { &subnet_list }
                    )
                })
                .affecting(router_uris),
            );
        }
        Ok(output)
    }
}
