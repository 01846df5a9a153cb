//! Broadcast domain sizing, BBMD coverage and overlapping IP ranges.
//!
//! Each typed network is one broadcast domain. Its devices are the ones placed
//! on the network directly or on one of its typed subnets; device IPv4
//! addresses are bucketed into inferred `/24` ranges, which set the domain's
//! [`BroadcastScope`].

use super::{Analyzer, AnalyzerOutput};
use crate::addressing::ipv4_slash24;
use crate::config::{BroadcastThresholds, CheckConfig};
use crate::error::Result;
use crate::finding::{BroadcastScope, Finding, FindingDetails, IssueType, Severity};
use crate::graph::{BacnetGraph, uri_tail};
use crate::vocab::{class, prop};
use std::collections::{BTreeMap, BTreeSet};

pub struct BroadcastDomains;

/// One network's broadcast footprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastDomain {
    pub network: String,
    pub subnets: BTreeSet<String>,
    pub devices: BTreeSet<String>,
    pub bbmds: BTreeSet<String>,
    pub ip_ranges: BTreeSet<String>,
}

impl BroadcastDomain {
    pub fn scope(&self) -> BroadcastScope {
        BroadcastScope::from_range_count(self.ip_ranges.len())
    }

    fn name(&self) -> &str {
        uri_tail(&self.network)
    }
}

/// Collects every typed network's broadcast domain, keyed by network URI.
pub fn collect_domains(graph: &BacnetGraph<'_>) -> Result<BTreeMap<String, BroadcastDomain>> {
    let networks: BTreeSet<String> = graph.instances_of(class::NETWORK)?.into_iter().collect();
    let subnets: BTreeSet<String> = graph.instances_of(class::SUBNET)?.into_iter().collect();
    let bbmds: BTreeSet<String> = graph.instances_of(class::BBMD)?.into_iter().collect();

    let mut domains: BTreeMap<String, BroadcastDomain> = networks
        .iter()
        .map(|n| {
            (
                n.clone(),
                BroadcastDomain {
                    network: n.clone(),
                    ..BroadcastDomain::default()
                },
            )
        })
        .collect();

    for (subnet, network) in graph.pairs(prop::SUBNET_OF_NETWORK)? {
        if !subnets.contains(&subnet) {
            continue;
        }
        if let Some(domain) = domains.get_mut(&network) {
            domain.subnets.insert(subnet);
        }
    }

    for domain in domains.values_mut() {
        domain
            .devices
            .extend(graph.subjects_with(prop::DEVICE_ON_NETWORK, &domain.network)?);
        for subnet in &domain.subnets {
            domain
                .devices
                .extend(graph.subjects_with(prop::DEVICE_ON_SUBNET, subnet)?);
            for predicate in [prop::BBMD_ON_SUBNET, prop::BBMD_BROADCAST_DOMAIN] {
                domain.bbmds.extend(
                    graph
                        .subjects_with(predicate, subnet)?
                        .into_iter()
                        .filter(|b| bbmds.contains(b)),
                );
            }
        }
        for device in &domain.devices {
            for address in graph.objects(device, prop::ADDRESS)? {
                domain.ip_ranges.extend(ipv4_slash24(&address));
            }
        }
    }
    Ok(domains)
}

fn size_finding(domain: &BroadcastDomain, limits: &BroadcastThresholds, verbose: bool) -> Option<Finding> {
    let subnet_count = domain.subnets.len();
    let device_count = domain.devices.len();
    let critical =
        subnet_count >= limits.subnets.critical || device_count >= limits.devices.critical;
    let warning = subnet_count >= limits.subnets.warning || device_count >= limits.devices.warning;

    let (issue_type, severity, subnet_threshold, device_threshold, impact, recommendation) =
        if critical {
            (
                IssueType::BroadcastDomainCritical,
                Severity::Critical,
                limits.subnets.critical,
                limits.devices.critical,
                format!(
                    "Severe broadcast traffic with {device_count} devices across {subnet_count} \
                     subnets causing network congestion"
                ),
                format!(
                    "Immediately implement network segmentation. Deploy BBMD to manage broadcast \
                     traffic across {subnet_count} subnets. Consider VLANs or physical network \
                     separation to reduce broadcast scope. Target maximum 3-4 subnets per \
                     broadcast domain."
                ),
            )
        } else if warning {
            (
                IssueType::BroadcastDomainWarning,
                Severity::Warning,
                limits.subnets.warning,
                limits.devices.warning,
                format!(
                    "Moderate broadcast overhead with {device_count} devices affecting network performance"
                ),
                "Consider implementing BBMD for better broadcast management. Monitor network \
                 performance and plan for segmentation if device count exceeds 300 or subnet \
                 count exceeds 6."
                    .to_string(),
            )
        } else {
            return None;
        };

    let name = domain.name();
    Some(
        Finding::new(
            issue_type,
            severity,
            format!("Large broadcast domain: {subnet_count} subnets, {device_count} devices"),
            FindingDetails::BroadcastDomainSize {
                network: domain.network.clone(),
                network_name: name.to_owned(),
                subnet_count,
                device_count,
                broadcast_scope: domain.scope(),
                subnet_threshold,
                device_threshold,
                performance_impact: impact,
                recommendation,
                affected_subnets: domain.subnets.iter().cloned().collect(),
                ip_ranges: domain.ip_ranges.iter().cloned().collect(),
            },
        )
        .verbose_with(verbose, || {
            format!(
                "Broadcast domain {name} spans {subnet_count} subnets with {device_count} devices. \
                 Large broadcast domains can cause network congestion due to broadcast traffic \
                 propagation. Consider implementing BBMD (BACnet Broadcast Management Device) or \
                 network segmentation to reduce broadcast scope and improve performance."
            )
        })
        .affecting([domain.network.clone()]),
    )
}

fn needs_bbmd(domain: &BroadcastDomain, limits: &BroadcastThresholds) -> bool {
    domain.subnets.len() > limits.bbmd_subnet_trigger
        || domain.devices.len() > limits.bbmd_device_trigger
        || domain.scope().spans_multiple_ranges()
        || domain.ip_ranges.len() > 1
}

fn why_bbmd_needed(domain: &BroadcastDomain, limits: &BroadcastThresholds) -> String {
    let mut reasons = Vec::new();
    let (subnets, devices, scope) = (domain.subnets.len(), domain.devices.len(), domain.scope());
    if subnets > limits.bbmd_subnet_trigger {
        reasons.push(format!(
            "{subnets} subnets require inter-subnet broadcast coordination"
        ));
    }
    if devices > limits.bbmd_device_trigger {
        reasons.push(format!(
            "{devices} devices generate significant broadcast traffic"
        ));
    }
    if scope.spans_multiple_ranges() {
        reasons.push(format!("{scope} broadcast scope spans multiple IP ranges"));
    }
    reasons.join("; ")
}

/// How many BBMDs a domain with `subnet_count` subnets should carry, and where.
pub fn bbmd_placement(subnet_count: usize) -> String {
    match subnet_count {
        0..=3 => "Deploy 1 BBMD on the central subnet with BDT entries for all subnets".to_string(),
        4..=6 => {
            "Deploy 2 BBMDs for redundancy on central subnets with overlapping BDT coverage"
                .to_string()
        }
        n => format!(
            "Deploy {} BBMDs distributed across subnets for optimal coverage",
            n.div_ceil(3)
        ),
    }
}

fn coverage_finding(
    domain: &BroadcastDomain,
    limits: &BroadcastThresholds,
    verbose: bool,
) -> Option<Finding> {
    if !domain.bbmds.is_empty() || !needs_bbmd(domain, limits) {
        return None;
    }
    let subnet_count = domain.subnets.len();
    let device_count = domain.devices.len();
    let scope = domain.scope();
    let name = domain.name();
    Some(
        Finding::new(
            IssueType::MissingBbmdCoverage,
            Severity::Warning,
            format!(
                "Missing BBMD coverage for complex broadcast domain ({subnet_count} subnets, {device_count} devices)"
            ),
            FindingDetails::MissingBbmdCoverage {
                network: domain.network.clone(),
                network_name: name.to_owned(),
                subnet_count,
                device_count,
                broadcast_scope: scope,
                why_needed: why_bbmd_needed(domain, limits),
                recommendation: bbmd_placement(subnet_count),
                affected_subnets: domain.subnets.iter().cloned().collect(),
                performance_risk: "Broadcast storms and inefficient device discovery".to_string(),
            },
        )
        .verbose_with(verbose, || {
            format!(
                "Broadcast domain {name} lacks BBMD (BACnet Broadcast Management Device) coverage. \
                 With {subnet_count} subnets and {device_count} devices across {scope} broadcast \
                 scope, BBMD implementation would improve broadcast efficiency and prevent network \
                 congestion."
            )
        })
        .affecting([domain.network.clone()]),
    )
}

fn overlap_findings(domains: &BTreeMap<String, BroadcastDomain>, verbose: bool) -> Vec<Finding> {
    let mut by_range: BTreeMap<&str, Vec<&BroadcastDomain>> = BTreeMap::new();
    for domain in domains.values() {
        for range in &domain.ip_ranges {
            by_range.entry(range).or_default().push(domain);
        }
    }

    by_range
        .into_iter()
        .filter(|(_, sharing)| sharing.len() > 1)
        .map(|(range, sharing)| {
            let names: Vec<String> = sharing.iter().map(|d| d.name().to_owned()).collect();
            let networks: Vec<String> = sharing.iter().map(|d| d.network.clone()).collect();
            let domain_count = sharing.len();
            Finding::new(
                IssueType::BroadcastDomainOverlap,
                Severity::Warning,
                format!("Broadcast domain overlap: {domain_count} domains share IP range {range}"),
                FindingDetails::BroadcastDomainOverlap {
                    ip_range: range.to_owned(),
                    overlapping_domains: names.clone(),
                    domain_count,
                    affected_networks: networks.clone(),
                    conflict_risk: "Potential broadcast conflicts and address confusion".to_string(),
                    recommendation:
                        "Review network segmentation and ensure proper VLAN/subnet isolation"
                            .to_string(),
                },
            )
            .verbose_with(verbose, || {
                format!(
                    "Networks {} have overlapping broadcast domains in IP range {range}. This can \
                     cause broadcast traffic conflicts and device discovery issues.",
                    names.join(", ")
                )
            })
            .affecting(networks)
        })
        .collect()
}

impl Analyzer for BroadcastDomains {
    fn key(&self) -> &str {
        "broadcast-domains"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[
            IssueType::BroadcastDomainWarning,
            IssueType::BroadcastDomainCritical,
            IssueType::MissingBbmdCoverage,
            IssueType::BroadcastDomainOverlap,
        ]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let domains = collect_domains(graph)?;
        let limits = &config.broadcast;

        let mut output = AnalyzerOutput::new();
        output.extend(domains.values().filter_map(|d| size_finding(d, limits, verbose)));
        output.extend(domains.values().filter_map(|d| coverage_finding(d, limits, verbose)));
        output.extend(overlap_findings(&domains, verbose));
        Ok(output)
    }
}
