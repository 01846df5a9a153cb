//! Networks carrying more devices than their physical type handles well.
//!
//! Thresholds depend on the detected [`NetworkKind`]: token-passing MS/TP and
//! ARCNET segments saturate long before BACnet/IP, and point-to-point links
//! should only ever join two devices. The kind is taken from the first source
//! that names one:
//!
//! 1. the `network-type` property,
//! 2. the network label,
//! 3. the network URI,
//! 4. a sample of member device addresses (dotted quads vs. small MAC numbers).

use super::{Analyzer, AnalyzerOutput};
use crate::addressing::{looks_like_ip, looks_like_mstp_mac};
use crate::config::{CheckConfig, Thresholds};
use crate::error::Result;
use crate::finding::{DeviceBreakdown, Finding, FindingDetails, IssueType, NetworkKind, Severity};
use crate::graph::{BacnetGraph, uri_tail};
use crate::topology::Membership;
use crate::vocab::{class, prop};
use std::collections::BTreeSet;

const ADDRESS_SAMPLE: usize = 10;
const BREAKDOWN_SAMPLE: usize = 10;

pub struct OversizedNetworks;

fn kind_from_type_text(text: &str) -> Option<NetworkKind> {
    let text = text.to_lowercase();
    if ["mstp", "master-slave", "token-passing"].iter().any(|k| text.contains(k)) {
        Some(NetworkKind::Mstp)
    } else if text.contains("ip") || text.contains("ethernet") {
        Some(NetworkKind::Ip)
    } else if text.contains("arcnet") {
        Some(NetworkKind::Arcnet)
    } else if text.contains("ptp") || text.contains("point-to-point") {
        Some(NetworkKind::Ptp)
    } else {
        None
    }
}

fn kind_from_label(label: &str) -> Option<NetworkKind> {
    let lower = label.to_lowercase();
    let any = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));
    if any(&["mstp", "master-slave", "token"]) {
        Some(NetworkKind::Mstp)
    } else if any(&["ip", "ethernet", "tcp"]) {
        Some(NetworkKind::Ip)
    } else if any(&["arcnet"]) {
        Some(NetworkKind::Arcnet)
    } else if any(&["ptp", "point-to-point"]) {
        Some(NetworkKind::Ptp)
    } else {
        None
    }
}

fn kind_from_uri(uri: &str) -> Option<NetworkKind> {
    let lower = uri.to_lowercase();
    if lower.contains("mstp") || lower.contains("master-slave") {
        Some(NetworkKind::Mstp)
    } else if lower.contains("ip") || lower.contains("ethernet") {
        Some(NetworkKind::Ip)
    } else if lower.contains("arcnet") {
        Some(NetworkKind::Arcnet)
    } else if lower.contains("ptp") {
        Some(NetworkKind::Ptp)
    } else {
        None
    }
}

/// Majority vote between IP-looking and MS/TP-MAC-looking addresses.
pub fn kind_from_addresses<'a>(addresses: impl IntoIterator<Item = &'a str>) -> NetworkKind {
    let (mut ip, mut mac) = (0usize, 0usize);
    for address in addresses.into_iter().take(ADDRESS_SAMPLE) {
        if looks_like_ip(address) {
            ip += 1;
        } else if looks_like_mstp_mac(address) {
            mac += 1;
        }
    }
    if ip > mac {
        NetworkKind::Ip
    } else if mac > 0 {
        NetworkKind::Mstp
    } else {
        NetworkKind::Other
    }
}

fn detect_kind(
    graph: &BacnetGraph<'_>,
    network: &str,
    members: &BTreeSet<String>,
) -> Result<NetworkKind> {
    for declared in graph.objects(network, prop::NETWORK_TYPE)? {
        if let Some(kind) = kind_from_type_text(&declared) {
            return Ok(kind);
        }
    }
    if let Some(kind) = graph.label(network)?.as_deref().and_then(kind_from_label) {
        return Ok(kind);
    }
    if let Some(kind) = kind_from_uri(network) {
        return Ok(kind);
    }
    let mut addresses = Vec::new();
    for member in members {
        addresses.extend(graph.objects(member, prop::ADDRESS)?);
        if addresses.len() >= ADDRESS_SAMPLE {
            break;
        }
    }
    Ok(kind_from_addresses(addresses.iter().map(String::as_str)))
}

fn recommendation(kind: NetworkKind, device_count: usize, limits: Thresholds) -> String {
    let critical = device_count >= limits.critical;
    let Thresholds { warning, critical: critical_at } = limits;
    match kind {
        NetworkKind::Mstp if critical => format!(
            "CRITICAL: MSTP networks with {device_count} devices severely impact token passing \
             performance. Immediately segment this network. MSTP best practices recommend max \
             15-20 devices per segment. Consider splitting into multiple MSTP segments or migrating \
             high-traffic devices to IP networks. Token circulation time increases exponentially \
             with device count."
        ),
        NetworkKind::Mstp => format!(
            "MSTP network approaching capacity limits. Consider segmentation before reaching \
             {critical_at} devices. MSTP token-passing protocol becomes increasingly inefficient \
             with more devices. Monitor response times and consider splitting the network if \
             delays are observed."
        ),
        NetworkKind::Ip if critical => format!(
            "Immediately segment this IP network. Consider implementing VLANs or subnets with \
             {}-{warning} devices each. Use routers to connect segments and implement BBMD \
             (BACnet Broadcast Management Device) to control broadcast traffic across network \
             boundaries.",
            warning / 2
        ),
        NetworkKind::Ip => format!(
            "Consider segmenting this IP network before reaching {critical_at} devices. Target \
             {}-{} devices per subnet for optimal performance. Monitor broadcast traffic and \
             network response times.",
            warning / 2,
            warning * 2 / 3
        ),
        NetworkKind::Ptp => format!(
            "Point-to-Point networks should only have 2 devices. Current configuration with \
             {device_count} devices indicates a network topology issue. Verify network \
             configuration and consider using a different network type."
        ),
        _ if critical => format!(
            "Network has reached critical device density. Implement network segmentation \
             immediately. Consider splitting into segments with {}-{warning} devices each. Use \
             appropriate routing/bridging based on the physical network type.",
            warning / 2
        ),
        other => format!(
            "Monitor network performance and consider segmentation as device count approaches \
             {critical_at}. Network type '{other}' may have specific constraints - consult vendor \
             documentation."
        ),
    }
}

fn breakdown(members: &BTreeSet<String>) -> DeviceBreakdown {
    DeviceBreakdown {
        total_devices: members.len(),
        sample_devices: members
            .iter()
            .take(BREAKDOWN_SAMPLE)
            .map(|m| uri_tail(m).to_owned())
            .collect(),
        truncated: members.len() > BREAKDOWN_SAMPLE,
    }
}

impl Analyzer for OversizedNetworks {
    fn key(&self) -> &str {
        "oversized-networks"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[
            IssueType::OversizedNetworksWarning,
            IssueType::OversizedNetworksCritical,
        ]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut output = AnalyzerOutput::new();
        let networks: BTreeSet<String> = graph.instances_of(class::NETWORK)?.into_iter().collect();
        if networks.is_empty() {
            return Ok(output);
        }

        let members = Membership::build(graph)?.network_members();
        for (network, devices) in members.iter().filter(|(n, _)| networks.contains(*n)) {
            let device_count = devices.len();
            let kind = detect_kind(graph, network, devices)?;
            let limits = config.network_thresholds.for_kind(kind);

            let (issue_type, severity, threshold, impact, level) = if device_count >= limits.critical {
                (
                    IssueType::OversizedNetworksCritical,
                    Severity::Critical,
                    limits.critical,
                    "severe",
                    "critically high - performance severely impacted",
                )
            } else if device_count >= limits.warning {
                (
                    IssueType::OversizedNetworksWarning,
                    Severity::Warning,
                    limits.warning,
                    "moderate",
                    "high - performance may be impacted",
                )
            } else {
                continue;
            };

            let kind_name = kind.as_ref().to_uppercase();
            let network_name = graph.network_name(network)?;
            let warning = limits.warning;

            output.push(
                Finding::new(
                    issue_type,
                    severity,
                    format!("{kind_name} network has {device_count} devices ({level})"),
                    FindingDetails::OversizedNetwork {
                        network: network.clone(),
                        network_name: network_name.clone(),
                        network_type: kind,
                        device_count,
                        threshold,
                        warning_threshold: limits.warning,
                        critical_threshold: limits.critical,
                        performance_impact: impact.to_string(),
                        recommendation: recommendation(kind, device_count, limits),
                        device_breakdown: verbose.then(|| breakdown(devices)),
                    },
                )
                .verbose_with(verbose, || {
                    format!(
                        "{kind_name} network {network_name} contains {device_count} devices, which \
                         exceeds BACnet best practice recommendations for {kind_name} networks \
                         (>{warning}). {kind_name} networks with more than {warning} devices can \
                         experience increased broadcast traffic, slower response times, and \
                         potential network congestion. Consider segmenting this network or \
                         implementing additional subnets to improve performance."
                    )
                })
                .affecting([network.clone()]),
            );
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run;

    fn network_with_devices(network: &str, extra: &str, count: usize, address: impl Fn(usize) -> String) -> String {
        let mut body = format!("<{network}> a bacnet:BACnetNetwork {extra} .\n");
        for i in 0..count {
            body.push_str(&format!(
                "<bacnet://dev/{i}> a bacnet:Device ; bacnet:address \"{}\" ; bacnet:device-on-network <{network}> .\n",
                address(i)
            ));
        }
        body
    }

    #[test]
    fn seventeen_devices_on_mstp_is_a_warning_but_not_on_ip() {
        let mstp = network_with_devices(
            "bacnet://network/100",
            r#"; bacnet:network-type "MSTP""#,
            17,
            |i| (i + 1).to_string(),
        );
        let output = run(&OversizedNetworks, &mstp, false);
        assert_eq!(output.len(), 1);
        let finding = &output.findings[0];
        assert_eq!(finding.issue_type, IssueType::OversizedNetworksWarning);
        assert_eq!(finding.severity(), Severity::Warning);
        assert_eq!(
            finding.description(),
            "MSTP network has 17 devices (high - performance may be impacted)"
        );

        let ip = network_with_devices("bacnet://network/200", "", 17, |i| format!("10.0.0.{i}"));
        assert!(run(&OversizedNetworks, &ip, false).is_empty());
    }

    #[test]
    fn address_sampling_detects_mstp() {
        let body = network_with_devices("bacnet://network/300", "", 30, |i| ((i % 100) + 1).to_string());
        let output = run(&OversizedNetworks, &body, true);
        assert_eq!(output.len(), 1);
        let finding = &output.findings[0];
        assert_eq!(finding.issue_type, IssueType::OversizedNetworksCritical);
        let FindingDetails::OversizedNetwork {
            network_type,
            threshold,
            device_breakdown,
            performance_impact,
            ..
        } = &finding.details
        else {
            panic!("expected oversized network details");
        };
        assert_eq!(*network_type, NetworkKind::Mstp);
        assert_eq!(*threshold, 30);
        assert_eq!(performance_impact, "severe");
        let breakdown = device_breakdown.as_ref().unwrap();
        assert_eq!(breakdown.total_devices, 30);
        assert_eq!(breakdown.sample_devices.len(), 10);
        assert!(breakdown.truncated);
    }

    #[test]
    fn subnet_members_count_toward_parent_network() {
        let mut body = String::from(
            r#"
            <bacnet://network/ptp> a bacnet:BACnetNetwork .
            <bacnet://subnet/a> bacnet:subnet-of-network <bacnet://network/ptp> .
            "#,
        );
        for i in 0..3 {
            body.push_str(&format!(
                "<bacnet://dev/{i}> a bacnet:Device ; bacnet:device-on-subnet <bacnet://subnet/a> .\n"
            ));
        }
        let output = run(&OversizedNetworks, &body, false);
        assert_eq!(output.len(), 1);
        assert_eq!(output.findings[0].issue_type, IssueType::OversizedNetworksCritical);
        assert!(output.findings[0].description().starts_with("PTP network has 3 devices"));
    }

    #[test]
    fn kind_detection_sources() {
        assert_eq!(kind_from_type_text("BACnet/IP"), Some(NetworkKind::Ip));
        assert_eq!(kind_from_type_text("Token-Passing"), Some(NetworkKind::Mstp));
        assert_eq!(kind_from_label("Token ring"), Some(NetworkKind::Mstp));
        assert_eq!(kind_from_label("TCP backbone"), Some(NetworkKind::Ip));
        assert_eq!(kind_from_label("ARCNET over TCP"), Some(NetworkKind::Ip));
        assert_eq!(kind_from_label("Legacy ARCNET"), Some(NetworkKind::Arcnet));
        assert_eq!(kind_from_uri("bacnet://network/ARCNET-1"), Some(NetworkKind::Arcnet));
        assert_eq!(kind_from_uri("bacnet://network/7"), None);
        assert_eq!(
            kind_from_addresses(["10.0.0.1", "10.0.0.2:47808", "5"]),
            NetworkKind::Ip
        );
        assert_eq!(kind_from_addresses(["5", "6", "10.0.0.1"]), NetworkKind::Mstp);
        assert_eq!(kind_from_addresses(["ab:cd", "500"]), NetworkKind::Other);
    }

    #[test]
    fn ip_recommendation_uses_warning_fractions() {
        let text = recommendation(NetworkKind::Ip, 60, Thresholds::new(50, 100));
        assert!(text.contains("Target 25-33 devices per subnet"));
    }
}
