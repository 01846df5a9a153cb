//! Device IP addresses outside the CIDR range of their assigned subnet.

use super::{Analyzer, AnalyzerOutput, DeviceFacts};
use crate::addressing::{Cidr, parse_ip};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, IssueType, Severity};
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};
use std::collections::BTreeMap;

pub struct SubnetMismatches;

struct SubnetInfo {
    address: String,
    label: Option<String>,
    network: Option<String>,
}

/// `None` when either side does not parse; such pairs are not judged.
fn outside_subnet(device_address: &str, subnet_address: &str) -> Option<bool> {
    let ip = parse_ip(device_address)?;
    let cidr = Cidr::parse(subnet_address)?;
    Some(!cidr.contains(&ip))
}

impl Analyzer for SubnetMismatches {
    fn key(&self) -> &str {
        "subnet-mismatches"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::SubnetMismatches]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        _config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut subnets = BTreeMap::new();
        for subnet in graph.instances_of(class::SUBNET)? {
            let Some(address) = graph.first(&subnet, prop::SUBNET_ADDRESS)? else {
                continue;
            };
            subnets.insert(
                subnet.clone(),
                SubnetInfo {
                    address,
                    label: graph.label(&subnet)?,
                    network: graph.first(&subnet, prop::SUBNET_OF_NETWORK)?,
                },
            );
        }

        let mut output = AnalyzerOutput::new();
        if subnets.is_empty() {
            return Ok(output);
        }

        for device in graph.instances_of(class::DEVICE)? {
            let facts = DeviceFacts::read(graph, &device)?;
            let Some(device_address) = facts.address.clone() else {
                continue;
            };
            for subnet in graph.objects(&device, prop::DEVICE_ON_SUBNET)? {
                let Some(info) = subnets.get(&subnet) else {
                    continue;
                };
                if outside_subnet(&device_address, &info.address) != Some(true) {
                    continue;
                }

                let device_label = facts.label.clone().unwrap_or_else(|| device.clone());
                let instance = facts.instance_or("unknown");
                let network_label = match &info.network {
                    Some(network) => graph.display_name(network)?,
                    None => "Unknown".to_string(),
                };

                output.push(
                    Finding::new(
                        IssueType::SubnetMismatches,
                        Severity::Medium,
                        format!(
                            "Device IP address {device_address} does not match subnet {}",
                            info.address
                        ),
                        FindingDetails::SubnetMismatch {
                            device: device.clone(),
                            device_label: device_label.clone(),
                            device_instance: instance.clone(),
                            device_address: device_address.clone(),
                            subnet: subnet.clone(),
                            subnet_label: info.label.clone(),
                            subnet_address: info.address.clone(),
                        },
                    )
                    .verbose_with(verbose, || {
                        format!(
                            "Device \"{device_label}\" (instance {instance}) has IP {device_address} \
                             but is assigned to subnet {}. Network: {network_label}",
                            info.address
                        )
                    })
                    .affecting([device.clone()]),
                );
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run;

    const SUBNET: &str = r#"
        <bacnet://subnet/a> a bacnet:Subnet ;
            rdfs:label "Floor 1" ;
            bacnet:subnet-address "192.168.1.0/24" ;
            bacnet:subnet-of-network <bacnet://network/1> .
        <bacnet://network/1> rdfs:label "Main" .
    "#;

    fn device(address: &str) -> String {
        format!(
            r#"{SUBNET}
            <bacnet://dev/1> a bacnet:Device ;
                bacnet:device-instance 10 ;
                bacnet:address "{address}" ;
                bacnet:device-on-subnet <bacnet://subnet/a> .
            "#
        )
    }

    #[test]
    fn address_outside_range_is_flagged() {
        let output = run(&SubnetMismatches, &device("10.0.0.5"), true);
        assert_eq!(output.len(), 1);
        let finding = &output.findings[0];
        assert_eq!(finding.severity(), Severity::Medium);
        assert_eq!(
            finding.description(),
            "Device IP address 10.0.0.5 does not match subnet 192.168.1.0/24"
        );
        assert!(
            finding
                .verbose_description
                .as_deref()
                .is_some_and(|v| v.ends_with("Network: Main"))
        );
    }

    #[test]
    fn address_inside_range_passes() {
        assert!(run(&SubnetMismatches, &device("192.168.1.77"), false).is_empty());
    }

    #[test]
    fn unparseable_addresses_are_skipped() {
        assert!(run(&SubnetMismatches, &device("12"), false).is_empty());
        assert!(run(&SubnetMismatches, &device("192.168.9.1:47808"), false).is_empty());
    }

    #[test]
    fn ipv6_device_on_ipv4_subnet_mismatches() {
        assert_eq!(run(&SubnetMismatches, &device("fe80::1"), false).len(), 1);
    }

    #[test]
    fn host_bits_in_subnet_address_are_tolerated() {
        assert_eq!(outside_subnet("192.168.1.9", "192.168.1.1/24"), Some(false));
        assert_eq!(outside_subnet("192.168.1.9", "garbage"), None);
    }
}
