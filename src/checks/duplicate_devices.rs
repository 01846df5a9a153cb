//! Duplicate device instance numbers across different networks or subnets.

use super::{Analyzer, AnalyzerOutput};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{DeviceMembership, Finding, FindingDetails, IssueType, MembershipScope, Severity};
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};
use std::collections::{BTreeMap, BTreeSet};

pub struct DuplicateDeviceIds;

impl Analyzer for DuplicateDeviceIds {
    fn key(&self) -> &str {
        "duplicate-device-ids"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::DuplicateDeviceId]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        _config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut by_instance: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for device in graph.instances_of(class::DEVICE)? {
            for instance in graph.objects(&device, prop::DEVICE_INSTANCE)? {
                by_instance.entry(instance).or_default().push(device.clone());
            }
        }

        let mut output = AnalyzerOutput::new();
        for (device_id, devices) in by_instance {
            if devices.len() < 2 {
                continue;
            }

            let mut memberships = Vec::new();
            for device in &devices {
                for network in graph.objects(device, prop::DEVICE_ON_NETWORK)? {
                    memberships.push(DeviceMembership {
                        device: device.clone(),
                        network,
                        network_type: MembershipScope::Network,
                    });
                }
                for subnet in graph.objects(device, prop::DEVICE_ON_SUBNET)? {
                    memberships.push(DeviceMembership {
                        device: device.clone(),
                        network: subnet,
                        network_type: MembershipScope::Subnet,
                    });
                }
            }

            // Duplicates confined to a single scope belong to the address-conflict check.
            let scopes: BTreeSet<(&str, MembershipScope)> = memberships
                .iter()
                .map(|m| (m.network.as_str(), m.network_type))
                .collect();
            if scopes.len() < 2 {
                continue;
            }
            let scope_count = scopes.len();

            let device_count = devices.len();
            let finding = Finding::new(
                IssueType::DuplicateDeviceId,
                Severity::Critical,
                format!("Device ID {device_id} appears on {device_count} different devices"),
                FindingDetails::DuplicateDeviceId {
                    device_id: device_id.clone(),
                    device_count,
                    devices: memberships,
                },
            )
            .affecting(devices.iter().cloned())
            .verbose_with(verbose, || {
                format!(
                    "Device instance {device_id} is used by {device_count} devices spread over \
                     {scope_count} networks/subnets: {}. BACnet device instances must be unique \
                     across the internetwork or discovery and routing become ambiguous.",
                    devices.join(", ")
                )
            });
            output.push(finding);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run;

    #[test]
    fn same_id_on_two_networks_is_one_finding() {
        let output = run(
            &DuplicateDeviceIds,
            r#"
            <bacnet://dev/a> a bacnet:Device ;
                bacnet:device-instance 123 ;
                bacnet:device-on-network <bacnet://network/19103> .
            <bacnet://dev/b> a bacnet:Device ;
                bacnet:device-instance 123 ;
                bacnet:device-on-network <bacnet://network/9103> .
            <bacnet://dev/c> a bacnet:Device ;
                bacnet:device-instance 789 ;
                bacnet:device-on-network <bacnet://network/9103> .
            "#,
            false,
        );
        assert_eq!(output.len(), 1);
        let finding = &output.findings[0];
        assert_eq!(finding.severity(), Severity::Critical);
        assert_eq!(
            finding.affected_entities(),
            ["bacnet://dev/a", "bacnet://dev/b"]
        );
        match &finding.details {
            FindingDetails::DuplicateDeviceId {
                device_id,
                device_count,
                devices,
            } => {
                assert_eq!(device_id, "123");
                assert_eq!(*device_count, 2);
                assert_eq!(devices.len(), 2);
            }
            other => panic!("unexpected details: {other:?}"),
        }
        assert!(finding.verbose_description.is_none());
    }

    #[test]
    fn same_scope_duplicates_are_not_flagged() {
        let output = run(
            &DuplicateDeviceIds,
            r#"
            <bacnet://dev/a> a bacnet:Device ;
                bacnet:device-instance 123 ;
                bacnet:device-on-network <bacnet://network/1> .
            <bacnet://dev/b> a bacnet:Device ;
                bacnet:device-instance 123 ;
                bacnet:device-on-network <bacnet://network/1> .
            "#,
            false,
        );
        assert!(output.is_empty());
    }

    #[test]
    fn network_and_subnet_scopes_differ() {
        let output = run(
            &DuplicateDeviceIds,
            r#"
            <bacnet://dev/a> a bacnet:Device ;
                bacnet:device-instance 5 ;
                bacnet:device-on-network <bacnet://network/1> .
            <bacnet://dev/b> a bacnet:Device ;
                bacnet:device-instance 5 ;
                bacnet:device-on-subnet <bacnet://subnet/1> .
            "#,
            true,
        );
        assert_eq!(output.len(), 1);
        assert!(output.findings[0].verbose_description.is_some());
    }
}
