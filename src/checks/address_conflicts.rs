//! Devices sharing an address on the same network or subnet.

use super::{Analyzer, AnalyzerOutput, DeviceFacts};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{DeviceRef, Finding, FindingDetails, IssueType, MembershipScope, Severity};
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};
use std::collections::BTreeMap;

pub struct DeviceAddressConflicts;

type ScopeGroups = BTreeMap<(String, String), Vec<(String, DeviceRef)>>;

impl Analyzer for DeviceAddressConflicts {
    fn key(&self) -> &str {
        "device-address-conflicts"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::DeviceAddressConflicts]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        _config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut by_network: ScopeGroups = BTreeMap::new();
        let mut by_subnet: ScopeGroups = BTreeMap::new();

        for device in graph.instances_of(class::DEVICE)? {
            let facts = DeviceFacts::read(graph, &device)?;
            let Some(address) = facts.address.clone() else {
                continue;
            };
            let reference = DeviceRef {
                device: device.clone(),
                label: facts.display_label(),
                device_instance: facts.instance_or("Unknown"),
            };
            for network in graph.objects(&device, prop::DEVICE_ON_NETWORK)? {
                by_network
                    .entry((network, address.clone()))
                    .or_default()
                    .push((device.clone(), reference.clone()));
            }
            for subnet in graph.objects(&device, prop::DEVICE_ON_SUBNET)? {
                by_subnet
                    .entry((subnet, address.clone()))
                    .or_default()
                    .push((device.clone(), reference.clone()));
            }
        }

        let mut output = AnalyzerOutput::new();
        output.extend(conflicts(by_network, MembershipScope::Network, verbose));
        output.extend(conflicts(by_subnet, MembershipScope::Subnet, verbose));
        Ok(output)
    }
}

fn conflicts(
    groups: ScopeGroups,
    scope: MembershipScope,
    verbose: bool,
) -> impl Iterator<Item = Finding> {
    groups
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(move |((scope_id, address), members)| {
            let count = members.len();
            let (uris, devices): (Vec<String>, Vec<DeviceRef>) = members.into_iter().unzip();
            let names: Vec<String> = devices.iter().map(|d| d.label.clone()).collect();
            Finding::new(
                IssueType::DeviceAddressConflicts,
                Severity::Critical,
                format!("{count} devices share address {address} on {scope} {scope_id}"),
                FindingDetails::AddressConflict {
                    address: address.clone(),
                    scope,
                    scope_id: scope_id.clone(),
                    devices,
                },
            )
            .affecting(uris)
            .verbose_with(verbose, || {
                format!(
                    "Address conflict detected on {scope} {scope_id}: Address {address} is assigned \
                     to {count} devices: {}. This will cause communication failures as multiple \
                     devices cannot share the same address on the same network segment.",
                    names.join(", ")
                )
            })
        })
}
