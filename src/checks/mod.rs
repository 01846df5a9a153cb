//! Per-issue analyzers, grouped by domain.
//!
//! Identity and addressing: [`duplicate_devices`], [`address_conflicts`],
//! [`device_ranges`], [`vendor_ids`], [`missing_properties`].
//! Connectivity: [`orphaned_devices`], [`missing_routers`],
//! [`unreachable_networks`], [`subnet_mismatches`].
//! Routing topology: [`network_loops`], [`duplicate_networks`], [`duplicate_bbmds`].
//! Performance: [`oversized_networks`], [`broadcast_domains`],
//! [`routing_inefficiencies`].

pub mod address_conflicts;
pub mod broadcast_domains;
pub mod device_ranges;
pub mod duplicate_bbmds;
pub mod duplicate_devices;
pub mod duplicate_networks;
pub mod missing_properties;
pub mod missing_routers;
pub mod network_loops;
pub mod orphaned_devices;
pub mod oversized_networks;
pub mod routing_inefficiencies;
pub mod subnet_mismatches;
pub mod unreachable_networks;
pub mod vendor_ids;

use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, IssueType};
use crate::graph::BacnetGraph;
use crate::vocab::prop;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Findings of one analyzer pass plus every entity they refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzerOutput {
    pub findings: Vec<Finding>,
    pub affected: BTreeSet<String>,
}

impl AnalyzerOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: Finding) {
        self.affected
            .extend(finding.affected_entities().iter().cloned());
        self.findings.push(finding);
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings of one issue type, in emission order.
    pub fn of_type(&self, issue_type: IssueType) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(move |f| f.issue_type == issue_type)
    }
}

impl Extend<Finding> for AnalyzerOutput {
    fn extend<T: IntoIterator<Item = Finding>>(&mut self, iter: T) {
        for finding in iter {
            self.push(finding);
        }
    }
}

/// One analysis pass producing findings for one or more issue types.
///
/// `key` is the dedup identity: the registry runs each key at most once per
/// `execute_checks` call, however many of its issue types were requested.
pub trait Analyzer: Send + Sync {
    fn key(&self) -> &str;

    /// Issue types this pass produces. More than one means the types share
    /// the pass and are always reported together.
    fn issue_types(&self) -> &[IssueType];

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput>;
}

/// Every built-in analyzer.
pub fn default_analyzers() -> Vec<Arc<dyn Analyzer>> {
    vec![
        // Identity and addressing
        Arc::new(duplicate_devices::DuplicateDeviceIds),
        Arc::new(address_conflicts::DeviceAddressConflicts),
        Arc::new(device_ranges::InvalidDeviceRanges),
        Arc::new(vendor_ids::MissingVendorIds),
        Arc::new(missing_properties::MissingProperties),
        // Connectivity
        Arc::new(orphaned_devices::OrphanedDevices),
        Arc::new(missing_routers::MissingRouters),
        Arc::new(unreachable_networks::UnreachableNetworks),
        Arc::new(subnet_mismatches::SubnetMismatches),
        // Routing topology
        Arc::new(network_loops::NetworkLoops),
        Arc::new(duplicate_networks::DuplicateNetworks),
        Arc::new(duplicate_bbmds::DuplicateBbmds),
        // Performance
        Arc::new(oversized_networks::OversizedNetworks),
        Arc::new(broadcast_domains::BroadcastDomains),
        Arc::new(routing_inefficiencies::RoutingInefficiencies),
    ]
}

/// Label, instance and address of a device, each `None` when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DeviceFacts {
    pub label: Option<String>,
    pub instance: Option<String>,
    pub address: Option<String>,
}

impl DeviceFacts {
    pub fn read(graph: &BacnetGraph<'_>, device: &str) -> Result<Self> {
        Ok(Self {
            label: graph.label(device)?,
            instance: graph.first(device, prop::DEVICE_INSTANCE)?,
            address: graph.first(device, prop::ADDRESS)?,
        })
    }

    /// Label, else `Device {instance}`, else `Device Unknown`.
    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| {
            format!("Device {}", self.instance.as_deref().unwrap_or("Unknown"))
        })
    }

    pub fn instance_or(&self, fallback: &str) -> String {
        self.instance.clone().unwrap_or_else(|| fallback.to_string())
    }

    pub fn address_or(&self, fallback: &str) -> String {
        self.address.clone().unwrap_or_else(|| fallback.to_string())
    }
}

/// Devices whose label or URI contains the marker are infrastructure nodes.
pub(crate) fn is_excluded(device: &str, label: Option<&str>, marker: &str) -> bool {
    !marker.is_empty() && (device.contains(marker) || label.is_some_and(|l| l.contains(marker)))
}
