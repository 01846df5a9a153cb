//! Devices with no network or subnet membership at all.

use super::{Analyzer, AnalyzerOutput, DeviceFacts};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, IssueType, Severity};
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};

pub struct OrphanedDevices;

impl Analyzer for OrphanedDevices {
    fn key(&self) -> &str {
        "orphaned-devices"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::OrphanedDevices]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        _config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut output = AnalyzerOutput::new();

        for device in graph.instances_of(class::DEVICE)? {
            if graph.has(&device, prop::DEVICE_ON_NETWORK)?
                || graph.has(&device, prop::DEVICE_ON_SUBNET)?
            {
                continue;
            }

            let facts = DeviceFacts::read(graph, &device)?;
            let label = facts.label.clone().unwrap_or_else(|| device.clone());
            let instance = facts.instance_or("unknown");
            let property_count = if verbose {
                graph.describe(&device)?.len()
            } else {
                0
            };

            output.push(
                Finding::new(
                    IssueType::OrphanedDevices,
                    Severity::Critical,
                    format!(
                        "Device {label} (instance {instance}) is not connected to any network or subnet"
                    ),
                    FindingDetails::OrphanedDevice {
                        device: device.clone(),
                        label: label.clone(),
                        device_instance: instance,
                        address: facts.address_or("unknown"),
                    },
                )
                .verbose_with(verbose, || {
                    format!(
                        "Device {label} (URI: {device}) has {property_count} properties but lacks \
                         both device-on-network and device-on-subnet connections. This device \
                         cannot communicate with other devices on the BACnet network."
                    )
                })
                .affecting([device]),
            );
        }
        Ok(output)
    }
}
