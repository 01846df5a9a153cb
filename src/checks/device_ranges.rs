//! Device instance numbers outside BACnet's 22-bit instance space.
//!
//! Blank instance literals are treated like a missing instance and skipped.

use super::{Analyzer, AnalyzerOutput, DeviceFacts};
use crate::addressing::{IntegerLiteral, classify_integer};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, InstanceProblem, IssueType, Severity};
use crate::graph::BacnetGraph;
use crate::vocab::class;

const MIN_DEVICE_INSTANCE: i64 = 0;

pub struct InvalidDeviceRanges;

impl Analyzer for InvalidDeviceRanges {
    fn key(&self) -> &str {
        "invalid-device-ranges"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::InvalidDeviceRanges]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let max = config.device_instance_max;
        let mut output = AnalyzerOutput::new();

        for device in graph.instances_of(class::DEVICE)? {
            let facts = DeviceFacts::read(graph, &device)?;
            let Some(instance) = facts.instance.clone().filter(|i| !i.trim().is_empty()) else {
                continue;
            };
            let label = facts.display_label();
            let address = facts.address_or("Unknown");

            let (problem, description, verbose_text) = match classify_integer(&instance) {
                IntegerLiteral::Value(v) if (MIN_DEVICE_INSTANCE..=max).contains(&v) => continue,
                IntegerLiteral::NotNumeric => (
                    InstanceProblem::NotNumeric,
                    format!(
                        "Device instance \"{instance}\" is not a valid number. Valid range: {MIN_DEVICE_INSTANCE}-{max}"
                    ),
                    format!(
                        "Device {label} (instance {instance}) at address {address} has an invalid \
                         device instance \"{instance}\" which is not a valid number. BACnet device \
                         instances must be integers in range {MIN_DEVICE_INSTANCE}-{max}."
                    ),
                ),
                IntegerLiteral::Value(_) | IntegerLiteral::Overflow { .. } => {
                    let shown = instance.trim();
                    (
                        InstanceProblem::OutOfRange,
                        format!(
                            "Device instance {shown} is outside valid BACnet range ({MIN_DEVICE_INSTANCE}-{max})"
                        ),
                        format!(
                            "Device {label} (instance {shown}) at address {address} has an invalid \
                             device instance {shown} which is outside the valid BACnet range. BACnet \
                             device instances must be in range {MIN_DEVICE_INSTANCE}-{max}."
                        ),
                    )
                }
            };

            output.push(
                Finding::new(
                    IssueType::InvalidDeviceRanges,
                    Severity::Critical,
                    description,
                    FindingDetails::InvalidDeviceInstance {
                        device: device.clone(),
                        label,
                        device_instance: instance,
                        problem,
                        valid_min: MIN_DEVICE_INSTANCE,
                        valid_max: max,
                    },
                )
                .affecting([device])
                .verbose_with(verbose, || verbose_text),
            );
        }
        Ok(output)
    }
}
