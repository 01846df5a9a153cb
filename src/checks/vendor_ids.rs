//! Missing or malformed `vendor-id` values.

use super::{Analyzer, AnalyzerOutput, DeviceFacts, is_excluded};
use crate::addressing::{IntegerLiteral, classify_integer};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, IssueType, Severity, VendorProblem};
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};

pub struct MissingVendorIds;

/// Strips a `scheme://vendor/N` reference down to `N`.
fn vendor_number(raw: &str) -> &str {
    if raw.contains("://") {
        raw.rsplit('/').next().unwrap_or(raw)
    } else {
        raw
    }
}

fn classify(vendor_id: Option<&str>) -> Option<VendorProblem> {
    let Some(raw) = vendor_id.filter(|v| !v.is_empty()) else {
        return Some(VendorProblem::Missing);
    };
    match classify_integer(vendor_number(raw)) {
        IntegerLiteral::NotNumeric => Some(VendorProblem::InvalidFormat),
        IntegerLiteral::Value(v) if v < 0 => Some(VendorProblem::Negative),
        IntegerLiteral::Overflow { negative: true } => Some(VendorProblem::Negative),
        IntegerLiteral::Value(0) => Some(VendorProblem::Reserved),
        IntegerLiteral::Value(_) | IntegerLiteral::Overflow { negative: false } => None,
    }
}

impl Analyzer for MissingVendorIds {
    fn key(&self) -> &str {
        "missing-vendor-ids"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::MissingVendorIds]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut output = AnalyzerOutput::new();

        for device in graph.instances_of(class::DEVICE)? {
            let facts = DeviceFacts::read(graph, &device)?;
            if is_excluded(&device, facts.label.as_deref(), &config.excluded_marker) {
                continue;
            }
            let vendor_id = graph.first(&device, prop::VENDOR_ID)?;
            let Some(problem) = classify(vendor_id.as_deref()) else {
                continue;
            };

            let label = facts.display_label();
            let instance = facts.instance_or("Unknown");
            let address = facts.address_or("Unknown");
            let shown = vendor_id.as_deref().map(vendor_number).unwrap_or_default();
            let subject = format!("Device {label} (instance {instance})");

            let (description, explanation) = match problem {
                VendorProblem::Missing => (
                    format!("{subject} is missing vendor-id property"),
                    "does not have a vendor-id property. BACnet devices should include vendor \
                     identification to assist with device management, troubleshooting, and \
                     interoperability. Vendor IDs should be numeric values registered with ASHRAE."
                        .to_string(),
                ),
                VendorProblem::InvalidFormat => (
                    format!("{subject} has invalid vendor-id format: \"{shown}\" (must be numeric)"),
                    format!(
                        "has a non-numeric vendor-id \"{shown}\". BACnet vendor IDs must be positive \
                         integers registered with ASHRAE. String values are not valid vendor identifiers."
                    ),
                ),
                VendorProblem::Negative => (
                    format!("{subject} has invalid vendor-id: {shown} (must be positive)"),
                    format!(
                        "has an invalid vendor-id value \"{shown}\". BACnet vendor IDs must be positive \
                         integers registered with ASHRAE. Negative values are not valid vendor identifiers."
                    ),
                ),
                VendorProblem::Reserved => (
                    format!("{subject} has invalid vendor-id: 0 (reserved value)"),
                    "has vendor-id \"0\" which is a reserved value. BACnet vendor IDs should be \
                     positive integers registered with ASHRAE. Vendor ID 0 is not assigned to any \
                     manufacturer."
                        .to_string(),
                ),
            };

            output.push(
                Finding::new(
                    IssueType::MissingVendorIds,
                    Severity::Medium,
                    description,
                    FindingDetails::VendorId {
                        device: device.clone(),
                        label,
                        device_instance: instance,
                        address: address.clone(),
                        vendor_id: vendor_id.clone(),
                        problem,
                    },
                )
                .affecting([device])
                .verbose_with(verbose, || format!("{subject} at address {address} {explanation}")),
            );
        }
        Ok(output)
    }
}
