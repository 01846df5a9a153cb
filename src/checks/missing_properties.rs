//! Devices lacking essential identification and connectivity properties.

use super::{Analyzer, AnalyzerOutput, DeviceFacts, is_excluded};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{Finding, FindingDetails, IssueType, Severity};
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};

const ESSENTIAL: [&str; 7] = [
    prop::DEVICE_INSTANCE,
    prop::ADDRESS,
    prop::VENDOR_ID,
    prop::MODEL_NAME,
    prop::DEVICE_NAME,
    prop::FIRMWARE_REVISION,
    prop::DEVICE_ON_NETWORK,
];

const CRITICAL: [&str; 3] = [prop::DEVICE_INSTANCE, prop::ADDRESS, prop::VENDOR_ID];

pub struct MissingProperties;

fn severity_for(missing_count: usize, missing_critical: usize) -> Option<Severity> {
    match (missing_critical, missing_count) {
        (0, 0) => None,
        (1.., _) => Some(Severity::Critical),
        (0, 4..) => Some(Severity::Major),
        (0, 2..) => Some(Severity::Warning),
        (0, _) => Some(Severity::Info),
    }
}

impl Analyzer for MissingProperties {
    fn key(&self) -> &str {
        "missing-properties"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::MissingProperties]
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

            let mut present = Vec::new();
            let mut missing = Vec::new();
            for property in ESSENTIAL {
                if graph.has(&device, property)? {
                    present.push(property.to_string());
                } else {
                    missing.push(property.to_string());
                }
            }
            let missing_critical: Vec<String> = missing
                .iter()
                .filter(|p| CRITICAL.contains(&p.as_str()))
                .cloned()
                .collect();
            let Some(severity) = severity_for(missing.len(), missing_critical.len()) else {
                continue;
            };

            let label = facts.label.clone().unwrap_or_else(|| device.clone());
            let instance = facts.instance_or("unknown");
            let missing_count = missing.len();
            let total = ESSENTIAL.len();

            let verbose_text = if verbose {
                let property_count = graph.describe(&device)?.len();
                let mut text = format!(
                    "Device {label} (URI: {device}) has {property_count} total properties but is \
                     missing {missing_count} essential BACnet properties: {}. Present essential \
                     properties: {}.",
                    missing.join(", "),
                    if present.is_empty() {
                        "none".to_string()
                    } else {
                        present.join(", ")
                    }
                );
                if !missing_critical.is_empty() {
                    text.push_str(&format!(
                        " Critical missing properties: {}",
                        missing_critical.join(", ")
                    ));
                }
                Some(text)
            } else {
                None
            };

            let mut finding = Finding::new(
                IssueType::MissingProperties,
                severity,
                format!(
                    "Device {label} (instance {instance}) is missing {missing_count}/{total} essential properties"
                ),
                FindingDetails::MissingProperties {
                    device: device.clone(),
                    label,
                    device_instance: instance,
                    missing_properties: missing,
                    missing_critical,
                    missing_count,
                    total_properties: total,
                },
            )
            .affecting([device]);
            finding.verbose_description = verbose_text;
            output.push(finding);
        }
        Ok(output)
    }
}
