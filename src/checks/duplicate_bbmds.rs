//! Multiple BBMDs managing the same broadcast domain.

use super::{Analyzer, AnalyzerOutput};
use crate::config::CheckConfig;
use crate::error::Result;
use crate::finding::{BbmdEntry, Finding, FindingDetails, IssueType, Severity};
use crate::graph::BacnetGraph;
use crate::vocab::{class, prop};
use std::collections::BTreeMap;

pub struct DuplicateBbmds;

impl Analyzer for DuplicateBbmds {
    fn key(&self) -> &str {
        "duplicate-bbmds"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::DuplicateBbmdWarning, IssueType::DuplicateBbmdError]
    }

    fn analyze(
        &self,
        graph: &BacnetGraph<'_>,
        _config: &CheckConfig,
        verbose: bool,
    ) -> Result<AnalyzerOutput> {
        let mut by_subnet: BTreeMap<String, Vec<BbmdEntry>> = BTreeMap::new();
        for bbmd in graph.instances_of(class::BBMD)? {
            let bdt_entries = graph.objects(&bbmd, prop::BDT_ENTRY)?;
            for subnet in graph.objects(&bbmd, prop::BBMD_BROADCAST_DOMAIN)? {
                by_subnet.entry(subnet).or_default().push(BbmdEntry {
                    bbmd: bbmd.clone(),
                    has_bdt: !bdt_entries.is_empty(),
                    bdt_entries: bdt_entries.clone(),
                });
            }
        }

        let mut output = AnalyzerOutput::new();
        for (subnet, bbmds) in by_subnet {
            if bbmds.len() < 2 {
                continue;
            }
            let with_bdt = bbmds.iter().filter(|b| b.has_bdt).count();
            let (issue_type, severity, description) = if with_bdt >= 2 {
                (
                    IssueType::DuplicateBbmdError,
                    Severity::Error,
                    "Multiple BBMDs with BDT entries on the same subnet",
                )
            } else {
                (
                    IssueType::DuplicateBbmdWarning,
                    Severity::Warning,
                    "Multiple BBMDs on the same subnet",
                )
            };

            let uris: Vec<String> = bbmds.iter().map(|b| b.bbmd.clone()).collect();
            let bbmd_count = bbmds.len();
            output.push(
                Finding::new(
                    issue_type,
                    severity,
                    description,
                    FindingDetails::DuplicateBbmd {
                        subnet: subnet.clone(),
                        bbmd_count,
                        bbmds_with_bdt_count: with_bdt,
                        bbmds,
                    },
                )
                .verbose_with(verbose, || {
                    format!(
                        "Broadcast domain {subnet} has {bbmd_count} BBMDs ({}), {with_bdt} of them \
                         with BDT entries. Only one BBMD per subnet should forward broadcasts.",
                        uris.join(", ")
                    )
                })
                .affecting(uris.iter().cloned()),
            );
        }
        Ok(output)
    }
}
