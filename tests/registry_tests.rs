//! Registry resolution, deduplicated execution and failure isolation.

mod support;

use assert_matches::assert_matches;
use bacnet_graph_checks::error::CheckError;
use bacnet_graph_checks::finding::{FindingDetails, Isolation, RouterSubnets};
use bacnet_graph_checks::metrics::{STATUS_ERROR, STATUS_SUCCESS};
use bacnet_graph_checks::{
    Analyzer, AnalyzerOutput, BacnetGraph, CheckConfig, CheckMetrics, Finding, GraphStore,
    IssueRegistry, IssueType, Result, Severity, Triple, TripleSource,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use support::{registry, store};

/// Emits one finding per network-number issue type and counts its invocations.
struct CountingAnalyzer {
    calls: Arc<AtomicUsize>,
}

impl Analyzer for CountingAnalyzer {
    fn key(&self) -> &str {
        "counting"
    }

    fn issue_types(&self) -> &[IssueType] {
        &[IssueType::DuplicateNetwork, IssueType::DuplicateRouter]
    }

    fn analyze(
        &self,
        _graph: &BacnetGraph<'_>,
        _config: &CheckConfig,
        _verbose: bool,
    ) -> Result<AnalyzerOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let details = |network: &str| FindingDetails::DuplicateNetwork {
            network: network.to_string(),
            router_count: 2,
            routers: vec![RouterSubnets {
                router: "urn:router:1".to_string(),
                subnets: vec![],
            }],
        };
        let mut output = AnalyzerOutput::new();
        output.push(
            Finding::new(
                IssueType::DuplicateNetwork,
                Severity::Warning,
                "network collision",
                details("urn:network:1"),
            )
            .affecting(["urn:router:1"]),
        );
        output.push(
            Finding::new(
                IssueType::DuplicateRouter,
                Severity::Error,
                "router collision",
                details("urn:network:2"),
            )
            .affecting(["urn:router:2"]),
        );
        Ok(output)
    }
}

/// Delegates to a `GraphStore` but fails every lookup of BBMD instances.
struct FailingBbmdLookups {
    inner: GraphStore,
}

impl TripleSource for FailingBbmdLookups {
    fn match_pattern(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
        object: Option<&str>,
    ) -> Result<Vec<Triple>> {
        if object == Some("http://data.ashrae.org/bacnet/2020#BBMD") {
            return Err(CheckError::store("index for BBMD class is corrupt"));
        }
        self.inner.match_pattern(subject, predicate, object)
    }
}

#[test]
fn shared_analyzer_runs_once_for_sibling_types() {
    let calls = Arc::new(AtomicUsize::new(0));
    let metrics = Arc::new(CheckMetrics::new());
    let mut registry = IssueRegistry::new(CheckConfig::default()).with_metrics(metrics.clone());
    registry.register(Arc::new(CountingAnalyzer {
        calls: calls.clone(),
    }));

    let report = registry
        .run("duplicate-network", &GraphStore::new(), false)
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.executed, ["counting"]);
    assert_eq!(report.findings_for(IssueType::DuplicateNetwork).len(), 1);
    assert_eq!(report.findings_for(IssueType::DuplicateRouter).len(), 1);
    assert_eq!(
        report.findings_for(IssueType::DuplicateRouter)[0].description(),
        "router collision"
    );
    assert!(report.affected_entities.contains("urn:router:1"));
    assert!(report.affected_entities.contains("urn:router:2"));
    assert_eq!(metrics.runs("counting", STATUS_SUCCESS), 1);
    assert_eq!(metrics.findings("duplicate-router"), 1);
}

#[test]
fn repeated_issue_types_do_not_rerun_the_analyzer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = IssueRegistry::new(CheckConfig::default());
    registry.register(Arc::new(CountingAnalyzer {
        calls: calls.clone(),
    }));

    let issues = [
        IssueType::DuplicateRouter,
        IssueType::DuplicateNetwork,
        IssueType::DuplicateRouter,
        IssueType::OrphanedDevices,
    ];
    let report = registry.execute_checks(&issues, &GraphStore::new(), false);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.total_findings(), 2);
    assert!(!report.findings.contains_key(&IssueType::OrphanedDevices));
}

#[test]
fn unknown_selector_is_rejected() {
    let registry = registry();
    assert_matches!(
        registry.run("duplicate-everything", &GraphStore::new(), false),
        Err(CheckError::UnknownIssueType(selector)) if selector == "duplicate-everything"
    );
}

#[test]
fn duplicate_device_ids_across_networks() {
    let store = store(
        r#"
        <bacnet://device/a> a bacnet:Device ;
            rdfs:label "AHU-1" ;
            bacnet:device-instance "123" ;
            bacnet:device-on-network <bacnet://network/19103> .
        <bacnet://device/b> a bacnet:Device ;
            rdfs:label "AHU-2" ;
            bacnet:device-instance "123" ;
            bacnet:device-on-network <bacnet://network/9103> .
        <bacnet://device/c> a bacnet:Device ;
            rdfs:label "VAV-7" ;
            bacnet:device-instance "789" ;
            bacnet:device-on-network <bacnet://network/9103> .
        "#,
    );

    let report = registry().run("all", &store, true).unwrap();
    assert!(report.failures.is_empty());
    assert!(report.has_findings());
    assert!(report.total_findings() > 0);

    let duplicates = report.findings_for(IssueType::DuplicateDeviceId);
    assert_eq!(duplicates.len(), 1);
    let finding = &duplicates[0];
    assert_eq!(finding.severity(), Severity::Critical);
    assert_eq!(
        finding.affected_entities(),
        ["bacnet://device/a", "bacnet://device/b"]
    );
    assert!(!finding.affected_entities().contains(&"bacnet://device/c".to_string()));
    assert!(finding.verbose_description.is_some());

    let triples = report.affected_triples(&store).unwrap();
    assert!(triples.iter().any(|t| t.subject == "bacnet://device/a"));
}

#[test]
fn single_selector_only_fills_its_bucket() {
    let store = store(
        r#"
        <bacnet://device/a> a bacnet:Device ; bacnet:device-instance "4194304" .
        "#,
    );
    let report = registry().run("invalid-device-ranges", &store, false).unwrap();
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings_for(IssueType::InvalidDeviceRanges).len(), 1);
    assert_eq!(report.executed, ["invalid-device-ranges"]);
}

#[test]
fn isolated_network_is_reported() {
    let store = store(
        r#"
        <bacnet://network/1> a bacnet:BACnetNetwork ; bacnet:network-number "1" .
        <bacnet://network/2> a bacnet:BACnetNetwork ; bacnet:network-number "2" .
        <bacnet://network/3> a bacnet:BACnetNetwork ; bacnet:network-number "3" .
        <bacnet://router/1> a bacnet:Router ;
            bacnet:device-on-network <bacnet://network/1> ;
            bacnet:serves-network <bacnet://network/2> .
        <bacnet://device/1> a bacnet:Device ; bacnet:device-on-network <bacnet://network/1> .
        <bacnet://device/2> a bacnet:Device ; bacnet:device-on-network <bacnet://network/2> .
        <bacnet://device/3> a bacnet:Device ; bacnet:device-on-network <bacnet://network/3> .
        "#,
    );

    let registry = registry();
    let routers = registry.run("missing-routers", &store, false).unwrap();
    let missing = routers.findings_for(IssueType::MissingRouters);
    assert_eq!(missing.len(), 1);
    assert_matches!(
        &missing[0].details,
        FindingDetails::MissingRouters { isolated_networks, .. }
            if isolated_networks.len() == 1 && isolated_networks[0].network == "bacnet://network/3"
    );

    let report = registry.run("unreachable-networks", &store, false).unwrap();
    let findings = report.findings_for(IssueType::UnreachableNetworks);
    let isolated: Vec<_> = findings
        .iter()
        .filter(|f| {
            matches!(
                f.details,
                FindingDetails::UnreachableNetwork {
                    isolation: Isolation::Isolated,
                    ..
                }
            )
        })
        .collect();
    assert_eq!(isolated.len(), 1);
    assert_eq!(isolated[0].affected_entities(), ["bacnet://network/3"]);
    assert_eq!(
        isolated[0].description(),
        "Network Network 3 is completely isolated with no routing connections"
    );

    assert_eq!(findings.len(), 3);
    let partial: Vec<_> = findings
        .iter()
        .filter(|f| {
            matches!(
                f.details,
                FindingDetails::UnreachableNetwork {
                    isolation: Isolation::Partial,
                    ..
                }
            )
        })
        .collect();
    assert_eq!(partial.len(), 2);
    for (finding, number) in partial.iter().zip(["1", "2"]) {
        let uri = format!("bacnet://network/{number}");
        assert_eq!(finding.severity(), Severity::High);
        assert_eq!(finding.affected_entities(), [uri.clone()]);
        assert_eq!(
            finding.description(),
            format!("Network Network {number} cannot reach 1 other networks")
        );
        assert_matches!(
            &finding.details,
            FindingDetails::UnreachableNetwork {
                network,
                total_networks: 3,
                reachable_networks: 1,
                network_islands: 2,
                island_networks,
                ..
            } if *network == uri
                && island_networks == &["bacnet://network/1", "bacnet://network/2"]
        );
    }
}

#[test]
fn failing_analyzer_does_not_abort_siblings() {
    let inner = store(
        r#"
        <bacnet://device/a> a bacnet:Device ;
            bacnet:device-instance "123" ;
            bacnet:device-on-network <bacnet://network/1> .
        <bacnet://device/b> a bacnet:Device ;
            bacnet:device-instance "123" ;
            bacnet:device-on-network <bacnet://network/2> .
        <bacnet://bbmd/1> a bacnet:BBMD ;
            bacnet:bbmd-broadcast-domain <bacnet://subnet/a> ;
            bacnet:bdt-entry "10.0.1.1" .
        <bacnet://bbmd/2> a bacnet:BBMD ;
            bacnet:bbmd-broadcast-domain <bacnet://subnet/a> ;
            bacnet:bdt-entry "10.0.2.1" .
        "#,
    );
    let source = FailingBbmdLookups { inner };
    let metrics = Arc::new(CheckMetrics::new());
    let registry =
        IssueRegistry::with_default_analyzers(CheckConfig::default()).with_metrics(metrics.clone());

    let report = registry.run("all", &source, false).unwrap();

    let failure = report
        .failures
        .iter()
        .find(|f| f.analyzer == "duplicate-bbmds")
        .expect("duplicate-bbmds failure recorded");
    assert_eq!(failure.error_type, "store_error");
    assert!(failure.error.contains("index for BBMD class is corrupt"));
    assert!(report.findings_for(IssueType::DuplicateBbmdError).is_empty());
    assert!(report.findings_for(IssueType::DuplicateBbmdWarning).is_empty());
    for failure in &report.failures {
        for issue_type in &failure.issue_types {
            assert!(report.findings_for(*issue_type).is_empty());
        }
    }

    assert_eq!(report.findings_for(IssueType::DuplicateDeviceId).len(), 1);
    assert_eq!(report.executed.len(), 15);
    assert_eq!(metrics.runs("duplicate-bbmds", STATUS_ERROR), 1);
    assert_eq!(metrics.runs("duplicate-device-ids", STATUS_SUCCESS), 1);
}

#[test]
fn report_serializes_buckets_by_issue_name() {
    let store = store(
        r#"
        <bacnet://device/x> a bacnet:Device ; bacnet:device-instance "7" ; rdfs:label "Lonely" .
        "#,
    );
    let report = registry().run("orphaned-devices", &store, false).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    let bucket = json["findings"]["orphaned-devices"].as_array().unwrap();
    assert_eq!(bucket.len(), 1);
    assert_eq!(bucket[0]["severity"], "critical");
    assert!(json.get("failures").is_none());
    assert_eq!(
        report.severity_counts().get(&Severity::Critical).copied(),
        Some(1)
    );
}

#[test]
fn well_formed_building_is_clean_for_identity_checks() {
    let store = store(&support::building(3, 5));
    let registry = registry();
    for selector in [
        "duplicate-device-id",
        "device-address-conflicts",
        "invalid-device-ranges",
        "missing-vendor-ids",
        "orphaned-devices",
        "network-loops",
    ] {
        let report = registry.run(selector, &store, false).unwrap();
        assert!(!report.has_findings(), "{selector}: {:?}", report.findings);
    }
}
