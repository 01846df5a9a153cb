//! Configuration files feeding the registry.

mod support;

use bacnet_graph_checks::config::Thresholds;
use bacnet_graph_checks::{CheckConfig, GraphStore, IssueRegistry, IssueType};
use std::io::Write;

fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn custom_namespace_drives_class_lookup() {
    let file = write_config(
        ".yaml",
        "vocabulary:\n  namespace: \"urn:site:bacnet#\"\n",
    );
    let config = CheckConfig::from_file(file.path()).unwrap();
    let registry = IssueRegistry::with_default_analyzers(config);

    let store = GraphStore::from_turtle(
        r#"
        @prefix site: <urn:site:bacnet#> .
        <urn:site:dev:1> a site:Device ; site:device-instance "9999999" .
        "#,
    )
    .unwrap();

    let report = registry.run("invalid-device-ranges", &store, false).unwrap();
    assert_eq!(report.findings_for(IssueType::InvalidDeviceRanges).len(), 1);

    let default_report = support::registry()
        .run("invalid-device-ranges", &store, false)
        .unwrap();
    assert!(!default_report.has_findings());
}

#[test]
fn tighter_thresholds_raise_findings_earlier() {
    let file = write_config(
        ".json",
        r#"{"network_thresholds": {"ip": {"warning": 3, "critical": 6}}}"#,
    );
    let config = CheckConfig::from_file(file.path()).unwrap();
    assert_eq!(config.network_thresholds.ip, Thresholds::new(3, 6));

    let mut ttl = String::from(
        r#"<bacnet://network/ip> a bacnet:BACnetNetwork ; bacnet:network-type "IP" ."#,
    );
    for i in 0..4 {
        ttl.push_str(&format!(
            "\n<bacnet://device/{i}> a bacnet:Device ; bacnet:device-on-network <bacnet://network/ip> ."
        ));
    }
    let store = support::store(&ttl);

    let report = IssueRegistry::with_default_analyzers(config)
        .run("oversized-networks-warning", &store, false)
        .unwrap();
    assert_eq!(
        report.findings_for(IssueType::OversizedNetworksWarning).len(),
        1
    );
}

#[test]
fn inverted_thresholds_are_rejected() {
    let file = write_config(
        ".yaml",
        "broadcast:\n  subnets:\n    warning: 10\n    critical: 5\n",
    );
    let err = CheckConfig::from_file(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("broadcast.subnets"));
}

#[test]
fn unsupported_extension_is_an_error() {
    let file = write_config(".toml", "max_loop_depth = 3\n");
    let err = CheckConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("unsupported config extension"));
}
