#![allow(dead_code)]

use bacnet_graph_checks::{CheckConfig, CheckMetrics, GraphStore, IssueRegistry};
use std::sync::Arc;

pub const PREFIXES: &str = r#"
@prefix bacnet: <http://data.ashrae.org/bacnet/2020#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
"#;

/// Parses a Turtle body with the `bacnet:` and `rdfs:` prefixes declared.
pub fn store(body: &str) -> GraphStore {
    GraphStore::from_turtle(&format!("{PREFIXES}\n{body}")).expect("valid turtle")
}

/// Default registry with private metrics so counts do not leak between tests.
pub fn registry() -> IssueRegistry {
    IssueRegistry::with_default_analyzers(CheckConfig::default())
        .with_metrics(Arc::new(CheckMetrics::new()))
}

/// A building with `floors` MS/TP trunks hanging off one IP backbone.
pub fn building(floors: usize, devices_per_floor: usize) -> String {
    let mut ttl = String::from(
        r#"
        <bacnet://network/backbone> a bacnet:BACnetNetwork ;
            rdfs:label "IP backbone" ;
            bacnet:network-number "1" ;
            bacnet:network-type "IP" .
        <bacnet://subnet/backbone> a bacnet:Subnet ;
            bacnet:subnet-address "10.0.0.0/24" ;
            bacnet:subnet-of-network <bacnet://network/backbone> .
        "#,
    );
    for floor in 0..floors {
        let network = format!("bacnet://network/floor{floor}");
        ttl.push_str(&format!(
            r#"
            <{network}> a bacnet:BACnetNetwork ;
                bacnet:network-number "{number}" ;
                bacnet:network-type "MSTP" .
            <bacnet://router/floor{floor}> a bacnet:Router ;
                rdfs:label "Floor {floor} router" ;
                bacnet:device-instance "{router_instance}" ;
                bacnet:address "10.0.0.{host}" ;
                bacnet:device-on-network <bacnet://network/backbone> ;
                bacnet:device-on-subnet <bacnet://subnet/backbone> ;
                bacnet:serves-network <{network}> .
            "#,
            number = 100 + floor,
            router_instance = 9000 + floor,
            host = floor + 10,
        ));
        for device in 0..devices_per_floor {
            ttl.push_str(&format!(
                r#"
                <bacnet://device/{floor}-{device}> a bacnet:Device ;
                    rdfs:label "VAV-{floor}-{device}" ;
                    bacnet:device-instance "{instance}" ;
                    bacnet:address "{mac}" ;
                    bacnet:vendor-id "5" ;
                    bacnet:model-name "VAV controller" ;
                    bacnet:device-name "VAV-{floor}-{device}" ;
                    bacnet:firmware-revision "1.0" ;
                    bacnet:device-on-network <{network}> .
                "#,
                instance = floor * 1000 + device + 1,
                mac = device + 1,
            ));
        }
    }
    ttl
}
