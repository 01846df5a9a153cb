//! Property-based tests over generated network graphs.
//!
//! - Running the full catalog twice over the same graph yields identical reports
//! - Every finding lands in the bucket of its own issue type
//! - The device-instance range check agrees with the numeric range

mod support;

use bacnet_graph_checks::IssueType;
use proptest::prelude::*;
use support::{registry, store};

#[derive(Debug, Clone)]
struct GeneratedDevice {
    instance: u32,
    network: u8,
    address: u8,
    with_vendor: bool,
}

#[derive(Debug, Clone)]
struct GeneratedRouter {
    on: u8,
    serves: u8,
}

fn arb_device() -> impl Strategy<Value = GeneratedDevice> {
    (0u32..6, 0u8..4, 0u8..4, any::<bool>()).prop_map(|(instance, network, address, with_vendor)| {
        GeneratedDevice {
            instance,
            network,
            address,
            with_vendor,
        }
    })
}

fn arb_router() -> impl Strategy<Value = GeneratedRouter> {
    (0u8..4, 0u8..4).prop_map(|(on, serves)| GeneratedRouter { on, serves })
}

fn render(devices: &[GeneratedDevice], routers: &[GeneratedRouter]) -> String {
    let mut ttl = String::new();
    for n in 0..4 {
        ttl.push_str(&format!(
            "<bacnet://network/{n}> a bacnet:BACnetNetwork ; bacnet:network-number \"{n}\" .\n"
        ));
    }
    for (i, device) in devices.iter().enumerate() {
        let vendor = if device.with_vendor {
            " ; bacnet:vendor-id \"8\""
        } else {
            ""
        };
        ttl.push_str(&format!(
            "<bacnet://device/{i}> a bacnet:Device ; bacnet:device-instance \"{}\" ; \
             bacnet:address \"{}\" ; bacnet:device-on-network <bacnet://network/{}>{vendor} .\n",
            device.instance, device.address, device.network
        ));
    }
    for (i, router) in routers.iter().enumerate() {
        ttl.push_str(&format!(
            "<bacnet://router/{i}> a bacnet:Router ; bacnet:device-on-network <bacnet://network/{}> ; \
             bacnet:serves-network <bacnet://network/{}> .\n",
            router.on, router.serves
        ));
    }
    ttl
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn full_run_is_deterministic(
        devices in prop::collection::vec(arb_device(), 0..12),
        routers in prop::collection::vec(arb_router(), 0..6),
        verbose in any::<bool>(),
    ) {
        let store = store(&render(&devices, &routers));
        let registry = registry();

        let first = registry.run("all", &store, verbose).unwrap();
        let second = registry.run("all", &store, verbose).unwrap();

        prop_assert!(first.failures.is_empty());
        prop_assert_eq!(&first, &second);
        for (issue_type, findings) in &first.findings {
            for finding in findings {
                prop_assert_eq!(finding.issue_type, *issue_type);
                prop_assert_eq!(finding.verbose_description.is_some(), verbose);
                for entity in finding.affected_entities() {
                    prop_assert!(first.affected_entities.contains(entity));
                }
            }
        }
    }

    #[test]
    fn instance_range_matches_numeric_range(instance in -10_000_000i64..10_000_000) {
        let body = format!(
            "<bacnet://device/x> a bacnet:Device ; bacnet:device-instance \"{instance}\" ."
        );
        let report = registry()
            .run("invalid-device-ranges", &store(&body), false)
            .unwrap();
        let flagged = !report.findings_for(IssueType::InvalidDeviceRanges).is_empty();
        prop_assert_eq!(flagged, !(0..=4_194_303).contains(&instance));
    }
}
