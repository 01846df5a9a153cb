//! BACnet vocabulary used by the analyzers.
//!
//! Class and predicate local names are fixed; the namespace they live in is
//! injected through [`Vocabulary`] so test graphs can use alternate namespaces.

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "http://data.ashrae.org/bacnet/2020#";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

/// Class local names.
pub mod class {
    pub const DEVICE: &str = "Device";
    pub const ROUTER: &str = "Router";
    pub const BBMD: &str = "BBMD";
    pub const NETWORK: &str = "BACnetNetwork";
    pub const SUBNET: &str = "Subnet";
}

/// Predicate local names.
pub mod prop {
    pub const DEVICE_INSTANCE: &str = "device-instance";
    pub const ADDRESS: &str = "address";
    pub const VENDOR_ID: &str = "vendor-id";
    pub const MODEL_NAME: &str = "model-name";
    pub const DEVICE_NAME: &str = "device-name";
    pub const FIRMWARE_REVISION: &str = "firmware-revision";
    pub const DEVICE_ON_NETWORK: &str = "device-on-network";
    pub const DEVICE_ON_SUBNET: &str = "device-on-subnet";
    pub const SUBNET_OF_NETWORK: &str = "subnet-of-network";
    pub const SERVES_NETWORK: &str = "serves-network";
    pub const BBMD_BROADCAST_DOMAIN: &str = "bbmd-broadcast-domain";
    pub const BBMD_ON_SUBNET: &str = "bbmd-on-subnet";
    pub const BDT_ENTRY: &str = "bdt-entry";
    pub const NETWORK_NUMBER: &str = "network-number";
    pub const NETWORK_TYPE: &str = "network-type";
    pub const SUBNET_ADDRESS: &str = "subnet-address";
}

/// Namespace configuration for BACnet terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub namespace: String,
    pub rdf_type: String,
    pub rdfs_label: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }
}

impl Vocabulary {
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            rdf_type: RDF_TYPE.to_string(),
            rdfs_label: RDFS_LABEL.to_string(),
        }
    }

    /// Full IRI for a local name in the BACnet namespace.
    pub fn iri(&self, local: &str) -> String {
        format!("{}{}", self.namespace, local)
    }

    /// Strips the BACnet namespace from an IRI, if present.
    pub fn local_name<'a>(&self, iri: &'a str) -> Option<&'a str> {
        iri.strip_prefix(self.namespace.as_str())
    }
}
