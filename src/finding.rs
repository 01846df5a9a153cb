//! Shared shape of analyzer output.
//!
//! Every analyzer produces [`Finding`] values: an [`IssueType`], a
//! [`Severity`], a one-line description, an optional verbose description, the
//! issue-specific [`FindingDetails`] payload and the entity URIs the finding
//! refers to. Presentation layers switch on `FindingDetails` for
//! type-specific rendering.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Finding severity, ordered from least to most severe.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Medium,
    Major,
    High,
    Error,
    Critical,
}

/// Category tag used to group issue types in the catalog.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IssueCategory {
    DeviceConflicts,
    DeviceValidation,
    Connectivity,
    NetworkTopology,
    BbmdConfiguration,
    Performance,
}

/// Every issue-type identifier the analyzers can report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IssueType {
    DuplicateDeviceId,
    OrphanedDevices,
    InvalidDeviceRanges,
    DeviceAddressConflicts,
    MissingVendorIds,
    MissingProperties,
    UnreachableNetworks,
    MissingRouters,
    SubnetMismatches,
    NetworkLoops,
    DuplicateNetwork,
    DuplicateRouter,
    DuplicateBbmdWarning,
    DuplicateBbmdError,
    OversizedNetworksWarning,
    OversizedNetworksCritical,
    BroadcastDomainWarning,
    BroadcastDomainCritical,
    MissingBbmdCoverage,
    BroadcastDomainOverlap,
    RoutingLoop,
    SuboptimalRoutingPath,
    RouterSinglePointFailure,
    AsymmetricRouting,
    MissingRedundancy,
}

impl IssueType {
    pub fn all() -> impl Iterator<Item = IssueType> {
        IssueType::iter()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn description(&self) -> &'static str {
        match self {
            IssueType::DuplicateDeviceId => {
                "Detect devices with same ID across different networks/subnets"
            }
            IssueType::OrphanedDevices => "Detect devices not connected to any network or subnet",
            IssueType::InvalidDeviceRanges => {
                "Detect devices with instance IDs outside valid BACnet range (0-4194303)"
            }
            IssueType::DeviceAddressConflicts => {
                "Detect devices with same address on same network/subnet"
            }
            IssueType::MissingVendorIds => {
                "Detect devices without vendor identification or invalid vendor formats"
            }
            IssueType::MissingProperties => {
                "Detect devices missing essential identification and connectivity properties"
            }
            IssueType::UnreachableNetworks => {
                "Detect networks isolated without routing paths to other networks"
            }
            IssueType::MissingRouters => {
                "Detect multi-network setups without proper routing infrastructure"
            }
            IssueType::SubnetMismatches => {
                "Detect devices whose IP address falls outside their assigned subnet"
            }
            IssueType::NetworkLoops => {
                "Detect circular routing paths that can cause broadcast storms"
            }
            IssueType::DuplicateNetwork => "Detect network numbers on routers in different subnets",
            IssueType::DuplicateRouter => {
                "Detect network numbers on multiple routers in same subnet"
            }
            IssueType::DuplicateBbmdWarning => {
                "Detect multiple BBMDs on same subnet (not all have BDT entries)"
            }
            IssueType::DuplicateBbmdError => "Detect multiple BBMDs with BDT entries on same subnet",
            IssueType::OversizedNetworksWarning => {
                "Detect networks approaching their type-specific device capacity"
            }
            IssueType::OversizedNetworksCritical => {
                "Detect networks exceeding their type-specific device capacity"
            }
            IssueType::BroadcastDomainWarning => {
                "Detect large broadcast domains that may impact performance"
            }
            IssueType::BroadcastDomainCritical => {
                "Detect broadcast domains large enough to cause congestion"
            }
            IssueType::MissingBbmdCoverage => {
                "Detect complex broadcast domains without BBMD coverage"
            }
            IssueType::BroadcastDomainOverlap => {
                "Detect networks whose broadcast domains share an IP range"
            }
            IssueType::RoutingLoop => "Detect cycles in the router connectivity graph",
            IssueType::SuboptimalRoutingPath => {
                "Detect routing paths longer than the recommended hop count"
            }
            IssueType::RouterSinglePointFailure => {
                "Detect networks that depend on a single router for connectivity"
            }
            IssueType::AsymmetricRouting => {
                "Detect one-directional routing between networks"
            }
            IssueType::MissingRedundancy => {
                "Detect networks whose loss would disconnect the routing topology"
            }
        }
    }

    pub fn category(&self) -> IssueCategory {
        match self {
            IssueType::DuplicateDeviceId | IssueType::DeviceAddressConflicts => {
                IssueCategory::DeviceConflicts
            }
            IssueType::InvalidDeviceRanges
            | IssueType::MissingVendorIds
            | IssueType::MissingProperties => IssueCategory::DeviceValidation,
            IssueType::OrphanedDevices | IssueType::SubnetMismatches => {
                IssueCategory::Connectivity
            }
            IssueType::UnreachableNetworks
            | IssueType::MissingRouters
            | IssueType::NetworkLoops
            | IssueType::DuplicateNetwork
            | IssueType::DuplicateRouter => IssueCategory::NetworkTopology,
            IssueType::DuplicateBbmdWarning | IssueType::DuplicateBbmdError => {
                IssueCategory::BbmdConfiguration
            }
            IssueType::OversizedNetworksWarning
            | IssueType::OversizedNetworksCritical
            | IssueType::BroadcastDomainWarning
            | IssueType::BroadcastDomainCritical
            | IssueType::MissingBbmdCoverage
            | IssueType::BroadcastDomainOverlap
            | IssueType::RoutingLoop
            | IssueType::SuboptimalRoutingPath
            | IssueType::RouterSinglePointFailure
            | IssueType::AsymmetricRouting
            | IssueType::MissingRedundancy => IssueCategory::Performance,
        }
    }
}

/// Physical network kind used to pick device-count thresholds.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NetworkKind {
    Mstp,
    Ip,
    Ethernet,
    Arcnet,
    Ptp,
    Other,
}

/// How many inferred IP ranges a broadcast domain spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BroadcastScope {
    Local,
    Subnet,
    Moderate,
    Wide,
}

impl BroadcastScope {
    pub fn from_range_count(ranges: usize) -> Self {
        match ranges {
            0 => BroadcastScope::Local,
            1 => BroadcastScope::Subnet,
            2..=3 => BroadcastScope::Moderate,
            _ => BroadcastScope::Wide,
        }
    }

    pub fn spans_multiple_ranges(&self) -> bool {
        matches!(self, BroadcastScope::Moderate | BroadcastScope::Wide)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MembershipScope {
    Network,
    Subnet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMembership {
    pub device: String,
    pub network: String,
    pub network_type: MembershipScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    pub device: String,
    pub label: String,
    pub device_instance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRef {
    pub network: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSubnets {
    pub router: String,
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BbmdEntry {
    pub bbmd: String,
    pub has_bdt: bool,
    pub bdt_entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRouter {
    pub router_uri: String,
    pub router_name: String,
    pub connects_from: String,
    pub connects_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBreakdown {
    pub total_devices: usize,
    pub sample_devices: Vec<String>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceProblem {
    NotNumeric,
    OutOfRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorProblem {
    Missing,
    InvalidFormat,
    Negative,
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    Isolated,
    Partial,
}

/// Issue-specific payload, one variant per finding shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingDetails {
    DuplicateDeviceId {
        device_id: String,
        device_count: usize,
        devices: Vec<DeviceMembership>,
    },
    AddressConflict {
        address: String,
        scope: MembershipScope,
        scope_id: String,
        devices: Vec<DeviceRef>,
    },
    InvalidDeviceInstance {
        device: String,
        label: String,
        device_instance: String,
        problem: InstanceProblem,
        valid_min: i64,
        valid_max: i64,
    },
    VendorId {
        device: String,
        label: String,
        device_instance: String,
        address: String,
        vendor_id: Option<String>,
        problem: VendorProblem,
    },
    MissingProperties {
        device: String,
        label: String,
        device_instance: String,
        missing_properties: Vec<String>,
        missing_critical: Vec<String>,
        missing_count: usize,
        total_properties: usize,
    },
    OrphanedDevice {
        device: String,
        label: String,
        device_instance: String,
        address: String,
    },
    MissingRouters {
        isolated_networks: Vec<NetworkRef>,
        total_networks: usize,
        routed_networks: usize,
    },
    UnreachableNetwork {
        network: String,
        network_name: String,
        isolation: Isolation,
        total_networks: usize,
        reachable_networks: usize,
        network_islands: usize,
        island_networks: Vec<String>,
    },
    SubnetMismatch {
        device: String,
        device_label: String,
        device_instance: String,
        device_address: String,
        subnet: String,
        subnet_label: Option<String>,
        subnet_address: String,
    },
    NetworkLoop {
        loop_size: usize,
        loop_path: Vec<String>,
        networks_in_loop: Vec<String>,
        routers_causing_loop: Vec<LoopRouter>,
        broadcast_storm_risk: String,
        recommendation: String,
    },
    DuplicateNetwork {
        network: String,
        router_count: usize,
        routers: Vec<RouterSubnets>,
    },
    DuplicateBbmd {
        subnet: String,
        bbmd_count: usize,
        bbmds_with_bdt_count: usize,
        bbmds: Vec<BbmdEntry>,
    },
    OversizedNetwork {
        network: String,
        network_name: String,
        network_type: NetworkKind,
        device_count: usize,
        threshold: usize,
        warning_threshold: usize,
        critical_threshold: usize,
        performance_impact: String,
        recommendation: String,
        device_breakdown: Option<DeviceBreakdown>,
    },
    BroadcastDomainSize {
        network: String,
        network_name: String,
        subnet_count: usize,
        device_count: usize,
        broadcast_scope: BroadcastScope,
        subnet_threshold: usize,
        device_threshold: usize,
        performance_impact: String,
        recommendation: String,
        affected_subnets: Vec<String>,
        ip_ranges: Vec<String>,
    },
    MissingBbmdCoverage {
        network: String,
        network_name: String,
        subnet_count: usize,
        device_count: usize,
        broadcast_scope: BroadcastScope,
        why_needed: String,
        recommendation: String,
        affected_subnets: Vec<String>,
        performance_risk: String,
    },
    BroadcastDomainOverlap {
        ip_range: String,
        overlapping_domains: Vec<String>,
        domain_count: usize,
        affected_networks: Vec<String>,
        conflict_risk: String,
        recommendation: String,
    },
    RoutingLoop {
        loop_length: usize,
        loop_networks: Vec<String>,
        loop_routers: Vec<String>,
        loop_path: Vec<String>,
        performance_impact: String,
        recommendation: String,
        routing_risk: String,
    },
    SuboptimalPath {
        source_network: String,
        target_network: String,
        path_length: usize,
        routing_path: Vec<String>,
        performance_impact: String,
        recommendation: String,
        efficiency_loss: String,
    },
    RouterSinglePointOfFailure {
        router: String,
        network: String,
        connected_networks_count: usize,
        connected_networks: Vec<String>,
        failure_impact: String,
        recommendation: String,
        availability_risk: String,
    },
    AsymmetricRouting {
        source_network: String,
        target_network: String,
        routing_direction: String,
        missing_direction: String,
        recommendation: String,
        connectivity_risk: String,
    },
    MissingRedundancy {
        network: String,
        connected_networks_count: usize,
        connected_networks: Vec<String>,
        redundancy_impact: String,
        recommendation: String,
        availability_risk: String,
    },
}

/// One detected problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose_description: Option<String>,
    pub details: FindingDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected: Vec<String>,
}

impl Finding {
    pub fn new(
        issue_type: IssueType,
        severity: Severity,
        description: impl Into<String>,
        details: FindingDetails,
    ) -> Self {
        Self {
            issue_type,
            severity,
            description: description.into(),
            verbose_description: None,
            details,
            affected: Vec::new(),
        }
    }

    /// Attaches entity URIs; duplicates are dropped, first occurrence wins.
    pub fn affecting<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for entity in entities {
            let entity = entity.into();
            if !self.affected.contains(&entity) {
                self.affected.push(entity);
            }
        }
        self
    }

    /// Sets the verbose description when `verbose` is on.
    pub fn verbose_with(mut self, verbose: bool, describe: impl FnOnce() -> String) -> Self {
        if verbose {
            self.verbose_description = Some(describe());
        }
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn affected_entities(&self) -> &[String] {
        &self.affected
    }
}
