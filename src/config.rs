use crate::error::{CheckError, Result};
use crate::finding::NetworkKind;
use crate::vocab::Vocabulary;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const ENV_NAMESPACE: &str = "BACNET_CHECKS_NAMESPACE";
pub const ENV_EXCLUDED_MARKER: &str = "BACNET_CHECKS_EXCLUDED_MARKER";

const DEFAULT_EXCLUDED_MARKER: &str = "Grasshopper";
const DEFAULT_DEVICE_INSTANCE_MAX: i64 = 4_194_303;
const DEFAULT_MAX_LOOP_DEPTH: usize = 5;
const DEFAULT_MAX_ROUTE_HOPS: usize = 4;

/// Device-count (or subnet-count) level at which a finding is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub warning: usize,
    pub critical: usize,
}

impl Thresholds {
    pub const fn new(warning: usize, critical: usize) -> Self {
        Self { warning, critical }
    }
}

/// Per network kind `(warning, critical)` device counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkThresholds {
    pub mstp: Thresholds,
    pub ip: Thresholds,
    pub ethernet: Thresholds,
    pub arcnet: Thresholds,
    pub ptp: Thresholds,
    pub other: Thresholds,
}

impl Default for NetworkThresholds {
    fn default() -> Self {
        Self {
            mstp: Thresholds::new(15, 30),
            ip: Thresholds::new(50, 100),
            ethernet: Thresholds::new(50, 100),
            arcnet: Thresholds::new(15, 25),
            ptp: Thresholds::new(2, 3),
            other: Thresholds::new(25, 50),
        }
    }
}

impl NetworkThresholds {
    pub fn for_kind(&self, kind: NetworkKind) -> Thresholds {
        match kind {
            NetworkKind::Mstp => self.mstp,
            NetworkKind::Ip => self.ip,
            NetworkKind::Ethernet => self.ethernet,
            NetworkKind::Arcnet => self.arcnet,
            NetworkKind::Ptp => self.ptp,
            NetworkKind::Other => self.other,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (&'static str, Thresholds)> {
        [
            ("mstp", self.mstp),
            ("ip", self.ip),
            ("ethernet", self.ethernet),
            ("arcnet", self.arcnet),
            ("ptp", self.ptp),
            ("other", self.other),
        ]
        .into_iter()
    }
}

/// Broadcast domain sizing limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastThresholds {
    pub subnets: Thresholds,
    pub devices: Thresholds,
    /// A domain with more subnets than this needs a BBMD.
    pub bbmd_subnet_trigger: usize,
    /// A domain with more devices than this needs a BBMD.
    pub bbmd_device_trigger: usize,
}

impl Default for BroadcastThresholds {
    fn default() -> Self {
        Self {
            subnets: Thresholds::new(5, 10),
            devices: Thresholds::new(200, 500),
            bbmd_subnet_trigger: 2,
            bbmd_device_trigger: 100,
        }
    }
}

/// Configuration injected into every analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub vocabulary: Vocabulary,
    /// Devices whose label or URI contains this substring are skipped by the
    /// vendor-id and missing-property checks.
    pub excluded_marker: String,
    pub device_instance_max: i64,
    pub max_loop_depth: usize,
    pub max_route_hops: usize,
    pub network_thresholds: NetworkThresholds,
    pub broadcast: BroadcastThresholds,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            excluded_marker: DEFAULT_EXCLUDED_MARKER.to_string(),
            device_instance_max: DEFAULT_DEVICE_INSTANCE_MAX,
            max_loop_depth: DEFAULT_MAX_LOOP_DEPTH,
            max_route_hops: DEFAULT_MAX_ROUTE_HOPS,
            network_thresholds: NetworkThresholds::default(),
            broadcast: BroadcastThresholds::default(),
        }
    }
}

impl CheckConfig {
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            vocabulary: Vocabulary::with_namespace(namespace),
            ..Self::default()
        }
    }

    /// Loads a YAML or JSON config file, applies environment overrides and validates.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let mut config = load_config_file(path)?;
        config.apply_env_overrides();
        config
            .validate()
            .with_context(|| format!("invalid config file {:?}", path))?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup; empty values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(namespace) = lookup(ENV_NAMESPACE).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%namespace, "namespace overridden from environment");
            self.vocabulary.namespace = namespace.trim().to_string();
        }
        if let Some(marker) = lookup(ENV_EXCLUDED_MARKER).filter(|v| !v.is_empty()) {
            self.excluded_marker = marker;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.vocabulary.namespace.trim().is_empty() {
            return Err(CheckError::Config("namespace must not be empty".into()));
        }
        if self.device_instance_max < 0 {
            return Err(CheckError::Config(
                "device_instance_max must be non-negative".into(),
            ));
        }
        if self.max_loop_depth == 0 {
            return Err(CheckError::Config("max_loop_depth must be at least 1".into()));
        }
        for (kind, thresholds) in self.network_thresholds.iter() {
            ensure_ordered(&format!("network_thresholds.{kind}"), thresholds)?;
        }
        ensure_ordered("broadcast.subnets", self.broadcast.subnets)?;
        ensure_ordered("broadcast.devices", self.broadcast.devices)?;
        Ok(())
    }
}

fn ensure_ordered(name: &str, thresholds: Thresholds) -> Result<()> {
    if thresholds.warning >= thresholds.critical {
        return Err(CheckError::Config(format!(
            "{name}: warning threshold {} must be below critical threshold {}",
            thresholds.warning, thresholds.critical
        )));
    }
    Ok(())
}

fn load_config_file(path: &Path) -> anyhow::Result<CheckConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
