//! Unit converters.
//!
//! Pure functions translating the abstract quantities stored in the database
//! into what the cluster understands:
//!
//! | Input | Output |
//! |-------|--------|
//! | `"2G"` | heap `"1638M"`, quantity `"2Gi"` |
//! | `"512m"` | heap `"410M"`, quantity `"512Mi"` |
//! | `"node-exposed"` | `NodePort` |
//!
//! Unparseable memory budgets fall back to [`DEFAULT_MEMORY_BUDGET`] instead of
//! failing, so one bad row never blocks convergence of the others.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fraction of the memory budget handed to the runtime heap
pub const HEAP_FRACTION: f64 = 0.8;

/// Budget used when the stored value cannot be parsed
pub const DEFAULT_MEMORY_BUDGET: MemoryBudget = MemoryBudget {
    value: 1.0,
    unit: MemoryUnit::Gigabytes,
};

/// Unit suffix of a memory budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryUnit {
    Megabytes,
    Gigabytes,
}

impl MemoryUnit {
    fn megabytes_per_unit(self) -> f64 {
        match self {
            MemoryUnit::Megabytes => 1.0,
            MemoryUnit::Gigabytes => 1024.0,
        }
    }

    fn quantity_suffix(self) -> &'static str {
        match self {
            MemoryUnit::Megabytes => "Mi",
            MemoryUnit::Gigabytes => "Gi",
        }
    }
}

/// Parsed memory budget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemoryBudget {
    pub value: f64,
    pub unit: MemoryUnit,
}

impl MemoryBudget {
    /// Parse `"<number><M|G>"`, case-insensitive. Returns `None` for anything
    /// else, including zero, negative and non-finite numbers.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (split, suffix) = raw.char_indices().last()?;
        let unit = match suffix {
            'M' | 'm' => MemoryUnit::Megabytes,
            'G' | 'g' => MemoryUnit::Gigabytes,
            _ => return None,
        };
        let number = raw.get(..split)?;
        let value: f64 = number.trim().parse().ok()?;
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        Some(Self { value, unit })
    }

    /// Parse a budget, substituting the default when it is malformed.
    pub fn parse_or_default(raw: &str) -> Self {
        match Self::parse(raw) {
            Some(budget) => budget,
            None => {
                tracing::warn!(
                    memory_budget = %raw,
                    fallback = %DEFAULT_MEMORY_BUDGET,
                    "Unparseable memory budget, using default"
                );
                DEFAULT_MEMORY_BUDGET
            }
        }
    }

    /// Heap setting for the runtime: `HEAP_FRACTION` of the budget, in whole megabytes.
    pub fn heap(&self) -> String {
        let megabytes = self.value * self.unit.megabytes_per_unit() * HEAP_FRACTION;
        format!("{}M", megabytes.round() as u64)
    }

    /// Cluster resource quantity with the matching binary suffix.
    pub fn quantity(&self) -> String {
        format!("{}{}", self.value, self.unit.quantity_suffix())
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.unit {
            MemoryUnit::Megabytes => "M",
            MemoryUnit::Gigabytes => "G",
        };
        write!(f, "{}{}", self.value, suffix)
    }
}

/// Heap setting for a raw memory budget.
pub fn heap_setting(raw: &str) -> String {
    MemoryBudget::parse_or_default(raw).heap()
}

/// Cluster memory quantity for a raw memory budget.
pub fn memory_quantity(raw: &str) -> String {
    MemoryBudget::parse_or_default(raw).quantity()
}

/// How an instance is exposed on the network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExposureMode {
    /// Reachable only inside the cluster
    #[default]
    InternalOnly,
    /// Reachable on a port of every node
    NodeExposed,
    /// Reachable through an external load balancer
    LoadBalanced,
}

impl ExposureMode {
    /// Map a stored exposure mode, defaulting to internal-only for unknown input.
    ///
    /// Accepts both the dashed form (`node-exposed`) and the enum form (`NODE_EXPOSED`).
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "internal-only" => ExposureMode::InternalOnly,
            "node-exposed" => ExposureMode::NodeExposed,
            "load-balanced" => ExposureMode::LoadBalanced,
            _ => ExposureMode::InternalOnly,
        }
    }

    /// Native Service type string
    pub fn service_type(&self) -> &'static str {
        match self {
            ExposureMode::InternalOnly => "ClusterIP",
            ExposureMode::NodeExposed => "NodePort",
            ExposureMode::LoadBalanced => "LoadBalancer",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExposureMode::InternalOnly => "internal-only",
            ExposureMode::NodeExposed => "node-exposed",
            ExposureMode::LoadBalanced => "load-balanced",
        }
    }
}

impl fmt::Display for ExposureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ExposureMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ExposureMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ExposureMode::parse(&raw))
    }
}
