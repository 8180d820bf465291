/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Resource vectors and Kubernetes-style quantity parsing.
//!
//! Every amount the simulator reasons about (pod requests and limits, node
//! capacity and availability) is a [`ResourceVector`]:
//!
//! | Dimension | Type | Unit |
//! |---|---|---|
//! | `cpu` | `f64` | cores (fractional, `800m` = `0.8`) |
//! | `gpu` | `u32` | whole devices |
//! | `memory_mb` | `u64` | MiB |
//!
//! Quantities arrive as loosely formatted strings (`"800m"`, `"4Gi"`, `"2"`)
//! or bare YAML numbers.  Parsing is deliberately **lenient**: a malformed
//! value becomes `0` and a `warn!` diagnostic is emitted, the load never fails.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use tracing::warn;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Slack applied to CPU comparisons so that sums of fractional requests such as
/// `0.1 + 0.2` still fit into a `0.3` core budget.
pub const CPU_TOLERANCE: f64 = 1e-9;

// ── ResourceVector ────────────────────────────────────────────────────────────

/// CPU / GPU / memory bundle.
///
/// A plain value type: arithmetic always produces a new vector and never
/// yields negative components.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ResourceVector {
    /// CPU cores.
    pub cpu: f64,
    /// GPU devices.
    pub gpu: u32,
    /// Memory in MiB.
    pub memory_mb: u64,
}

impl ResourceVector {
    pub const ZERO: ResourceVector = ResourceVector {
        cpu: 0.0,
        gpu: 0,
        memory_mb: 0,
    };

    pub fn new(cpu: f64, gpu: u32, memory_mb: u64) -> Self {
        Self {
            cpu: cpu.max(0.0),
            gpu,
            memory_mb,
        }
    }

    /// CPU-only vector, handy in tests and for CPU-bound workloads.
    pub fn cpu(cpu: f64) -> Self {
        Self::new(cpu, 0, 0)
    }

    /// `true` iff every component of `self` is `<=` the matching component of
    /// `budget`.  Each dimension is checked independently.
    pub fn fits_within(&self, budget: &ResourceVector) -> bool {
        self.cpu <= budget.cpu + CPU_TOLERANCE
            && self.gpu <= budget.gpu
            && self.memory_mb <= budget.memory_mb
    }
}

impl Add for ResourceVector {
    type Output = ResourceVector;

    fn add(self, rhs: ResourceVector) -> ResourceVector {
        ResourceVector {
            cpu: self.cpu + rhs.cpu,
            gpu: self.gpu.saturating_add(rhs.gpu),
            memory_mb: self.memory_mb.saturating_add(rhs.memory_mb),
        }
    }
}

/// Elementwise difference, clamped at zero in every dimension.
impl Sub for ResourceVector {
    type Output = ResourceVector;

    fn sub(self, rhs: ResourceVector) -> ResourceVector {
        ResourceVector {
            cpu: (self.cpu - rhs.cpu).max(0.0),
            gpu: self.gpu.saturating_sub(rhs.gpu),
            memory_mb: self.memory_mb.saturating_sub(rhs.memory_mb),
        }
    }
}

impl fmt::Display for ResourceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cpu={} gpu={} memory={}Mi",
            self.cpu, self.gpu, self.memory_mb
        )
    }
}

// ── Quantity ──────────────────────────────────────────────────────────────────

/// A raw resource quantity as it appears in a YAML definition.
///
/// Both `cpu: "500m"` and `cpu: 2` are accepted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Quantity {
    Text(String),
    Number(f64),
}

impl Quantity {
    /// Numeric value after unit scaling, or `None` if the text is malformed.
    pub fn value(&self) -> Option<f64> {
        match self {
            Quantity::Text(s) => parse_quantity(s),
            Quantity::Number(n) if n.is_finite() => Some(*n),
            Quantity::Number(_) => None,
        }
    }
}

impl From<&str> for Quantity {
    fn from(s: &str) -> Self {
        Quantity::Text(s.to_string())
    }
}

/// Parse a resource quantity string.
///
/// The numeric part is made of the digits and dots of the input, the unit is
/// made of its letters (case-insensitive):
///
/// | Unit | Result | Example |
/// |---|---|---|
/// | none | value as-is | `"2"` → `2.0` |
/// | `m` | value / 1000 | `"800m"` → `0.8` |
/// | `Mi` | integer value | `"1000Mi"` → `1000` |
/// | `Gi` | value × 1024 | `"4Gi"` → `4096` |
/// | `Ki` | value / 1024 | `"2048Ki"` → `2` |
/// | other | value as-is | `"3G"` → `3.0` |
///
/// An empty string is `Some(0.0)`.  Returns `None` when no number can be
/// extracted.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }

    let number: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let unit: String = raw
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    let value: f64 = number.parse().ok()?;

    let scaled = match unit.as_str() {
        "" => value,
        "M" => value / 1000.0,
        "MI" => value.trunc(),
        "GI" => (value * 1024.0).trunc(),
        "KI" => (value / 1024.0).trunc(),
        _ => value,
    };
    Some(scaled)
}

/// Resolve an optional quantity to a number, falling back to `0` with a
/// warning when the value is malformed.
///
/// `owner` and `field` only feed the diagnostic.
pub fn quantity_or_zero(quantity: Option<&Quantity>, owner: &str, field: &str) -> f64 {
    let Some(q) = quantity else {
        return 0.0;
    };
    match q.value() {
        Some(v) => v,
        None => {
            warn!(
                owner = %owner,
                field = %field,
                raw   = ?q,
                "malformed resource quantity, treating as 0"
            );
            0.0
        }
    }
}

/// Build a [`ResourceVector`] from the three raw quantities of a resource
/// list.  GPU and memory are truncated to integers.
pub fn vector_from_quantities(
    cpu: Option<&Quantity>,
    gpu: Option<&Quantity>,
    memory: Option<&Quantity>,
    owner: &str,
) -> ResourceVector {
    let cpu = quantity_or_zero(cpu, owner, "cpu");
    let gpu = quantity_or_zero(gpu, owner, "nvidia.com/gpu");
    let memory = quantity_or_zero(memory, owner, "memory");
    ResourceVector::new(cpu, gpu.max(0.0) as u32, memory.max(0.0) as u64)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
