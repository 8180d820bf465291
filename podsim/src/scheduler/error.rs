/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the pod-placement simulator.
//!
//! Three types model the three failure layers:
//!
//! * [`AdmissionReason`]: why a single node ledger refused a pod (low-level,
//!   carries exact resource values).
//! * [`FatalReason`]: why the simulation loop stopped before every pod was
//!   placed.  This is a terminal *state*, not an `Err`: the partial schedule is
//!   still returned inside the report.
//! * [`SimulationError`]: hard failures returned from
//!   [`Simulator::run()`](super::Simulator::run).
//!
//! **Do not** replace these with `anyhow::Error` in library paths; the
//! structured variants are matched on by callers and tests.

use thiserror::Error;

// ── Admission control ─────────────────────────────────────────────────────────

/// Detailed reason why a node could not admit a pod at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionReason {
    InsufficientCpu { required: f64, available: f64 },
    InsufficientGpu { required: u32, available: u32 },
    InsufficientMemory { required_mb: u64, available_mb: u64 },
}

impl std::fmt::Display for AdmissionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionReason::InsufficientCpu {
                required,
                available,
            } => write!(
                f,
                "pod requires {:.3} CPU but node only has {:.3} available",
                required, available
            ),

            AdmissionReason::InsufficientGpu {
                required,
                available,
            } => write!(
                f,
                "pod requires {} GPU(s) but node only has {} available",
                required, available
            ),

            AdmissionReason::InsufficientMemory {
                required_mb,
                available_mb,
            } => write!(
                f,
                "pod requires {}MB but node only has {}MB available",
                required_mb, available_mb
            ),
        }
    }
}

// ── Terminal states ───────────────────────────────────────────────────────────

/// Why a simulation was aborted with pods still pending.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FatalReason {
    /// Every node was filtered out (unschedulable or zero CPU capacity).
    #[error("no active node with non-zero capacity is available")]
    NoActiveNodes,

    /// Pods remain but no future submit time exists and no node will ever
    /// release resources: the remaining pods can never fit.
    #[error("no next event can be determined at t={clock:.2}s with {pending} pod(s) pending")]
    NoNextEvent { clock: f64, pending: usize },
}

// ── Top-level simulator errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SimulationError {
    /// The heuristic name given on the command line or API is not recognised.
    #[error("unknown heuristic: '{0}' (valid: llmf, ff, bf, sjf, ljf)")]
    UnknownHeuristic(String),

    /// The engine asked a ledger to assign a pod it cannot admit.
    ///
    /// Placement always runs an admission check first, so this is a defect in
    /// the engine itself rather than a property of the input.
    #[error("ledger invariant violated: pod '{pod}' assigned to node '{node}' while infeasible: {reason}")]
    LedgerInvariant {
        pod: String,
        node: String,
        reason: AdmissionReason,
    },
}
