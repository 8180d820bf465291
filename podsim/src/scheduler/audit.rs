/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Post-simulation resource-safety audit.
//!
//! The ledgers enforce capacity while the engine runs; this module checks the
//! same property again from the finished [`Schedule`] alone.  For every node
//! and every record start instant `t` on it:
//!
//! $$\sum_{r \,:\, start_r \le t < end_r} request_r \le capacity$$
//!
//! Resource usage only increases at start instants, so checking those is
//! enough to cover the whole timeline.
//!
//! Findings are **warnings only**: the schedule is returned regardless.

use crate::node::NodeLedger;
use crate::resource::ResourceVector;
use crate::schedule::Schedule;

/// One instant at which a node was over-committed.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityViolation {
    pub node: String,
    pub at: f64,
    pub in_use: ResourceVector,
    pub capacity: ResourceVector,
}

/// Replay `schedule` against the capacities of `nodes`.
///
/// Returns an empty vector if no node is ever over-committed.  Records on
/// nodes missing from `nodes` are ignored.
pub fn check_capacity(schedule: &Schedule, nodes: &[NodeLedger]) -> Vec<CapacityViolation> {
    let mut violations = Vec::new();

    for node in nodes {
        let records: Vec<_> = schedule.records_on(node.name()).collect();
        let capacity = node.capacity();

        let mut instants: Vec<f64> = records.iter().map(|r| r.start_time).collect();
        instants.sort_by(f64::total_cmp);
        instants.dedup();

        for at in instants {
            let in_use = records
                .iter()
                .filter(|r| r.is_running_at(at))
                .fold(ResourceVector::ZERO, |acc, r| acc + r.requests);

            if !in_use.fits_within(&capacity) {
                violations.push(CapacityViolation {
                    node: node.name().to_string(),
                    at,
                    in_use,
                    capacity,
                });
            }
        }
    }
    violations
}

// ── Tests ─────────────────────────────────────────────────────────────────────
