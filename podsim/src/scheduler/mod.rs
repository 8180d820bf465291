/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Discrete-event placement engine.
//!
//! [`Simulator`] drives a set of [`NodeLedger`]s with one [`Policy`] and
//! produces a [`Schedule`]: for every pod, the node that ran it and its start
//! and end times.  All five heuristics share this one loop; they differ only
//! in the policy object (see [`policy`]).
//!
//! ```text
//!            ┌──────────── placed ≥ 1 ─────────────┐
//!            ▼                                     │
//!   ┌──► Pending ── ready set, place in order ─────┘
//!   │        │ placed = 0
//!   │        ▼
//!   └── Advancing: clock = max(next event, clock + ε)
//!            │ no next event
//!            ▼
//!   Completed (pending = ∅)   Aborted(FatalReason)
//! ```
//!
//! | Topic | Choice |
//! |---|---|
//! | State | Ledgers owned by the simulator, everything else local to `run()` |
//! | Determinism | Stable sorts, named tie-breaks, index-ordered node queue |
//! | Fatal states | `SimulationStatus::Aborted` with the partial schedule, not an `Err` |
//! | Ledger refusal after admission | `SimulationError::LedgerInvariant` + `error!` |
//! | Resource safety | Enforced by the ledgers, re-checked by [`audit`] afterwards |
//!
//! # Example
//! ```rust,ignore
//! let pods = expand_jobs(&workload.jobs);
//! let report = simulate(&pods, &cluster.schedulable_nodes(), Heuristic::LongestJobFirst)?;
//! println!("makespan = {}", report.schedule.makespan());
//! ```

pub mod audit;
pub mod error;
pub mod policy;

pub use error::{AdmissionReason, FatalReason, SimulationError};
pub use policy::{Heuristic, JobOrder, NodeSelect, PodOrder, Policy};

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::node::{earliest_free_first, NodeLedger, NodeQueue};
use crate::schedule::{JctSummary, Schedule, ScheduleRecord};
use crate::workload::PodTask;

use audit::check_capacity;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Minimum clock step when no pod could be placed.
///
/// Keeps the loop moving forward even when the next event coincides with
/// the current clock.
pub const CLOCK_EPSILON: f64 = 0.01;

// ── Report types ──────────────────────────────────────────────────────────────

/// How a simulation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationStatus {
    /// Every pod was placed.
    Completed,
    /// The loop stopped with pods still pending.
    Aborted(FatalReason),
}

/// Result of one [`Simulator::run`].
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// `None` when the simulator was built from a custom [`Policy`].
    pub heuristic: Option<Heuristic>,
    pub policy: Policy,
    pub schedule: Schedule,
    pub status: SimulationStatus,
    /// Pods handed to the simulator.
    pub total_pods: usize,
}

impl SimulationReport {
    pub fn is_complete(&self) -> bool {
        self.status == SimulationStatus::Completed
    }
}

/// One row of a heuristic comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicSummary {
    pub heuristic: Heuristic,
    pub completed: bool,
    pub scheduled: usize,
    pub total: usize,
    pub makespan: f64,
    pub jct: Option<JctSummary>,
}

impl HeuristicSummary {
    pub fn new(heuristic: Heuristic, report: &SimulationReport) -> Self {
        Self {
            heuristic,
            completed: report.is_complete(),
            scheduled: report.schedule.len(),
            total: report.total_pods,
            makespan: report.schedule.makespan(),
            jct: report.schedule.jct_summary(),
        }
    }
}

// ── Simulator ─────────────────────────────────────────────────────────────────

/// Placement engine for one set of nodes and one policy.
///
/// The simulator owns its ledgers; after [`run`](Self::run) they hold the
/// state at the end of the simulation.  Build a fresh simulator per run.
pub struct Simulator {
    nodes: Vec<NodeLedger>,
    policy: Policy,
    heuristic: Option<Heuristic>,
}

impl Simulator {
    pub fn new(nodes: Vec<NodeLedger>, heuristic: Heuristic) -> Self {
        Self {
            nodes,
            policy: heuristic.policy(),
            heuristic: Some(heuristic),
        }
    }

    /// Simulator driven by a hand-built policy.
    pub fn with_policy(nodes: Vec<NodeLedger>, policy: Policy) -> Self {
        Self {
            nodes,
            policy,
            heuristic: None,
        }
    }

    pub fn nodes(&self) -> &[NodeLedger] {
        &self.nodes
    }

    // ── Public entry point ────────────────────────────────────────────────────

    /// Place every pod in `pods` and return the resulting schedule.
    ///
    /// A run that cannot place every pod still returns `Ok`: the report's
    /// status is [`SimulationStatus::Aborted`] and its schedule holds the pods
    /// placed before the loop stopped.
    ///
    /// # Errors
    /// [`SimulationError::LedgerInvariant`] if a ledger refuses an assignment
    /// that passed its admission check.
    pub fn run(&mut self, pods: Vec<PodTask>) -> Result<SimulationReport, SimulationError> {
        let total_pods = pods.len();
        let policy = self.policy;
        let mut pending = policy.job_order.arrange(pods);

        let active: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].is_active())
            .collect();

        // Only the anticipatory search keeps a node queue; it lives for the
        // whole run so heap keys reflect every assignment made so far.
        let mut queue = policy.allow_future_start.then(|| {
            NodeQueue::with_nodes(&self.nodes, active.iter().copied(), earliest_free_first)
        });

        info!(
            heuristic    = %self.label(),
            pod_count    = total_pods,
            node_count   = self.nodes.len(),
            active_nodes = active.len(),
            future_start = policy.allow_future_start,
            "=== Simulator::run() ==="
        );

        let mut schedule = Schedule::new();
        let mut clock = 0.0_f64;

        let status = loop {
            if pending.is_empty() {
                break SimulationStatus::Completed;
            }
            if active.is_empty() {
                break SimulationStatus::Aborted(FatalReason::NoActiveNodes);
            }

            // ── One pass over the ready set ───────────────────────────────────
            let mut placed: BTreeSet<u64> = BTreeSet::new();
            for idx in policy.pod_order.ready_indices(&pending, clock) {
                let pod = &pending[idx];
                let placement = match queue.as_mut() {
                    Some(queue) => Self::place_anticipatory(&mut self.nodes, queue, pod, clock)?,
                    None => Self::place_immediate(
                        &mut self.nodes,
                        &active,
                        policy.node_select,
                        pod,
                        clock,
                    )?,
                };

                if let Some((node_idx, start, end)) = placement {
                    let node_name = self.nodes[node_idx].name();
                    debug!(
                        pod   = %pod.name,
                        node  = %node_name,
                        start = start,
                        end   = end,
                        clock = clock,
                        "✓ placed"
                    );
                    schedule.push(ScheduleRecord::new(pod, node_name, start, end));
                    placed.insert(pod.id);
                }
            }

            if !placed.is_empty() {
                pending.retain(|p| !placed.contains(&p.id));
                continue;
            }

            // ── Nothing fit: advance the clock ────────────────────────────────
            match self.next_event(&pending, &active, clock) {
                Some(event) => {
                    let next = event.max(clock + CLOCK_EPSILON);
                    debug!(from = clock, to = next, pending = pending.len(), "advancing clock");
                    clock = next;
                }
                None => {
                    break SimulationStatus::Aborted(FatalReason::NoNextEvent {
                        clock,
                        pending: pending.len(),
                    });
                }
            }
        };

        // ── Post-run: capacity audit ──────────────────────────────────────────
        for v in check_capacity(&schedule, &self.nodes) {
            warn!(
                node     = %v.node,
                at       = v.at,
                in_use   = %v.in_use,
                capacity = %v.capacity,
                "node over-committed in produced schedule"
            );
        }

        match &status {
            SimulationStatus::Completed => info!(
                heuristic = %self.label(),
                scheduled = schedule.len(),
                makespan  = schedule.makespan(),
                "=== Simulation complete ==="
            ),
            SimulationStatus::Aborted(reason) => error!(
                heuristic = %self.label(),
                scheduled = schedule.len(),
                total     = total_pods,
                reason    = %reason,
                "simulation aborted, returning partial schedule"
            ),
        }

        Ok(SimulationReport {
            heuristic: self.heuristic,
            policy,
            schedule,
            status,
            total_pods,
        })
    }

    // ── Placement modes ───────────────────────────────────────────────────────

    /// Pop nodes in queue order until one can take `pod` at
    /// `max(earliest_free, clock, submit_time)`.  Rejected nodes are pushed
    /// back once the search ends.
    ///
    /// The start never precedes the instant a node's ledger was already
    /// advanced to: a rejected attempt may have released pods up to a future
    /// instant, leaving the node looking idle before it really is.
    fn place_anticipatory(
        nodes: &mut [NodeLedger],
        queue: &mut NodeQueue,
        pod: &PodTask,
        clock: f64,
    ) -> Result<Option<(usize, f64, f64)>, SimulationError> {
        let mut set_aside = Vec::new();
        let mut placement = None;

        while let Some(idx) = queue.pop(nodes) {
            let node = &nodes[idx];
            let start = node
                .earliest_free()
                .max(clock)
                .max(pod.submit_time)
                .max(node.advanced_to());

            if nodes[idx].can_admit(&pod.requests, start) {
                let end = Self::commit(nodes, idx, pod, start)?;
                queue.push(idx, nodes);
                placement = Some((idx, start, end));
                break;
            }
            set_aside.push(idx);
        }

        for idx in set_aside {
            queue.push(idx, nodes);
        }
        Ok(placement)
    }

    /// Pick a node that can take `pod` right now; the pod starts at `clock`.
    fn place_immediate(
        nodes: &mut [NodeLedger],
        active: &[usize],
        select: NodeSelect,
        pod: &PodTask,
        clock: f64,
    ) -> Result<Option<(usize, f64, f64)>, SimulationError> {
        let Some(idx) = select.select(nodes, active, &pod.requests, clock) else {
            return Ok(None);
        };
        let end = Self::commit(nodes, idx, pod, clock)?;
        Ok(Some((idx, clock, end)))
    }

    fn commit(
        nodes: &mut [NodeLedger],
        idx: usize,
        pod: &PodTask,
        start: f64,
    ) -> Result<f64, SimulationError> {
        match nodes[idx].assign(pod.id, pod.processing_time, pod.requests, start) {
            Ok(end) => Ok(end),
            Err(reason) => {
                error!(
                    pod    = %pod.name,
                    node   = %nodes[idx].name(),
                    start  = start,
                    reason = %reason,
                    "ledger refused an admitted pod"
                );
                Err(SimulationError::LedgerInvariant {
                    pod: pod.name.clone(),
                    node: nodes[idx].name().to_string(),
                    reason,
                })
            }
        }
    }

    // ── Clock ─────────────────────────────────────────────────────────────────

    /// Earliest of: the next submit time after `clock`, the next pod
    /// completion after `clock` on any active node.
    fn next_event(&self, pending: &[PodTask], active: &[usize], clock: f64) -> Option<f64> {
        let next_submit = pending
            .iter()
            .map(|p| p.submit_time)
            .filter(|&t| t > clock)
            .min_by(f64::total_cmp);
        let next_completion = active
            .iter()
            .filter_map(|&i| self.nodes[i].next_completion_after(clock))
            .min_by(f64::total_cmp);

        match (next_submit, next_completion) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn label(&self) -> String {
        match self.heuristic {
            Some(h) => h.to_string(),
            None => "custom".to_string(),
        }
    }
}

// ── Convenience entry points ──────────────────────────────────────────────────

/// Run `heuristic` over copies of `nodes`.
pub fn simulate(
    pods: &[PodTask],
    nodes: &[NodeLedger],
    heuristic: Heuristic,
) -> Result<SimulationReport, SimulationError> {
    Simulator::new(nodes.to_vec(), heuristic).run(pods.to_vec())
}

/// Run every heuristic on fresh copies of `nodes` and summarise each run.
pub fn compare_heuristics(
    pods: &[PodTask],
    nodes: &[NodeLedger],
) -> Result<Vec<HeuristicSummary>, SimulationError> {
    Heuristic::ALL
        .iter()
        .map(|&h| simulate(pods, nodes, h).map(|report| HeuristicSummary::new(h, &report)))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
