/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Placement heuristics as explicit policy objects.
//!
//! Every heuristic is the same engine driven by a [`Policy`]:
//!
//! | Heuristic | Job order | Pod order (ready set) | Node selection | Future start |
//! |---|---|---|---|---|
//! | `llmf` | input | FIFO `(submit, id)` | least CPU load, then name | no |
//! | `ff` | input | FIFO | first feasible in input order | no |
//! | `bf` | input | FIFO | least residual CPU, then memory, then name | no |
//! | `sjf` | total size ↑ | processing time ↑ | earliest-free node queue | yes |
//! | `ljf` | total size ↓ | processing time ↓ | earliest-free node queue | yes |
//!
//! Pod sorts are stable, so pods with equal keys keep the job order.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::node::{earliest_free_first, NodeLedger};
use crate::resource::ResourceVector;
use crate::scheduler::SimulationError;
use crate::workload::{job_sizes, PodTask};

// ── Policy components ─────────────────────────────────────────────────────────

/// Arrangement of jobs before pods are considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobOrder {
    /// Expansion order.
    Input,
    /// Smallest total estimated size first.
    SizeAscending,
    /// Largest total estimated size first.
    SizeDescending,
}

impl JobOrder {
    /// Reorder `pods` job by job.  Inside a job pods keep ascending id order;
    /// equally sized jobs keep their input order.
    pub fn arrange(self, mut pods: Vec<PodTask>) -> Vec<PodTask> {
        pods.sort_by_key(|p| p.id);
        if self == JobOrder::Input {
            return pods;
        }

        let mut sizes = job_sizes(&pods);
        match self {
            JobOrder::SizeAscending => sizes.sort_by(|a, b| a.1.total_cmp(&b.1)),
            JobOrder::SizeDescending => sizes.sort_by(|a, b| b.1.total_cmp(&a.1)),
            JobOrder::Input => {}
        }

        let rank = |job: &str| {
            sizes
                .iter()
                .position(|(name, _)| name == job)
                .unwrap_or(usize::MAX)
        };
        pods.sort_by_cached_key(|p| rank(&p.job_name));
        pods
    }
}

/// Ordering of the ready set on every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PodOrder {
    /// `(submit_time, id)` ascending.
    Fifo,
    /// Processing time ascending.
    ShortestFirst,
    /// Processing time descending.
    LongestFirst,
}

impl PodOrder {
    /// Indices into `pending` of the pods submitted by `clock`, in the order
    /// they should be tried.
    pub fn ready_indices(self, pending: &[PodTask], clock: f64) -> Vec<usize> {
        let mut ready: Vec<usize> = pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.submit_time <= clock)
            .map(|(i, _)| i)
            .collect();

        match self {
            PodOrder::Fifo => ready.sort_by(|&a, &b| {
                let (pa, pb) = (&pending[a], &pending[b]);
                pa.submit_time
                    .total_cmp(&pb.submit_time)
                    .then(pa.id.cmp(&pb.id))
            }),
            PodOrder::ShortestFirst => ready.sort_by(|&a, &b| {
                pending[a]
                    .processing_time
                    .total_cmp(&pending[b].processing_time)
            }),
            PodOrder::LongestFirst => ready.sort_by(|&a, &b| {
                pending[b]
                    .processing_time
                    .total_cmp(&pending[a].processing_time)
            }),
        }
        ready
    }
}

/// Rule picking one node among those that can admit a pod right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeSelect {
    /// Lowest `(capacity.cpu − available.cpu) / capacity.cpu`, then name.
    LeastLoaded,
    /// First feasible node in input order.
    FirstFit,
    /// Lowest residual CPU after placement, then residual memory, then name.
    BestFit,
    /// Minimum under [`earliest_free_first`], then input order.
    EarliestFree,
}

impl NodeSelect {
    /// Among `candidates` (indices into `nodes`), return the node this rule
    /// picks for `request` at `clock`, or `None` if nothing fits.
    ///
    /// Every candidate is first brought up to date with
    /// [`NodeLedger::can_admit`], which releases pods finished by `clock`.
    pub fn select(
        self,
        nodes: &mut [NodeLedger],
        candidates: &[usize],
        request: &ResourceVector,
        clock: f64,
    ) -> Option<usize> {
        let feasible: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| nodes[i].can_admit(request, clock))
            .collect();

        let nodes = &*nodes;
        match self {
            NodeSelect::FirstFit => feasible.first().copied(),
            NodeSelect::LeastLoaded => feasible.into_iter().min_by(|&a, &b| {
                nodes[a]
                    .cpu_load()
                    .total_cmp(&nodes[b].cpu_load())
                    .then_with(|| nodes[a].name().cmp(nodes[b].name()))
            }),
            NodeSelect::BestFit => feasible.into_iter().min_by(|&a, &b| {
                let residual = |i: usize| {
                    let avail = nodes[i].available();
                    (
                        avail.cpu - request.cpu,
                        avail.memory_mb as i128 - request.memory_mb as i128,
                    )
                };
                let (cpu_a, mem_a) = residual(a);
                let (cpu_b, mem_b) = residual(b);
                cpu_a
                    .total_cmp(&cpu_b)
                    .then(mem_a.cmp(&mem_b))
                    .then_with(|| nodes[a].name().cmp(nodes[b].name()))
            }),
            NodeSelect::EarliestFree => feasible
                .into_iter()
                .min_by(|&a, &b| earliest_free_first(&nodes[a], &nodes[b]).then(a.cmp(&b))),
        }
    }
}

// ── Policy ────────────────────────────────────────────────────────────────────

/// Full description of how the engine orders and places pods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Policy {
    pub job_order: JobOrder,
    pub pod_order: PodOrder,
    /// Used when `allow_future_start` is `false`.
    pub node_select: NodeSelect,
    /// `true`: anticipatory placement through the earliest-free node queue;
    /// a pod may be committed to a start time after the current clock.
    /// `false`: a pod only starts on a node that can admit it at the current
    /// clock, and starts exactly then.
    pub allow_future_start: bool,
}

// ── Heuristic ─────────────────────────────────────────────────────────────────

/// The five named heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Heuristic {
    LeastLoaded,
    FirstFit,
    BestFit,
    ShortestJobFirst,
    LongestJobFirst,
}

impl Heuristic {
    pub const ALL: [Heuristic; 5] = [
        Heuristic::LeastLoaded,
        Heuristic::FirstFit,
        Heuristic::BestFit,
        Heuristic::ShortestJobFirst,
        Heuristic::LongestJobFirst,
    ];

    pub fn policy(self) -> Policy {
        match self {
            Heuristic::LeastLoaded => Policy {
                job_order: JobOrder::Input,
                pod_order: PodOrder::Fifo,
                node_select: NodeSelect::LeastLoaded,
                allow_future_start: false,
            },
            Heuristic::FirstFit => Policy {
                job_order: JobOrder::Input,
                pod_order: PodOrder::Fifo,
                node_select: NodeSelect::FirstFit,
                allow_future_start: false,
            },
            Heuristic::BestFit => Policy {
                job_order: JobOrder::Input,
                pod_order: PodOrder::Fifo,
                node_select: NodeSelect::BestFit,
                allow_future_start: false,
            },
            Heuristic::ShortestJobFirst => Policy {
                job_order: JobOrder::SizeAscending,
                pod_order: PodOrder::ShortestFirst,
                node_select: NodeSelect::EarliestFree,
                allow_future_start: true,
            },
            Heuristic::LongestJobFirst => Policy {
                job_order: JobOrder::SizeDescending,
                pod_order: PodOrder::LongestFirst,
                node_select: NodeSelect::EarliestFree,
                allow_future_start: true,
            },
        }
    }

    /// Short display label (`LLMF`, `FF`, `BF`, `SJF/SPT`, `LJF/LPT`).
    pub fn label(self) -> &'static str {
        match self {
            Heuristic::LeastLoaded => "LLMF",
            Heuristic::FirstFit => "FF",
            Heuristic::BestFit => "BF",
            Heuristic::ShortestJobFirst => "SJF/SPT",
            Heuristic::LongestJobFirst => "LJF/LPT",
        }
    }
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Heuristic {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "llmf" | "least-loaded" | "least_loaded" => Ok(Heuristic::LeastLoaded),
            "ff" | "firstfit" | "first-fit" | "first_fit" => Ok(Heuristic::FirstFit),
            "bf" | "bestfit" | "best-fit" | "best_fit" => Ok(Heuristic::BestFit),
            "sjf" | "spt" | "sjf-spt" | "sjf/spt" => Ok(Heuristic::ShortestJobFirst),
            "ljf" | "lpt" | "ljf-lpt" | "ljf/lpt" => Ok(Heuristic::LongestJobFirst),
            other => Err(SimulationError::UnknownHeuristic(other.to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(id: u64, job: &str, submit: f64, processing: f64) -> PodTask {
        PodTask {
            id,
            name: format!("default-{job}-t-{id}"),
            job_name: job.to_string(),
            task_name: "t".to_string(),
            replica: 0,
            submit_time: submit,
            processing_time: processing,
            requests: ResourceVector::cpu(1.0),
            limits: ResourceVector::cpu(1.0),
        }
    }

    fn ids(pods: &[PodTask]) -> Vec<u64> {
        pods.iter().map(|p| p.id).collect()
    }

    // ── Heuristic parsing ─────────────────────────────────────────────────────

    #[test]
    fn heuristic_names_parse_case_insensitively() {
        assert_eq!("LLMF".parse::<Heuristic>().unwrap(), Heuristic::LeastLoaded);
        assert_eq!("FirstFit".parse::<Heuristic>().unwrap(), Heuristic::FirstFit);
        assert_eq!("bf".parse::<Heuristic>().unwrap(), Heuristic::BestFit);
        assert_eq!("sjf".parse::<Heuristic>().unwrap(), Heuristic::ShortestJobFirst);
        assert_eq!("LJF-LPT".parse::<Heuristic>().unwrap(), Heuristic::LongestJobFirst);
    }

    #[test]
    fn unknown_heuristic_is_rejected() {
        let err = "random".parse::<Heuristic>().unwrap_err();
        assert!(matches!(err, SimulationError::UnknownHeuristic(ref s) if s == "random"));
    }

    #[test]
    fn only_job_size_heuristics_start_in_the_future() {
        for h in Heuristic::ALL {
            let anticipatory = matches!(
                h,
                Heuristic::ShortestJobFirst | Heuristic::LongestJobFirst
            );
            assert_eq!(h.policy().allow_future_start, anticipatory, "{h}");
        }
    }

    // ── Job order ─────────────────────────────────────────────────────────────

    #[test]
    fn job_order_by_total_size() {
        // small: 30, big: 100 + 100, mid: 90
        let pods = vec![
            pod(1, "small", 0.0, 30.0),
            pod(2, "big", 0.0, 100.0),
            pod(3, "big", 0.0, 100.0),
            pod(4, "mid", 0.0, 90.0),
        ];
        assert_eq!(ids(&JobOrder::Input.arrange(pods.clone())), vec![1, 2, 3, 4]);
        assert_eq!(
            ids(&JobOrder::SizeAscending.arrange(pods.clone())),
            vec![1, 4, 2, 3]
        );
        assert_eq!(ids(&JobOrder::SizeDescending.arrange(pods)), vec![2, 3, 4, 1]);
    }

    #[test]
    fn equally_sized_jobs_keep_input_order() {
        let pods = vec![pod(1, "a", 0.0, 60.0), pod(2, "b", 0.0, 60.0)];
        assert_eq!(ids(&JobOrder::SizeDescending.arrange(pods.clone())), vec![1, 2]);
        assert_eq!(ids(&JobOrder::SizeAscending.arrange(pods)), vec![1, 2]);
    }

    // ── Pod order ─────────────────────────────────────────────────────────────

    #[test]
    fn ready_set_excludes_future_submissions() {
        let pending = vec![pod(1, "a", 0.0, 30.0), pod(2, "b", 50.0, 30.0)];
        assert_eq!(PodOrder::Fifo.ready_indices(&pending, 10.0), vec![0]);
        assert_eq!(PodOrder::Fifo.ready_indices(&pending, 50.0), vec![0, 1]);
    }

    #[test]
    fn fifo_orders_by_submit_then_id() {
        let pending = vec![
            pod(3, "c", 5.0, 30.0),
            pod(1, "a", 5.0, 30.0),
            pod(2, "b", 0.0, 30.0),
        ];
        let order: Vec<u64> = PodOrder::Fifo
            .ready_indices(&pending, 10.0)
            .into_iter()
            .map(|i| pending[i].id)
            .collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn processing_time_orders_are_stable() {
        let pending = vec![
            pod(1, "a", 0.0, 60.0),
            pod(2, "a", 0.0, 30.0),
            pod(3, "b", 0.0, 60.0),
        ];
        assert_eq!(PodOrder::ShortestFirst.ready_indices(&pending, 0.0), vec![1, 0, 2]);
        assert_eq!(PodOrder::LongestFirst.ready_indices(&pending, 0.0), vec![0, 2, 1]);
    }

    // ── Node selection ────────────────────────────────────────────────────────

    #[test]
    fn first_fit_takes_first_feasible_in_input_order() {
        let mut nodes = vec![
            NodeLedger::new("A", ResourceVector::cpu(1.0)),
            NodeLedger::new("B", ResourceVector::cpu(4.0)),
        ];
        let pick = NodeSelect::FirstFit.select(&mut nodes, &[0, 1], &ResourceVector::cpu(1.0), 0.0);
        assert_eq!(pick, Some(0));
    }

    #[test]
    fn best_fit_prefers_zero_residual() {
        let mut nodes = vec![
            NodeLedger::new("A", ResourceVector::cpu(2.0)),
            NodeLedger::new("B", ResourceVector::cpu(1.0)),
        ];
        let pick = NodeSelect::BestFit.select(&mut nodes, &[0, 1], &ResourceVector::cpu(1.0), 0.0);
        assert_eq!(pick, Some(1));
    }

    #[test]
    fn best_fit_breaks_cpu_ties_on_memory() {
        let mut nodes = vec![
            NodeLedger::new("A", ResourceVector::new(2.0, 0, 8192)),
            NodeLedger::new("B", ResourceVector::new(2.0, 0, 2048)),
        ];
        let req = ResourceVector::new(1.0, 0, 1024);
        assert_eq!(NodeSelect::BestFit.select(&mut nodes, &[0, 1], &req, 0.0), Some(1));
    }

    #[test]
    fn least_loaded_prefers_lower_cpu_fraction() {
        let mut nodes = vec![
            NodeLedger::new("A", ResourceVector::cpu(2.0)),
            NodeLedger::new("B", ResourceVector::cpu(4.0)),
        ];
        nodes[0].assign(1, 100.0, ResourceVector::cpu(0.5), 0.0).unwrap(); // 25 %
        nodes[1].assign(2, 100.0, ResourceVector::cpu(2.0), 0.0).unwrap(); // 50 %
        let pick =
            NodeSelect::LeastLoaded.select(&mut nodes, &[0, 1], &ResourceVector::cpu(1.0), 0.0);
        assert_eq!(pick, Some(0));
    }

    #[test]
    fn least_loaded_ties_break_by_name() {
        let mut nodes = vec![
            NodeLedger::new("zeta", ResourceVector::cpu(2.0)),
            NodeLedger::new("alpha", ResourceVector::cpu(2.0)),
        ];
        let pick =
            NodeSelect::LeastLoaded.select(&mut nodes, &[0, 1], &ResourceVector::cpu(1.0), 0.0);
        assert_eq!(pick, Some(1));
    }

    #[test]
    fn selection_skips_nodes_that_cannot_admit_now() {
        let mut nodes = vec![
            NodeLedger::new("A", ResourceVector::cpu(1.0)),
            NodeLedger::new("B", ResourceVector::cpu(1.0)),
        ];
        nodes[0].assign(1, 30.0, ResourceVector::cpu(1.0), 0.0).unwrap();
        let req = ResourceVector::cpu(1.0);
        assert_eq!(NodeSelect::FirstFit.select(&mut nodes, &[0, 1], &req, 10.0), Some(1));
        nodes[1].assign(2, 30.0, req, 10.0).unwrap();
        assert_eq!(NodeSelect::FirstFit.select(&mut nodes, &[0, 1], &req, 20.0), None);
        // node A frees at t=30
        assert_eq!(NodeSelect::FirstFit.select(&mut nodes, &[0, 1], &req, 30.0), Some(0));
    }

    #[test]
    fn earliest_free_selection_prefers_more_available_cpu() {
        let mut nodes = vec![
            NodeLedger::new("A", ResourceVector::cpu(1.0)),
            NodeLedger::new("B", ResourceVector::cpu(3.0)),
        ];
        let pick =
            NodeSelect::EarliestFree.select(&mut nodes, &[0, 1], &ResourceVector::cpu(1.0), 0.0);
        assert_eq!(pick, Some(1));
    }
}
