/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-node resource ledger and the node priority queue.
//!
//! A [`NodeLedger`] owns one node's capacity, its current availability and
//! the pods running on it, ordered by finish time.  The ledger maintains
//!
//! ```text
//! available == capacity − Σ(requests of running pods)      (elementwise, ≥ 0)
//! ```
//!
//! and is only ever mutated through [`assign`](NodeLedger::assign) and
//! [`release_completed`](NodeLedger::release_completed).
//!
//! [`NodeQueue`] is an explicit binary heap of node indices ordered by a
//! comparator handed in at construction, normally [`earliest_free_first`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::resource::{ResourceVector, CPU_TOLERANCE};
use crate::scheduler::AdmissionReason;

// ── Running pod entries ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RunningPod {
    finish_time: f64,
    pod_id: u64,
    request: ResourceVector,
}

// Min-heap by (finish_time, pod_id)
impl PartialEq for RunningPod {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for RunningPod {}
impl PartialOrd for RunningPod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for RunningPod {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the soonest finish on top
        other
            .finish_time
            .total_cmp(&self.finish_time)
            .then(other.pod_id.cmp(&self.pod_id))
    }
}

// ── NodeLedger ────────────────────────────────────────────────────────────────

/// Resource bookkeeping for one simulated node.
#[derive(Debug, Clone)]
pub struct NodeLedger {
    name: String,
    capacity: ResourceVector,
    available: ResourceVector,
    running: BinaryHeap<RunningPod>,
    /// Latest instant the ledger has been brought forward to.
    advanced_to: f64,
}

impl NodeLedger {
    /// A fresh, idle node with `available == capacity`.
    pub fn new(name: impl Into<String>, capacity: ResourceVector) -> Self {
        Self {
            name: name.into(),
            capacity,
            available: capacity,
            running: BinaryHeap::new(),
            advanced_to: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> ResourceVector {
        self.capacity
    }

    pub fn available(&self) -> ResourceVector {
        self.available
    }

    /// Nodes without CPU capacity never take part in a simulation.
    pub fn is_active(&self) -> bool {
        self.capacity.cpu > 0.0
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Sum of the requests of every pod currently held by the ledger.
    pub fn in_use(&self) -> ResourceVector {
        self.running
            .iter()
            .fold(ResourceVector::ZERO, |acc, p| acc + p.request)
    }

    /// Fraction of CPU capacity currently allocated (`0.0` for a CPU-less node).
    pub fn cpu_load(&self) -> f64 {
        if self.capacity.cpu <= 0.0 {
            return 0.0;
        }
        (self.capacity.cpu - self.available.cpu) / self.capacity.cpu
    }

    /// Pop every running pod with `finish_time <= at` and return its resources
    /// to `available`.  Returns the number of pods released.
    pub fn release_completed(&mut self, at: f64) -> usize {
        self.advanced_to = self.advanced_to.max(at);
        let mut released = 0usize;
        while self
            .running
            .peek()
            .is_some_and(|p| p.finish_time <= at)
        {
            if let Some(pod) = self.running.pop() {
                self.available = self.available + pod.request;
                released += 1;
                debug!(
                    node   = %self.name,
                    pod_id = pod.pod_id,
                    finish = pod.finish_time,
                    at     = at,
                    "released completed pod"
                );
            }
        }
        released
    }

    /// Release everything finished by `at`, then check `request` against the
    /// remaining availability, reporting the first short dimension.
    pub fn check_admission(
        &mut self,
        request: &ResourceVector,
        at: f64,
    ) -> Result<(), AdmissionReason> {
        self.release_completed(at);

        let avail = &self.available;
        if request.cpu > avail.cpu + CPU_TOLERANCE {
            return Err(AdmissionReason::InsufficientCpu {
                required: request.cpu,
                available: avail.cpu,
            });
        }
        if request.gpu > avail.gpu {
            return Err(AdmissionReason::InsufficientGpu {
                required: request.gpu,
                available: avail.gpu,
            });
        }
        if request.memory_mb > avail.memory_mb {
            return Err(AdmissionReason::InsufficientMemory {
                required_mb: request.memory_mb,
                available_mb: avail.memory_mb,
            });
        }
        Ok(())
    }

    /// `true` iff `request` fits into what is available at `at`.
    pub fn can_admit(&mut self, request: &ResourceVector, at: f64) -> bool {
        self.check_admission(request, at).is_ok()
    }

    /// Start pod `pod_id` at `start_time` and return its finish time.
    ///
    /// # Errors
    /// Returns the [`AdmissionReason`] if the pod does not fit at
    /// `start_time`; resources are left untouched in that case.
    pub fn assign(
        &mut self,
        pod_id: u64,
        processing_time: f64,
        request: ResourceVector,
        start_time: f64,
    ) -> Result<f64, AdmissionReason> {
        self.check_admission(&request, start_time)?;

        let finish_time = start_time + processing_time;
        self.available = self.available - request;
        self.running.push(RunningPod {
            finish_time,
            pod_id,
            request,
        });
        Ok(finish_time)
    }

    /// Finish time of the soonest-completing running pod, or `0.0` when idle.
    pub fn earliest_free(&self) -> f64 {
        self.running.peek().map_or(0.0, |p| p.finish_time)
    }

    /// Latest instant passed to [`release_completed`](Self::release_completed).
    ///
    /// Pods that finished by then are gone from the ledger, so its
    /// availability says nothing about earlier instants.
    pub fn advanced_to(&self) -> f64 {
        self.advanced_to
    }

    /// Soonest finish time strictly after `t`, if any pod is still running
    /// past that instant.
    pub fn next_completion_after(&self, t: f64) -> Option<f64> {
        self.running
            .iter()
            .map(|p| p.finish_time)
            .filter(|&f| f > t)
            .min_by(f64::total_cmp)
    }
}

// ── Node ordering ─────────────────────────────────────────────────────────────

/// Signature of a node priority comparator.  `Less` means "try first".
pub type NodeComparator = fn(&NodeLedger, &NodeLedger) -> Ordering;

/// Earliest [`earliest_free`](NodeLedger::earliest_free) first; among nodes
/// freeing at the same instant, the one with more available CPU first.
pub fn earliest_free_first(a: &NodeLedger, b: &NodeLedger) -> Ordering {
    a.earliest_free()
        .total_cmp(&b.earliest_free())
        .then_with(|| b.available.cpu.total_cmp(&a.available.cpu))
}

// ── NodeQueue ─────────────────────────────────────────────────────────────────

/// Binary min-heap of indices into a node slice.
///
/// The heap does not own the ledgers: every operation borrows the slice so
/// the caller can mutate a popped node before pushing it back.  Nodes must not
/// be mutated while they sit inside the queue.  Exact comparator ties fall
/// back to the node index, so the pop order is a total order.
#[derive(Debug, Clone)]
pub struct NodeQueue {
    heap: Vec<usize>,
    cmp: NodeComparator,
}

impl NodeQueue {
    pub fn new(cmp: NodeComparator) -> Self {
        Self {
            heap: Vec::new(),
            cmp,
        }
    }

    /// Build a queue holding `indices`.
    pub fn with_nodes(
        nodes: &[NodeLedger],
        indices: impl IntoIterator<Item = usize>,
        cmp: NodeComparator,
    ) -> Self {
        let mut queue = Self::new(cmp);
        for idx in indices {
            queue.push(idx, nodes);
        }
        queue
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn push(&mut self, idx: usize, nodes: &[NodeLedger]) {
        self.heap.push(idx);
        self.sift_up(self.heap.len() - 1, nodes);
    }

    pub fn pop(&mut self, nodes: &[NodeLedger]) -> Option<usize> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let top = self.heap.pop();
        if !self.heap.is_empty() {
            self.sift_down(0, nodes);
        }
        top
    }

    fn before(&self, a: usize, b: usize, nodes: &[NodeLedger]) -> bool {
        (self.cmp)(&nodes[a], &nodes[b]).then(a.cmp(&b)) == Ordering::Less
    }

    fn sift_up(&mut self, mut pos: usize, nodes: &[NodeLedger]) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.before(self.heap[pos], self.heap[parent], nodes) {
                self.heap.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize, nodes: &[NodeLedger]) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut best = pos;
            if left < len && self.before(self.heap[left], self.heap[best], nodes) {
                best = left;
            }
            if right < len && self.before(self.heap[right], self.heap[best], nodes) {
                best = right;
            }
            if best == pos {
                break;
            }
            self.heap.swap(pos, best);
            pos = best;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, cpu: f64) -> NodeLedger {
        NodeLedger::new(name, ResourceVector::new(cpu, 1, 4096))
    }

    fn assert_ledger_consistent(n: &NodeLedger) {
        let total = n.in_use() + n.available();
        assert!(
            (total.cpu - n.capacity().cpu).abs() < 1e-9
                && total.gpu == n.capacity().gpu
                && total.memory_mb == n.capacity().memory_mb,
            "in_use + available must equal capacity on {}: {} vs {}",
            n.name(),
            total,
            n.capacity()
        );
    }

    // ── Assign / release ──────────────────────────────────────────────────────

    #[test]
    fn assign_deducts_resources_and_returns_finish_time() {
        let mut n = node("n1", 2.0);
        let finish = n
            .assign(1, 30.0, ResourceVector::new(1.5, 1, 1024), 10.0)
            .unwrap();
        assert_eq!(finish, 40.0);
        assert_eq!(n.available(), ResourceVector::new(0.5, 0, 3072));
        assert_eq!(n.running_count(), 1);
        assert_ledger_consistent(&n);
    }

    #[test]
    fn assign_rejects_infeasible_pod_without_touching_state() {
        let mut n = node("n1", 1.0);
        let err = n
            .assign(1, 30.0, ResourceVector::cpu(2.0), 0.0)
            .unwrap_err();
        assert!(matches!(err, AdmissionReason::InsufficientCpu { .. }));
        assert_eq!(n.available(), n.capacity());
        assert_eq!(n.running_count(), 0);
    }

    #[test]
    fn release_completed_restores_resources_up_to_time() {
        let mut n = node("n1", 2.0);
        n.assign(1, 30.0, ResourceVector::cpu(1.0), 0.0).unwrap();
        n.assign(2, 60.0, ResourceVector::cpu(1.0), 0.0).unwrap();

        assert_eq!(n.release_completed(29.9), 0);
        assert_eq!(n.release_completed(30.0), 1, "finish == t is released");
        assert_eq!(n.available().cpu, 1.0);
        assert_ledger_consistent(&n);

        assert_eq!(n.release_completed(100.0), 1);
        assert_eq!(n.available(), n.capacity());
    }

    #[test]
    fn can_admit_releases_before_checking() {
        let mut n = node("n1", 1.0);
        n.assign(1, 30.0, ResourceVector::cpu(1.0), 0.0).unwrap();
        assert!(!n.can_admit(&ResourceVector::cpu(1.0), 10.0));
        assert!(n.can_admit(&ResourceVector::cpu(1.0), 30.0));
        assert_eq!(n.running_count(), 0);
    }

    #[test]
    fn admission_reports_each_dimension() {
        let mut n = NodeLedger::new("n1", ResourceVector::new(4.0, 0, 1024));
        assert!(matches!(
            n.check_admission(&ResourceVector::new(1.0, 1, 0), 0.0),
            Err(AdmissionReason::InsufficientGpu { required: 1, available: 0 })
        ));
        assert!(matches!(
            n.check_admission(&ResourceVector::new(1.0, 0, 2048), 0.0),
            Err(AdmissionReason::InsufficientMemory { .. })
        ));
        assert!(n.check_admission(&ResourceVector::new(4.0, 0, 1024), 0.0).is_ok());
    }

    #[test]
    fn ledger_stays_consistent_through_a_busy_sequence() {
        let mut n = NodeLedger::new("n1", ResourceVector::new(3.0, 2, 3000));
        let reqs = [
            ResourceVector::new(1.0, 1, 1000),
            ResourceVector::new(0.5, 0, 500),
            ResourceVector::new(1.5, 1, 1500),
        ];
        for (i, r) in reqs.iter().enumerate() {
            n.assign(i as u64, 10.0 * (i as f64 + 1.0), *r, 0.0).unwrap();
            assert_ledger_consistent(&n);
        }
        for t in [5.0, 10.0, 20.0, 30.0] {
            n.release_completed(t);
            assert_ledger_consistent(&n);
        }
        assert_eq!(n.available(), n.capacity());
    }

    // ── Free-time queries ─────────────────────────────────────────────────────

    #[test]
    fn earliest_free_is_zero_when_idle() {
        assert_eq!(node("n1", 1.0).earliest_free(), 0.0);
    }

    #[test]
    fn earliest_free_tracks_soonest_finish() {
        let mut n = node("n1", 4.0);
        n.assign(1, 90.0, ResourceVector::cpu(1.0), 0.0).unwrap();
        n.assign(2, 30.0, ResourceVector::cpu(1.0), 0.0).unwrap();
        assert_eq!(n.earliest_free(), 30.0);
        assert_eq!(n.next_completion_after(30.0), Some(90.0));
        assert_eq!(n.next_completion_after(90.0), None);
    }

    #[test]
    fn release_moves_the_watermark_forward_only() {
        let mut n = node("n1", 1.0);
        n.assign(1, 30.0, ResourceVector::cpu(1.0), 0.0).unwrap();
        assert!(!n.can_admit(&ResourceVector::cpu(2.0), 30.0));
        assert_eq!(n.advanced_to(), 30.0);
        assert_eq!(n.earliest_free(), 0.0, "idle after release");
        n.release_completed(10.0);
        assert_eq!(n.advanced_to(), 30.0);
    }

    #[test]
    fn zero_cpu_node_is_inactive() {
        assert!(!node("n0", 0.0).is_active());
        assert!(node("n1", 0.5).is_active());
    }

    // ── Comparator / queue ────────────────────────────────────────────────────

    #[test]
    fn comparator_prefers_earlier_free_time() {
        let mut busy = node("busy", 4.0);
        busy.assign(1, 30.0, ResourceVector::cpu(1.0), 0.0).unwrap();
        let idle = node("idle", 1.0);
        assert_eq!(earliest_free_first(&idle, &busy), Ordering::Less);
    }

    #[test]
    fn comparator_breaks_ties_by_available_cpu_descending() {
        let small = node("small", 1.0);
        let big = node("big", 8.0);
        assert_eq!(earliest_free_first(&big, &small), Ordering::Less);
    }

    #[test]
    fn queue_pops_in_comparator_order() {
        let mut nodes = vec![node("a", 1.0), node("b", 8.0), node("c", 4.0)];
        nodes[1].assign(1, 50.0, ResourceVector::cpu(1.0), 0.0).unwrap();

        let mut q = NodeQueue::with_nodes(&nodes, 0..nodes.len(), earliest_free_first);
        assert_eq!(q.len(), 3);
        // c (free at 0, 4 cpu), a (free at 0, 1 cpu), b (free at 50)
        assert_eq!(q.pop(&nodes), Some(2));
        assert_eq!(q.pop(&nodes), Some(0));
        assert_eq!(q.pop(&nodes), Some(1));
        assert_eq!(q.pop(&nodes), None);
        assert!(q.is_empty());
    }

    #[test]
    fn queue_breaks_exact_ties_by_index() {
        let nodes = vec![node("x", 2.0), node("y", 2.0), node("z", 2.0)];
        let mut q = NodeQueue::with_nodes(&nodes, [2, 0, 1], earliest_free_first);
        assert_eq!(q.pop(&nodes), Some(0));
        assert_eq!(q.pop(&nodes), Some(1));
        assert_eq!(q.pop(&nodes), Some(2));
    }

    #[test]
    fn queue_reorders_after_mutation_and_push() {
        let mut nodes = vec![node("a", 2.0), node("b", 2.0)];
        let mut q = NodeQueue::with_nodes(&nodes, 0..2, earliest_free_first);

        let first = q.pop(&nodes).unwrap();
        assert_eq!(first, 0);
        nodes[first]
            .assign(1, 30.0, ResourceVector::cpu(1.0), 0.0)
            .unwrap();
        q.push(first, &nodes);

        assert_eq!(q.pop(&nodes), Some(1), "idle node b now comes first");
    }
}
