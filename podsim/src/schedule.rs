/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulation output: one [`ScheduleRecord`] per placed pod plus the derived
//! metrics (makespan, per-job completion time, JCT statistics).
//!
//! Records are appended once by the engine and never mutated afterwards.
//! All times are seconds from the start of the simulation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::resource::ResourceVector;
use crate::workload::PodTask;

// ── ScheduleRecord ────────────────────────────────────────────────────────────

/// Where and when one pod ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRecord {
    pub pod_name: String,
    pub job_name: String,
    pub submit_time: f64,
    /// Pods are created the moment their job is submitted.
    pub create_time: f64,
    pub start_time: f64,
    pub end_time: f64,
    /// `create_time − submit_time`
    pub wait_create: f64,
    /// `start_time − create_time`
    pub wait_run: f64,
    /// `start_time − submit_time`
    pub wait_total: f64,
    /// `end_time − start_time`
    pub running_time: f64,
    /// `end_time − submit_time`
    pub total_time: f64,
    pub node_name: String,
    pub requests: ResourceVector,
    pub limits: ResourceVector,
}

impl ScheduleRecord {
    pub fn new(pod: &PodTask, node_name: &str, start_time: f64, end_time: f64) -> Self {
        let create_time = pod.submit_time;
        Self {
            pod_name: pod.name.clone(),
            job_name: pod.job_name.clone(),
            submit_time: pod.submit_time,
            create_time,
            start_time,
            end_time,
            wait_create: create_time - pod.submit_time,
            wait_run: start_time - create_time,
            wait_total: start_time - pod.submit_time,
            running_time: end_time - start_time,
            total_time: end_time - pod.submit_time,
            node_name: node_name.to_string(),
            requests: pod.requests,
            limits: pod.limits,
        }
    }

    /// `true` if the pod holds its node's resources at instant `t`.
    pub fn is_running_at(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time
    }
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// Append-only list of records in placement order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schedule {
    records: Vec<ScheduleRecord>,
    makespan: f64,
}

/// Job completion time statistics of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JctSummary {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub makespan: f64,
    pub jobs: usize,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: ScheduleRecord) {
        self.makespan = self.makespan.max(record.end_time);
        self.records.push(record);
    }

    pub fn records(&self) -> &[ScheduleRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Latest end time over all records (`0.0` for an empty schedule).
    pub fn makespan(&self) -> f64 {
        self.makespan
    }

    /// Job name → latest end time of its pods.
    pub fn job_completion_times(&self) -> BTreeMap<String, f64> {
        let mut jct: BTreeMap<String, f64> = BTreeMap::new();
        for r in &self.records {
            jct.entry(r.job_name.clone())
                .and_modify(|t| *t = t.max(r.end_time))
                .or_insert(r.end_time);
        }
        jct
    }

    /// `None` when nothing was scheduled.
    pub fn jct_summary(&self) -> Option<JctSummary> {
        let jct = self.job_completion_times();
        if jct.is_empty() {
            return None;
        }
        let times: Vec<f64> = jct.into_values().collect();
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(JctSummary {
            mean: times.iter().sum::<f64>() / times.len() as f64,
            min,
            max,
            makespan: self.makespan,
            jobs: times.len(),
        })
    }

    /// Records sorted by job name, then pod name.
    pub fn sorted_for_presentation(&self) -> Vec<&ScheduleRecord> {
        let mut rows: Vec<&ScheduleRecord> = self.records.iter().collect();
        rows.sort_by(|a, b| {
            a.job_name
                .cmp(&b.job_name)
                .then_with(|| a.pod_name.cmp(&b.pod_name))
        });
        rows
    }

    /// Records placed on `node`, in placement order.
    pub fn records_on<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a ScheduleRecord> {
        self.records.iter().filter(move |r| r.node_name == node)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
