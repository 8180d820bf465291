/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Workload expansion: job definitions → flat, globally ordered pod list.
//!
//! ```text
//! JobDefinition ──► TaskDefinition × replicas ──► PodTask { id, name, … }
//!   (input order)     (input order, 0..N−1)         id = 1, 2, 3, …
//! ```
//!
//! Every [`PodTask`] carries the processing time produced by
//! [`estimate_processing_time`], so later stages never look at the raw
//! definitions again.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::JobDefinition;
use crate::resource::ResourceVector;

// ── Estimator constants ───────────────────────────────────────────────────────

/// Epoch count assumed when a container's command has no `--epochs=N` token.
pub const DEFAULT_EPOCHS: i64 = 7;

pub const SECONDS_PER_EPOCH: f64 = 30.0;
pub const SECONDS_PER_CPU: f64 = 10.0;
pub const SECONDS_PER_GPU: f64 = 20.0;

/// No pod runs for less than this many seconds.
pub const MIN_PROCESSING_TIME: f64 = 30.0;

const EPOCHS_FLAG: &str = "--epochs=";

// ── Processing-time estimator ─────────────────────────────────────────────────

/// Epoch count from a container command.  The last well-formed
/// `--epochs=N` token wins; unparsable values are ignored.
pub fn epochs_from_command<'a>(command: impl IntoIterator<Item = &'a str>) -> i64 {
    let mut epochs = DEFAULT_EPOCHS;
    for token in command {
        if !token.contains(EPOCHS_FLAG) {
            continue;
        }
        let value = token.rsplit('=').next().unwrap_or_default();
        match value.trim().parse::<i64>() {
            Ok(n) => epochs = n,
            Err(_) => debug!(token = %token, "ignoring unparsable epochs argument"),
        }
    }
    epochs
}

/// Estimated run time of one pod in seconds.
///
/// `epochs × 30 + cpu × 10 + gpu × 20`, never below [`MIN_PROCESSING_TIME`].
pub fn estimate_processing_time<'a>(
    requests: &ResourceVector,
    command: impl IntoIterator<Item = &'a str>,
) -> f64 {
    let epochs = epochs_from_command(command) as f64;
    let time = epochs * SECONDS_PER_EPOCH
        + requests.cpu * SECONDS_PER_CPU
        + f64::from(requests.gpu) * SECONDS_PER_GPU;
    time.max(MIN_PROCESSING_TIME)
}

// ── PodTask ───────────────────────────────────────────────────────────────────

/// One schedulable replica.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodTask {
    /// Global position in expansion order, starting at 1.
    pub id: u64,
    /// `{namespace}-{job}-{task}-{replica}`.
    pub name: String,
    pub job_name: String,
    pub task_name: String,
    pub replica: u32,
    pub submit_time: f64,
    pub processing_time: f64,
    pub requests: ResourceVector,
    pub limits: ResourceVector,
}

// ── Expansion ─────────────────────────────────────────────────────────────────

/// Expand `jobs` into pods: jobs in input order, tasks in input order,
/// replicas `0..replicas`.
///
/// Jobs without tasks and tasks without a container contribute no pods.
pub fn expand_jobs(jobs: &[JobDefinition]) -> Vec<PodTask> {
    let mut pods = Vec::new();
    let mut next_id: u64 = 0;

    for (job_idx, job) in jobs.iter().enumerate() {
        let job_name = job.name_or(job_idx);
        let namespace = &job.metadata.namespace;
        let submit_time = job.submit_time();

        if job.tasks().is_empty() {
            warn!(job = %job_name, "job has no tasks, nothing to schedule");
            continue;
        }

        for (task_idx, task) in job.tasks().iter().enumerate() {
            let Some(container) = task.container() else {
                warn!(
                    job  = %job_name,
                    task = task_idx,
                    "task has no container, skipping"
                );
                continue;
            };

            let owner = format!("{job_name}/{}", task.name.as_deref().unwrap_or("task"));
            let requests = container.resources.requests.to_vector(&owner);
            let limits = container.resources.limits.to_vector(&owner);
            let processing_time = estimate_processing_time(&requests, container.command_tokens());

            let pod_task_name = task.name.as_deref().unwrap_or("task");
            for replica in 0..task.replicas {
                next_id += 1;
                pods.push(PodTask {
                    id: next_id,
                    name: format!("{namespace}-{job_name}-{pod_task_name}-{replica}"),
                    job_name: job_name.clone(),
                    task_name: task
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("task-{task_idx}")),
                    replica,
                    submit_time,
                    processing_time,
                    requests,
                    limits,
                });
            }

            debug!(
                job             = %job_name,
                task            = %pod_task_name,
                replicas        = task.replicas,
                processing_time = processing_time,
                requests        = %requests,
                "expanded task"
            );
        }
    }

    info!(
        job_count = jobs.len(),
        pod_count = pods.len(),
        "workload expanded"
    );
    pods
}

/// Total estimated size per job (`Σ processing_time` over its pods), in order
/// of first appearance.
pub fn job_sizes(pods: &[PodTask]) -> Vec<(String, f64)> {
    let mut sizes: Vec<(String, f64)> = Vec::new();
    for pod in pods {
        match sizes.iter_mut().find(|(name, _)| *name == pod.job_name) {
            Some((_, total)) => *total += pod.processing_time,
            None => sizes.push((pod.job_name.clone(), pod.processing_time)),
        }
    }
    sizes
}

// ── Tests ─────────────────────────────────────────────────────────────────────
