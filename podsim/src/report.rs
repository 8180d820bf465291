/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Human-readable and YAML rendering of simulation results.
//!
//! Times are seconds from the start of the simulation and are shown as
//! timestamps counted from `0001-01-01 00:00:00`.  Resources
//! are shown the way cluster manifests write them: `800m` / `2.0` CPU,
//! `1024Mi` memory.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::resource::ResourceVector;
use crate::schedule::ScheduleRecord;
use crate::scheduler::{HeuristicSummary, SimulationReport, SimulationStatus};

// ── Value formatting ──────────────────────────────────────────────────────────

/// `270.0` → `"0001-01-01 00:04:30"`.  Fractions of a second are dropped.
///
/// Falls back to plain seconds if the offset leaves chrono's date range.
pub fn format_clock(seconds: f64) -> String {
    let offset = Duration::milliseconds((seconds.max(0.0) * 1000.0) as i64);
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|epoch| epoch.checked_add_signed(offset))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{seconds:.0}s"))
}

/// `0` → `"0"`, `0.8` → `"800m"`, `2` → `"2.0"`.
pub fn format_cpu(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value > 0.0 && value < 1.0 {
        format!("{}m", (value * 1000.0) as u64)
    } else if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// `0` → `"0"`, otherwise `"{n}Mi"`.
pub fn format_memory(memory_mb: u64) -> String {
    if memory_mb == 0 {
        "0".to_string()
    } else {
        format!("{memory_mb}Mi")
    }
}

fn format_status(status: &SimulationStatus) -> String {
    match status {
        SimulationStatus::Completed => "completed".to_string(),
        SimulationStatus::Aborted(reason) => format!("aborted: {reason}"),
    }
}

fn heuristic_label(report: &SimulationReport) -> String {
    report
        .heuristic
        .map_or_else(|| "custom".to_string(), |h| h.to_string())
}

// ── Table ─────────────────────────────────────────────────────────────────────

const HEADERS: [&str; 18] = [
    "Pod_name",
    "Job_name",
    "Job_submit",
    "Pod_create",
    "Pod_start",
    "Pod_end",
    "Pod_wait_create",
    "Pod_wait_run",
    "Pod_wait_total",
    "Pod_running_time",
    "Pod_total_time",
    "Running node",
    "Requests_memory",
    "Limits_memory",
    "Requests_cpu",
    "Limits_cpu",
    "Requests_gpu",
    "Limits_gpu",
];

const JOB_HEADERS: [&str; 2] = ["Job Name", "Job Completed Time(s)"];

/// Columns 6..=10 hold durations and are right-aligned.
fn is_duration_column(col: usize) -> bool {
    (6..=10).contains(&col)
}

/// Bordered text grid; `right_aligned(col)` picks the alignment per column.
fn render_grid(
    headers: &[&str],
    rows: &[Vec<String>],
    right_aligned: fn(usize) -> bool,
) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let mut out = String::from("|");
        for (col, (cell, &w)) in cells.iter().zip(&widths).enumerate() {
            if right_aligned(col) {
                out.push_str(&format!(" {cell:>w$} |"));
            } else {
                out.push_str(&format!(" {cell:<w$} |"));
            }
        }
        out.push('\n');
        out
    };
    let rule = {
        let mut out = String::from("+");
        for &w in &widths {
            out.push_str(&"-".repeat(w + 2));
            out.push('+');
        }
        out.push('\n');
        out
    };

    let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut out = String::new();
    out.push_str(&rule);
    out.push_str(&line(&header));
    out.push_str(&rule);
    for row in rows {
        out.push_str(&line(row));
    }
    out.push_str(&rule);
    out
}

fn table_row(r: &ScheduleRecord) -> Vec<String> {
    vec![
        r.pod_name.clone(),
        r.job_name.clone(),
        format_clock(r.submit_time),
        format_clock(r.create_time),
        format_clock(r.start_time),
        format_clock(r.end_time),
        format!("{:.1}", r.wait_create),
        format!("{:.1}", r.wait_run),
        format!("{:.1}", r.wait_total),
        format!("{:.1}", r.running_time),
        format!("{:.1}", r.total_time),
        r.node_name.clone(),
        format_memory(r.requests.memory_mb),
        format_memory(r.limits.memory_mb),
        format_cpu(r.requests.cpu),
        format_cpu(r.limits.cpu),
        format_cpu(f64::from(r.requests.gpu)),
        format_cpu(f64::from(r.limits.gpu)),
    ]
}

/// Full text report: one row per pod (sorted by job, then pod), one row per
/// job with its completion time, makespan, job completion statistics and,
/// for aborted runs, the reason.
pub fn render_table(report: &SimulationReport) -> String {
    let rows: Vec<Vec<String>> = report
        .schedule
        .sorted_for_presentation()
        .into_iter()
        .map(table_row)
        .collect();
    let job_rows: Vec<Vec<String>> = report
        .schedule
        .job_completion_times()
        .into_iter()
        .map(|(job, done)| vec![job, format!("{done:.2}")])
        .collect();

    let mut out = String::new();
    out.push_str(&format!(
        "Heuristic: {}   ({} of {} pods scheduled)\n",
        heuristic_label(report),
        report.schedule.len(),
        report.total_pods
    ));
    out.push_str(&render_grid(&HEADERS, &rows, is_duration_column));
    out.push('\n');
    out.push_str(&render_grid(&JOB_HEADERS, &job_rows, |col| col == 1));

    out.push_str(&format!(
        "\nMakespan: {:.2} s\n",
        report.schedule.makespan()
    ));
    if let Some(jct) = report.schedule.jct_summary() {
        out.push_str(&format!(
            "Job completion time ({} jobs): mean {:.2} s, min {:.2} s, max {:.2} s\n",
            jct.jobs, jct.mean, jct.min, jct.max
        ));
    }
    if let SimulationStatus::Aborted(_) = report.status {
        out.push_str(&format!("Status: {}\n", format_status(&report.status)));
    }
    out
}

/// One line per heuristic.
pub fn render_comparison(rows: &[HeuristicSummary]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
        "Heuristic", "Scheduled", "Makespan", "Mean JCT", "Min JCT", "Max JCT"
    ));
    out.push_str(&format!("{}\n", "-".repeat(75)));

    for row in rows {
        let (mean, min, max) = row
            .jct
            .map_or((0.0, 0.0, 0.0), |j| (j.mean, j.min, j.max));
        let marker = if row.completed { "" } else { "  (aborted)" };
        out.push_str(&format!(
            "{:<10} {:>12} {:>12.2} {:>12.2} {:>12.2} {:>12.2}{}\n",
            row.heuristic.label(),
            format!("{}/{}", row.scheduled, row.total),
            row.makespan,
            mean,
            min,
            max,
            marker
        ));
    }
    out
}

// ── YAML ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ResourceView {
    cpu: String,
    memory: String,
    gpu: u32,
}

impl From<&ResourceVector> for ResourceView {
    fn from(r: &ResourceVector) -> Self {
        Self {
            cpu: format_cpu(r.cpu),
            memory: format_memory(r.memory_mb),
            gpu: r.gpu,
        }
    }
}

#[derive(Debug, Serialize)]
struct PodView<'a> {
    pod_name: &'a str,
    job_name: &'a str,
    job_submit: String,
    pod_create: String,
    pod_start: String,
    pod_end: String,
    pod_wait_create: f64,
    pod_wait_run: f64,
    pod_wait_total: f64,
    pod_running_time: f64,
    pod_total_time: f64,
    running_node: &'a str,
    requests: ResourceView,
    limits: ResourceView,
}

impl<'a> From<&'a ScheduleRecord> for PodView<'a> {
    fn from(r: &'a ScheduleRecord) -> Self {
        Self {
            pod_name: &r.pod_name,
            job_name: &r.job_name,
            job_submit: format_clock(r.submit_time),
            pod_create: format_clock(r.create_time),
            pod_start: format_clock(r.start_time),
            pod_end: format_clock(r.end_time),
            pod_wait_create: r.wait_create,
            pod_wait_run: r.wait_run,
            pod_wait_total: r.wait_total,
            pod_running_time: r.running_time,
            pod_total_time: r.total_time,
            running_node: &r.node_name,
            requests: ResourceView::from(&r.requests),
            limits: ResourceView::from(&r.limits),
        }
    }
}

/// Field order of this struct is the key order of the YAML document.
#[derive(Debug, Serialize)]
struct ReportView<'a> {
    heuristic: String,
    status: String,
    scheduled: usize,
    total: usize,
    makespan: f64,
    job_completion_times: BTreeMap<String, f64>,
    pods: Vec<PodView<'a>>,
}

/// YAML document of `report`, pods sorted by job, then pod.
pub fn render_yaml(report: &SimulationReport) -> Result<String, serde_yaml::Error> {
    let view = ReportView {
        heuristic: heuristic_label(report),
        status: format_status(&report.status),
        scheduled: report.schedule.len(),
        total: report.total_pods,
        makespan: report.schedule.makespan(),
        job_completion_times: report.schedule.job_completion_times(),
        pods: report
            .schedule
            .sorted_for_presentation()
            .into_iter()
            .map(PodView::from)
            .collect(),
    };
    serde_yaml::to_string(&view)
}

/// YAML list of comparison rows.
pub fn render_comparison_yaml(rows: &[HeuristicSummary]) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(rows)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
