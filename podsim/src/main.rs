/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use podsim::config::{ClusterDefinition, WorkloadDefinition};
use podsim::report::{render_comparison, render_comparison_yaml, render_table, render_yaml};
use podsim::scheduler::{compare_heuristics, simulate, Heuristic, SimulationStatus};
use podsim::workload::expand_jobs;

// ── CLI argument definition ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Yaml,
}

/// Offline pod placement simulator.
///
/// Example:
///   podsim --nodes demos/nodes.yaml --workload demos/jobs.yaml --heuristic ff
#[derive(Debug, Parser)]
#[command(
    name = "podsim",
    about = "Offline pod placement simulator for batch-job scheduling heuristics",
    long_about = None,
)]
struct Cli {
    /// YAML file with the cluster node list (`cluster:`).
    #[arg(short = 'n', long = "nodes")]
    nodes: PathBuf,

    /// YAML file with the job list (`jobs:`).
    #[arg(short = 'w', long = "workload")]
    workload: PathBuf,

    /// Placement heuristic: llmf, ff, bf, sjf or ljf.
    #[arg(short = 'H', long = "heuristic", default_value = "ljf")]
    heuristic: String,

    /// Run every heuristic and print a summary comparison instead.
    #[arg(short = 'c', long = "compare", default_value_t = false)]
    compare: bool,

    /// Output format.
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!(
        nodes     = %cli.nodes.display(),
        workload  = %cli.workload.display(),
        heuristic = %cli.heuristic,
        compare   = cli.compare,
        format    = ?cli.format,
        "Configuration"
    );

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when a simulation was aborted with pods pending.
fn run(cli: &Cli) -> Result<bool> {
    // ── Load definitions ──────────────────────────────────────────────────────
    let cluster = ClusterDefinition::load_from_file(&cli.nodes)?;
    let workload = WorkloadDefinition::load_from_file(&cli.workload)?;

    let nodes = cluster.schedulable_nodes();
    if nodes.is_empty() {
        warn!(nodes = %cli.nodes.display(), "no schedulable nodes found");
    }
    let pods = expand_jobs(&workload.jobs);

    // ── Compare mode ──────────────────────────────────────────────────────────
    if cli.compare {
        let rows = compare_heuristics(&pods, &nodes).context("heuristic comparison failed")?;
        match cli.format {
            OutputFormat::Table => print!("{}", render_comparison(&rows)),
            OutputFormat::Yaml => print!(
                "{}",
                render_comparison_yaml(&rows).context("failed to render comparison as YAML")?
            ),
        }
        return Ok(rows.iter().all(|r| r.completed));
    }

    // ── Single heuristic ──────────────────────────────────────────────────────
    let heuristic: Heuristic = cli.heuristic.parse()?;
    let report = simulate(&pods, &nodes, heuristic)
        .with_context(|| format!("simulation with {heuristic} failed"))?;

    match cli.format {
        OutputFormat::Table => print!("{}", render_table(&report)),
        OutputFormat::Yaml => print!(
            "{}",
            render_yaml(&report).context("failed to render schedule as YAML")?
        ),
    }

    if let SimulationStatus::Aborted(reason) = &report.status {
        warn!(
            reason    = %reason,
            scheduled = report.schedule.len(),
            total     = report.total_pods,
            "partial schedule printed"
        );
        return Ok(false);
    }
    Ok(true)
}
