/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! podsim – offline pod placement simulator
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── resource      – CPU / GPU / memory vector, quantity parsing
//! ├── node          – per-node resource ledger, node priority queue
//! ├── config/       – YAML job and node definitions
//! ├── workload      – job → pod expansion, processing-time estimate
//! ├── scheduler/    – placement heuristics and the simulation loop
//! ├── schedule      – schedule records, makespan, job completion times
//! └── report        – table / YAML rendering
//! ```

pub mod config;
pub mod node;
pub mod report;
pub mod resource;
pub mod schedule;
pub mod scheduler;
pub mod workload;
