//! Job and node definition loading.
//!
//! Two YAML documents feed a simulation.  The node file lists the cluster:
//! ```yaml
//! cluster:
//!   - metadata:
//!       name: node01
//!     spec:
//!       unschedulable: false
//!     status:
//!       allocatable:
//!         cpu: "4"
//!         memory: 8Gi
//!         nvidia.com/gpu: "1"
//! ```
//!
//! The workload file lists Volcano-style jobs:
//! ```yaml
//! jobs:
//!   - metadata:
//!       name: train
//!       namespace: ml
//!       labels:
//!         sub-time: "30"
//!     spec:
//!       tasks:
//!         - name: worker
//!           replicas: 2
//!           template:
//!             spec:
//!               containers:
//!                 - command: ["python", "train.py", "--epochs=5"]
//!                   resources:
//!                     requests: { cpu: 500m, memory: 1Gi }
//!                     limits:   { cpu: "1", memory: 2Gi }
//! ```
//!
//! Unknown keys (`apiVersion`, `kind`, schedulerName, …) are ignored and every
//! field this crate reads has a default, so partial definitions load fine.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::node::NodeLedger;
use crate::resource::{vector_from_quantities, Quantity, ResourceVector};

/// Label carrying a job's submit time in seconds.
pub const SUBMIT_TIME_LABEL: &str = "sub-time";

fn default_namespace() -> String {
    String::from("default")
}

fn default_replicas() -> u32 {
    1
}

// ── Resource lists ────────────────────────────────────────────────────────────

/// `requests`, `limits` or `allocatable` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ResourceList {
    #[serde(default)]
    pub cpu: Option<Quantity>,
    #[serde(default)]
    pub memory: Option<Quantity>,
    #[serde(default, rename = "nvidia.com/gpu")]
    pub gpu: Option<Quantity>,
}

impl ResourceList {
    /// Lenient conversion; `owner` is only used in diagnostics.
    pub fn to_vector(&self, owner: &str) -> ResourceVector {
        vector_from_quantities(
            self.cpu.as_ref(),
            self.gpu.as_ref(),
            self.memory.as_ref(),
            owner,
        )
    }
}

// ── Job definitions ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobDefinition {
    #[serde(default)]
    pub metadata: JobMetadata,
    #[serde(default)]
    pub spec: Option<JobSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub labels: BTreeMap<String, serde_yaml::Value>,
}

impl Default for JobMetadata {
    fn default() -> Self {
        Self {
            name: None,
            namespace: default_namespace(),
            labels: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JobSpec {
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskDefinition {
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub template: PodTemplate,
}

impl Default for TaskDefinition {
    fn default() -> Self {
        Self {
            replicas: default_replicas(),
            name: None,
            template: PodTemplate::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PodTemplate {
    #[serde(default)]
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<ContainerDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContainerDefinition {
    /// Non-string tokens are kept so the document still loads; only strings
    /// are inspected by the estimator.
    #[serde(default)]
    pub command: Vec<serde_yaml::Value>,
    #[serde(default)]
    pub resources: ResourceRequirements,
}

impl ContainerDefinition {
    pub fn command_tokens(&self) -> impl Iterator<Item = &str> {
        self.command.iter().filter_map(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResourceRequirements {
    #[serde(default)]
    pub requests: ResourceList,
    #[serde(default)]
    pub limits: ResourceList,
}

impl JobDefinition {
    /// `metadata.name`, or `job-{index}` when absent.
    pub fn name_or(&self, index: usize) -> String {
        self.metadata
            .name
            .clone()
            .unwrap_or_else(|| format!("job-{index}"))
    }

    /// Submit time from the `sub-time` label.  Missing → `0`; unparsable →
    /// `0` with a warning.
    pub fn submit_time(&self) -> f64 {
        let Some(raw) = self.metadata.labels.get(SUBMIT_TIME_LABEL) else {
            return 0.0;
        };
        let parsed = match raw {
            serde_yaml::Value::Number(n) => n.as_f64(),
            serde_yaml::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(t) if t.is_finite() && t >= 0.0 => t,
            _ => {
                warn!(
                    job = ?self.metadata.name,
                    raw = ?raw,
                    "malformed sub-time label, submitting at t=0"
                );
                0.0
            }
        }
    }

    pub fn tasks(&self) -> &[TaskDefinition] {
        self.spec
            .as_ref()
            .map(|s| s.tasks.as_slice())
            .unwrap_or(&[])
    }
}

impl TaskDefinition {
    /// The first container of the pod template, which carries the pod's
    /// resources and command.
    pub fn container(&self) -> Option<&ContainerDefinition> {
        self.template.spec.containers.first()
    }
}

// ── Node definitions ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeDefinition {
    #[serde(default)]
    pub metadata: NodeMetadata,
    #[serde(default)]
    pub spec: NodeSpec,
    #[serde(default)]
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeMetadata {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeSpec {
    #[serde(default)]
    pub unschedulable: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeStatus {
    #[serde(default)]
    pub allocatable: ResourceList,
}

impl NodeDefinition {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("unknown")
    }

    /// Fresh ledger with `allocatable` as capacity.
    pub fn to_ledger(&self) -> NodeLedger {
        let name = self.name();
        NodeLedger::new(name, self.status.allocatable.to_vector(name))
    }
}

// ── Documents ─────────────────────────────────────────────────────────────────

/// Node file: `cluster: [NodeDefinition...]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClusterDefinition {
    #[serde(default)]
    pub cluster: Vec<NodeDefinition>,
}

impl ClusterDefinition {
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading cluster definition from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open node file: {}", path.display()))?;
        let doc = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        info!("Loaded {} node definition(s)", doc.cluster.len());
        Ok(doc)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Ledgers for every node not marked `unschedulable`, in file order.
    pub fn schedulable_nodes(&self) -> Vec<NodeLedger> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut ledgers = Vec::with_capacity(self.cluster.len());

        for def in &self.cluster {
            if def.spec.unschedulable {
                info!(node = %def.name(), "skipping unschedulable node");
                continue;
            }
            if !seen.insert(def.name()) {
                warn!(node = %def.name(), "duplicate node name in cluster definition");
            }
            let ledger = def.to_ledger();
            debug!(
                "  Node: {} | CPU: {} | GPU: {} | Memory: {}MB",
                ledger.name(),
                ledger.capacity().cpu,
                ledger.capacity().gpu,
                ledger.capacity().memory_mb,
            );
            ledgers.push(ledger);
        }
        ledgers
    }
}

/// Workload file: `jobs: [JobDefinition...]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WorkloadDefinition {
    #[serde(default)]
    pub jobs: Vec<JobDefinition>,
}

impl WorkloadDefinition {
    /// # Errors
    /// Returns an error if the file cannot be opened or if the YAML is
    /// structurally invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading workload definition from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open workload file: {}", path.display()))?;
        let doc = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        if doc.jobs.is_empty() {
            warn!("Workload file contains no jobs");
        }
        info!("Loaded {} job definition(s)", doc.jobs.len());
        Ok(doc)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    const NODES_YAML: &str = r#"
cluster:
  - metadata:
      name: node01
    status:
      allocatable:
        cpu: "4"
        memory: 8Gi
        nvidia.com/gpu: "1"
  - metadata:
      name: node02
    spec:
      unschedulable: true
    status:
      allocatable:
        cpu: 8
        memory: 16384Mi
  - metadata:
      name: node03
    status:
      allocatable:
        cpu: 2500m
        memory: 4096Mi
"#;

    const JOBS_YAML: &str = r#"
jobs:
  - apiVersion: batch.volcano.sh/v1alpha1
    kind: Job
    metadata:
      name: train
      namespace: ml
      labels:
        sub-time: "30"
    spec:
      schedulerName: volcano
      tasks:
        - name: worker
          replicas: 2
          template:
            spec:
              containers:
                - image: trainer:latest
                  command: ["python", "train.py", "--epochs=5"]
                  resources:
                    requests: { cpu: 500m, memory: 1Gi, nvidia.com/gpu: 1 }
                    limits:   { cpu: "1", memory: 2Gi, nvidia.com/gpu: 1 }
  - metadata:
      name: etl
    spec:
      tasks:
        - template:
            spec:
              containers:
                - resources:
                    requests: { cpu: 1 }
"#;

    // ── ClusterDefinition ─────────────────────────────────────────────────────

    #[test]
    fn load_cluster_yaml() {
        let f = yaml_tempfile(NODES_YAML);
        let doc = ClusterDefinition::load_from_file(f.path()).unwrap();
        assert_eq!(doc.cluster.len(), 3);
        assert_eq!(doc.cluster[0].name(), "node01");
        assert!(doc.cluster[1].spec.unschedulable);
    }

    #[test]
    fn schedulable_nodes_drops_unschedulable_and_keeps_order() {
        let doc = ClusterDefinition::from_yaml_str(NODES_YAML).unwrap();
        let nodes = doc.schedulable_nodes();
        let names: Vec<&str> = nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["node01", "node03"]);

        assert_eq!(nodes[0].capacity(), ResourceVector::new(4.0, 1, 8192));
        assert_eq!(nodes[1].capacity(), ResourceVector::new(2.5, 0, 4096));
        assert_eq!(nodes[1].available(), nodes[1].capacity());
    }

    #[test]
    fn node_without_name_or_allocatable_gets_defaults() {
        let doc = ClusterDefinition::from_yaml_str("cluster:\n  - {}\n").unwrap();
        let nodes = doc.schedulable_nodes();
        assert_eq!(nodes[0].name(), "unknown");
        assert_eq!(nodes[0].capacity(), ResourceVector::ZERO);
        assert!(!nodes[0].is_active());
    }

    #[test]
    fn malformed_allocatable_is_lenient() {
        let yaml = r#"
cluster:
  - metadata: { name: odd }
    status:
      allocatable: { cpu: "many", memory: 2Gi }
"#;
        let nodes = ClusterDefinition::from_yaml_str(yaml)
            .unwrap()
            .schedulable_nodes();
        assert_eq!(nodes[0].capacity(), ResourceVector::new(0.0, 0, 2048));
    }

    #[test]
    fn missing_file_returns_error() {
        let result = ClusterDefinition::load_from_file(Path::new("/nonexistent/nodes.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("cluster: [this is: not: valid");
        assert!(ClusterDefinition::load_from_file(f.path()).is_err());
    }

    // ── WorkloadDefinition ────────────────────────────────────────────────────

    #[test]
    fn load_workload_yaml() {
        let f = yaml_tempfile(JOBS_YAML);
        let doc = WorkloadDefinition::load_from_file(f.path()).unwrap();
        assert_eq!(doc.jobs.len(), 2);

        let train = &doc.jobs[0];
        assert_eq!(train.name_or(0), "train");
        assert_eq!(train.metadata.namespace, "ml");
        assert_eq!(train.submit_time(), 30.0);

        let task = &train.tasks()[0];
        assert_eq!(task.replicas, 2);
        let container = task.container().unwrap();
        assert_eq!(
            container.command_tokens().collect::<Vec<_>>(),
            vec!["python", "train.py", "--epochs=5"]
        );
        assert_eq!(
            container.resources.requests.to_vector("train"),
            ResourceVector::new(0.5, 1, 1024)
        );
        assert_eq!(
            container.resources.limits.to_vector("train"),
            ResourceVector::new(1.0, 1, 2048)
        );
    }

    #[test]
    fn workload_defaults_apply() {
        let doc = WorkloadDefinition::from_yaml_str(JOBS_YAML).unwrap();
        let etl = &doc.jobs[1];
        assert_eq!(etl.metadata.namespace, "default");
        assert_eq!(etl.submit_time(), 0.0);
        assert_eq!(etl.tasks()[0].replicas, 1);
        assert_eq!(etl.tasks()[0].name, None);
    }

    #[test]
    fn unnamed_job_falls_back_to_index() {
        let job = JobDefinition::default();
        assert_eq!(job.name_or(3), "job-3");
        assert!(job.tasks().is_empty());
    }

    #[test]
    fn numeric_and_malformed_sub_time_labels() {
        let doc = WorkloadDefinition::from_yaml_str(
            r#"
jobs:
  - metadata: { name: a, labels: { sub-time: 12.5 } }
  - metadata: { name: b, labels: { sub-time: "soon" } }
"#,
        )
        .unwrap();
        assert_eq!(doc.jobs[0].submit_time(), 12.5);
        assert_eq!(doc.jobs[1].submit_time(), 0.0);
    }

    #[test]
    fn empty_workload_loads() {
        let doc = WorkloadDefinition::from_yaml_str("jobs: []\n").unwrap();
        assert!(doc.jobs.is_empty());
    }
}
