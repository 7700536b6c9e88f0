//! Resource kinds and selectors used to address metrics.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

/// Kubernetes resource kinds known to the dashboard backend, with their
/// lower-case wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pod,
    Deployment,
    ReplicaSet,
    ReplicationController,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
    Node,
    Namespace,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 10] = [
        Self::Pod,
        Self::Deployment,
        Self::ReplicaSet,
        Self::ReplicationController,
        Self::StatefulSet,
        Self::DaemonSet,
        Self::Job,
        Self::CronJob,
        Self::Node,
        Self::Namespace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Deployment => "deployment",
            Self::ReplicaSet => "replicaset",
            Self::ReplicationController => "replicationcontroller",
            Self::StatefulSet => "statefulset",
            Self::DaemonSet => "daemonset",
            Self::Job => "job",
            Self::CronJob => "cronjob",
            Self::Node => "node",
            Self::Namespace => "namespace",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        // accept plurals as typed on the command line ("deployments")
        let singular = lower.strip_suffix('s').unwrap_or(&lower);
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == lower || k.as_str() == singular)
            .ok_or_else(|| format!("unknown resource kind: {}", s))
    }
}

/// Everything a metric backend needs to find the metrics of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSelector {
    pub namespace: String,
    pub resource_type: ResourceKind,
    pub resource_name: String,
    /// Label selector (`matchLabels`) of workloads; `None` for pods and
    /// cluster-scoped kinds.
    pub selector: Option<BTreeMap<String, String>>,
    pub uid: String,
}

/// Objects the list assembler already fetched, handed to the metric client so
/// it does not need to list them again.
#[derive(Debug, Clone, Default)]
pub struct CachedResources {
    pub pods: Vec<Pod>,
}

impl CachedResources {
    pub fn with_pods(pods: Vec<Pod>) -> Self { Self { pods } }
}
