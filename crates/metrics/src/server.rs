//! Metric client backed by the cluster's metrics-server.

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use kdash_core::{CachedResources, DataPoint, Metric, MetricError, ResourceSelector, CPU_USAGE};
use kdash_dataselect::{MetricClient, MetricPromises};
use kube::api::{Api, ListParams, ObjectMeta};
use kube::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::quantity::{parse_cpu_millis, parse_memory_bytes};
use crate::{is_supported, resolve_pods, sum_pod_series, PodRef};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub cpu: String,
    pub memory: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    pub usage: ContainerUsage,
}

/// `metrics.k8s.io/v1beta1` PodMetrics, which k8s-openapi does not ship.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodMetrics {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub containers: Vec<ContainerMetrics>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub window: String,
}

impl k8s_openapi::Resource for PodMetrics {
    const GROUP: &'static str = "metrics.k8s.io";
    const KIND: &'static str = "PodMetrics";
    const VERSION: &'static str = "v1beta1";
    const API_VERSION: &'static str = "metrics.k8s.io/v1beta1";
    const URL_PATH_SEGMENT: &'static str = "pods";
    type Scope = k8s_openapi::NamespaceResourceScope;
}

impl k8s_openapi::Metadata for PodMetrics {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty { &self.metadata }

    fn metadata_mut(&mut self) -> &mut Self::Ty { &mut self.metadata }
}

impl PodMetrics {
    /// Single point for `metric_name`: x is the sample time in Unix seconds,
    /// y the sum over containers (millicores or bytes). Unparsable
    /// quantities count as zero.
    pub fn data_point(&self, metric_name: &str) -> DataPoint {
        let x = chrono::DateTime::parse_from_rfc3339(&self.timestamp).map(|t| t.timestamp()).unwrap_or(0);
        let y: u64 = self
            .containers
            .iter()
            .map(|c| {
                let parsed = if metric_name == CPU_USAGE {
                    parse_cpu_millis(&c.usage.cpu)
                } else {
                    parse_memory_bytes(&c.usage.memory)
                };
                parsed.unwrap_or_else(|e| {
                    debug!(container = %c.name, error = %e, "metrics: skipping quantity");
                    0
                })
            })
            .sum();
        DataPoint { x, y: i64::try_from(y).unwrap_or(i64::MAX) }
    }
}

type UsageByPod = HashMap<(String, String), Vec<DataPoint>>;

/// Reads current usage from metrics-server. Each download lists PodMetrics
/// once per namespace involved and is bounded by `timeout`.
#[derive(Clone)]
pub struct MetricsServerClient {
    client: Client,
    timeout: Duration,
}

impl MetricsServerClient {
    pub fn new(client: Client, timeout: Duration) -> Self { Self { client, timeout } }
}

async fn fetch_usage(client: Client, namespaces: BTreeSet<String>, metric_name: &str) -> Result<UsageByPod> {
    let mut out = UsageByPod::new();
    for ns in namespaces {
        let api: Api<PodMetrics> = Api::namespaced(client.clone(), &ns);
        let list = api
            .list(&ListParams::default())
            .await
            .with_context(|| format!("listing pod metrics in {}", ns))?;
        for pm in list.items {
            let name = pm.metadata.name.clone().unwrap_or_default();
            out.entry((ns.clone(), name)).or_default().push(pm.data_point(metric_name));
        }
    }
    Ok(out)
}

fn build_metrics(plans: &[(Vec<PodRef>, kdash_core::Label)], usage: &UsageByPod, metric_name: &str) -> Vec<Metric> {
    plans
        .iter()
        .map(|(pods, label)| {
            let points = sum_pod_series(pods, |p| usage.get(&(p.namespace.clone(), p.name.clone())).map(|v| v.as_slice()));
            Metric::new(metric_name, points).with_label(label.clone())
        })
        .collect()
}

impl MetricClient for MetricsServerClient {
    fn download_metric(
        &self,
        selectors: &[ResourceSelector],
        metric_name: &str,
        cached: &CachedResources,
    ) -> MetricPromises {
        let (resolvers, promises) = MetricPromises::new(selectors.len());
        if !is_supported(metric_name) {
            warn!(metric = %metric_name, "metrics: unsupported metric");
            resolvers.put_metrics(Err(MetricError::Unsupported(metric_name.to_string())));
            return promises;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(metric = %metric_name, "metrics: no tokio runtime; cannot download");
            resolvers.put_metrics(Err(MetricError::NoRuntime));
            return promises;
        };
        let plans: Vec<_> = selectors.iter().map(|s| resolve_pods(s, cached)).collect();
        let namespaces: BTreeSet<String> =
            plans.iter().flat_map(|(pods, _)| pods.iter().map(|p| p.namespace.clone())).collect();
        let client = self.client.clone();
        let timeout = self.timeout;
        let name = metric_name.to_string();
        handle.spawn(async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, fetch_usage(client, namespaces, &name)).await {
                Ok(Ok(usage)) => Ok(build_metrics(&plans, &usage, &name)),
                Ok(Err(e)) => Err(MetricError::Download(format!("{:#}", e))),
                Err(_) => Err(MetricError::Timeout(timeout.as_secs())),
            };
            match &result {
                Ok(metrics) => {
                    info!(metric = %name, count = metrics.len(), took_ms = %started.elapsed().as_millis(), "metrics: downloaded");
                }
                Err(e) => {
                    metrics::counter!("metric_download_errors_total", 1u64, "metric" => name.clone());
                    warn!(metric = %name, error = %e, "metrics: download failed");
                }
            }
            resolvers.put_metrics(result);
        });
        promises
    }
}
