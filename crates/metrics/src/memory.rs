use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use kdash_core::{CachedResources, DataPoint, Metric, MetricError, ResourceSelector};
use kdash_dataselect::{MetricClient, MetricPromises};
use tracing::debug;

use crate::{is_supported, resolve_pods, sum_pod_series};

/// Serves recorded series keyed by (uid, metric name). Workloads without a
/// series of their own get the sum of their pods' series. Promises are
/// resolved before `download_metric` returns.
#[derive(Debug, Default)]
pub struct InMemoryMetricClient {
    series: HashMap<(String, String), Vec<DataPoint>>,
    downloads: AtomicUsize,
}

impl InMemoryMetricClient {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, uid: impl Into<String>, metric_name: impl Into<String>, points: Vec<DataPoint>) {
        self.series.insert((uid.into(), metric_name.into()), points);
    }

    pub fn with_series(mut self, uid: impl Into<String>, metric_name: impl Into<String>, points: Vec<DataPoint>) -> Self {
        self.insert(uid, metric_name, points);
        self
    }

    /// Number of `download_metric` calls served so far.
    pub fn downloads(&self) -> usize { self.downloads.load(Ordering::Relaxed) }

    fn lookup(&self, uid: &str, metric_name: &str) -> Option<&[DataPoint]> {
        self.series.get(&(uid.to_string(), metric_name.to_string())).map(|v| v.as_slice())
    }
}

impl MetricClient for InMemoryMetricClient {
    fn download_metric(
        &self,
        selectors: &[ResourceSelector],
        metric_name: &str,
        cached: &CachedResources,
    ) -> MetricPromises {
        self.downloads.fetch_add(1, Ordering::Relaxed);
        if !is_supported(metric_name) && !self.series.keys().any(|(_, m)| m == metric_name) {
            let (resolvers, promises) = MetricPromises::new(selectors.len());
            resolvers.put_metrics(Err(MetricError::Unsupported(metric_name.to_string())));
            return promises;
        }
        let metrics: Vec<Metric> = selectors
            .iter()
            .map(|s| {
                let (pods, label) = resolve_pods(s, cached);
                let points = match self.lookup(&s.uid, metric_name) {
                    Some(own) => own.to_vec(),
                    None => sum_pod_series(&pods, |p| self.lookup(&p.uid, metric_name)),
                };
                Metric::new(metric_name, points).with_label(label)
            })
            .collect();
        debug!(metric = %metric_name, count = metrics.len(), "metrics: served from memory");
        MetricPromises::ready(metrics)
    }
}
