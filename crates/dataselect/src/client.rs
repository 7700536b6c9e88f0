#![forbid(unsafe_code)]

use kdash_core::{AggregationMode, CachedResources, ResourceSelector};

use crate::aggregate::aggregate_metric_promises;
use crate::promise::MetricPromises;

/// Metric backend as seen by the pipeline. Calls return immediately with
/// promises; implementations do their work on spawned tasks and are
/// responsible for bounding how long a download may take.
pub trait MetricClient: Send + Sync {
    /// One promise per selector, in selector order.
    fn download_metric(
        &self,
        selectors: &[ResourceSelector],
        metric_name: &str,
        cached: &CachedResources,
    ) -> MetricPromises;

    /// Promises for every metric name, grouped by name.
    fn download_metrics(
        &self,
        selectors: &[ResourceSelector],
        metric_names: &[String],
        cached: &CachedResources,
    ) -> MetricPromises {
        let mut out = MetricPromises::empty();
        for name in metric_names {
            out.extend(self.download_metric(selectors, name, cached));
        }
        out
    }

    /// Fold per-resource promises into one promise per aggregation mode.
    fn aggregate_metrics(
        &self,
        promises: MetricPromises,
        metric_name: &str,
        aggregations: &[AggregationMode],
    ) -> MetricPromises {
        aggregate_metric_promises(promises, metric_name, aggregations, None)
    }
}
