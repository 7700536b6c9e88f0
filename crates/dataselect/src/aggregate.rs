//! Folding several time series into one per aggregation mode.

#![forbid(unsafe_code)]

use kdash_core::{only_default_aggregation, AggregationMode, DataPoint, Label, Metric, MetricError};
use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::promise::MetricPromises;

pub fn sum_aggregate(values: &[i64]) -> i64 { values.iter().sum() }

pub fn max_aggregate(values: &[i64]) -> i64 { values.iter().copied().max().unwrap_or(0) }

pub fn min_aggregate(values: &[i64]) -> i64 { values.iter().copied().min().unwrap_or(0) }

/// Function for a mode; `None` for modes without one.
fn aggregating_function(mode: &AggregationMode) -> Option<fn(&[i64]) -> i64> {
    match mode {
        AggregationMode::Sum => Some(sum_aggregate),
        AggregationMode::Max => Some(max_aggregate),
        AggregationMode::Min => Some(min_aggregate),
        AggregationMode::Other(_) => None,
    }
}

/// Y values of every series named `metric_name`, bucketed by X, plus the
/// union of their labels.
fn map_data_points(metric_list: &[Metric], metric_name: &str) -> (FxHashMap<i64, Vec<i64>>, Label) {
    let mut buckets: FxHashMap<i64, Vec<i64>> = FxHashMap::default();
    let mut label = Label::new();
    for metric in metric_list.iter().filter(|m| m.metric_name == metric_name) {
        for dp in metric.data_points.iter() {
            buckets.entry(dp.x).or_default().push(dp.y);
        }
        label.add_metric_label(&metric.label);
    }
    (buckets, label)
}

/// Aggregate all series named `metric_name` into one, point by point.
/// Unknown modes fall back to the default (sum). Output is sorted by X.
pub fn aggregate_data(metric_list: &[Metric], metric_name: &str, mode: &AggregationMode) -> Metric {
    let (mode, func) = match aggregating_function(mode) {
        Some(f) => (mode.clone(), f),
        None => {
            debug!(mode = %mode, "unknown aggregation mode; using default");
            (AggregationMode::default(), sum_aggregate as fn(&[i64]) -> i64)
        }
    };
    let (buckets, label) = map_data_points(metric_list, metric_name);
    let mut xs: Vec<i64> = buckets.keys().copied().collect();
    xs.sort_unstable();
    let data_points = xs.into_iter().map(|x| DataPoint { x, y: func(&buckets[&x]) }).collect();
    Metric {
        data_points,
        metric_points: Vec::new(),
        metric_name: metric_name.to_string(),
        label,
        aggregate: Some(mode),
    }
}

/// Aggregate the result of `promises` once it is available, producing one
/// promise per aggregation mode (in order). An upstream error resolves every
/// output promise with that error. `force_label`, when given, replaces the
/// merged label of each aggregate.
///
/// The fold runs on the current tokio runtime. Called outside one, every
/// output promise resolves with `MetricError::NoRuntime`.
pub fn aggregate_metric_promises(
    promises: MetricPromises,
    metric_name: &str,
    aggregations: &[AggregationMode],
    force_label: Option<Label>,
) -> MetricPromises {
    let aggregations = if aggregations.is_empty() { only_default_aggregation() } else { aggregations.to_vec() };
    let (resolvers, result) = MetricPromises::new(aggregations.len());
    let Ok(handle) = Handle::try_current() else {
        warn!(metric = %metric_name, "dataselect: no tokio runtime; cannot aggregate metrics");
        resolvers.put_metrics(Err(MetricError::NoRuntime));
        return result;
    };
    let metric_name = metric_name.to_string();
    handle.spawn(async move {
        let metric_list = match promises.get_metrics().await {
            Ok(list) => list,
            Err(e) => {
                resolvers.put_metrics(Err(e));
                return;
            }
        };
        let aggregated = aggregations
            .iter()
            .map(|mode| {
                let mut m = aggregate_data(&metric_list, &metric_name, mode);
                if let Some(label) = &force_label {
                    m.label = label.clone();
                }
                m
            })
            .collect();
        resolvers.put_metrics(Ok(aggregated));
    });
    result
}
