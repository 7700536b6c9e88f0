//! kdash dataselect: generic sorting, filtering, pagination and metric
//! aggregation over lists of data cells.
//!
//! Callers convert raw objects into cells, build a [`DataSelectQuery`] from
//! request parameters and run one of the entry points below. Filtering runs
//! before the filtered total is taken and before pagination; cumulative
//! metrics cover the filtered, sorted list rather than only the visible page.

#![forbid(unsafe_code)]

use kdash_core::{CachedResources, DataCell};
use tracing::debug;

pub mod aggregate;
pub mod client;
pub mod promise;
pub mod query;
pub mod selector;

pub use aggregate::{aggregate_data, aggregate_metric_promises};
pub use client::MetricClient;
pub use promise::{MetricPromise, MetricPromises, MetricResolver, MetricResolvers};
pub use query::{
    DataSelectQuery, FilterBy, FilterQuery, MetricQuery, PaginationQuery, Parsed, SortBy, SortQuery,
};
pub use selector::DataSelector;

/// Sort, then paginate.
pub fn generic_data_select<C: DataCell>(cells: Vec<C>, query: &DataSelectQuery) -> Vec<C> {
    let mut selector = DataSelector::new(cells, query);
    selector.sort().paginate();
    selector.into_cells()
}

/// Filter, sort, paginate. Also returns the number of items left after
/// filtering, before pagination.
pub fn generic_data_select_with_filter<C: DataCell>(cells: Vec<C>, query: &DataSelectQuery) -> (Vec<C>, usize) {
    let total = cells.len();
    let mut selector = DataSelector::new(cells, query);
    let filtered_total = selector.filter().len();
    selector.sort().paginate();
    record_totals(total, filtered_total);
    (selector.into_cells(), filtered_total)
}

/// Sort, cumulative metrics, paginate.
pub fn generic_data_select_with_metrics<C: DataCell>(
    cells: Vec<C>,
    query: &DataSelectQuery,
    cached: &CachedResources,
    client: Option<&dyn MetricClient>,
) -> (Vec<C>, MetricPromises) {
    let mut selector = DataSelector::new(cells, query).with_cached_resources(cached);
    selector.sort().get_cumulative_metrics(client).paginate();
    let promises = selector.take_cumulative_metrics();
    (selector.into_cells(), promises)
}

/// Filter, sort, cumulative metrics, paginate. Also returns the filtered
/// total.
pub fn generic_data_select_with_filter_and_metrics<C: DataCell>(
    cells: Vec<C>,
    query: &DataSelectQuery,
    cached: &CachedResources,
    client: Option<&dyn MetricClient>,
) -> (Vec<C>, MetricPromises, usize) {
    let total = cells.len();
    let mut selector = DataSelector::new(cells, query).with_cached_resources(cached);
    let filtered_total = selector.filter().len();
    selector.sort().get_cumulative_metrics(client).paginate();
    record_totals(total, filtered_total);
    let promises = selector.take_cumulative_metrics();
    (selector.into_cells(), promises, filtered_total)
}

/// Unaggregated per-item metrics, no sorting, filtering or pagination.
pub fn pod_list_metrics<C: DataCell>(
    cells: Vec<C>,
    query: &DataSelectQuery,
    client: Option<&dyn MetricClient>,
) -> MetricPromises {
    let mut selector = DataSelector::new(cells, query);
    selector.get_metrics(client).take_metrics()
}

fn record_totals(total: usize, filtered_total: usize) {
    debug!(total, filtered_total, "dataselect: filtered total");
    metrics::counter!("dataselect_items_total", total as u64);
    metrics::gauge!("dataselect_filtered_total", filtered_total as f64);
}
