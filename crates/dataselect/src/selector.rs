//! The selection pipeline: filter, sort, metrics and paginate over a list of
//! data cells. Each stage rewrites the working list in place and returns the
//! selector so stages can be chained. A selector serves one request.

#![forbid(unsafe_code)]

use std::cmp::Ordering;

use kdash_core::{
    only_default_aggregation, CachedResources, ComparableValue, DataCell, ResourceSelector,
};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::client::MetricClient;
use crate::promise::MetricPromises;
use crate::query::{DataSelectQuery, FilterBy, SortBy};

static NO_CACHED_RESOURCES: CachedResources = CachedResources { pods: Vec::new() };

type SortKey = SmallVec<[Option<ComparableValue>; 4]>;

pub struct DataSelector<'q, C> {
    cells: Vec<C>,
    query: &'q DataSelectQuery,
    cached: &'q CachedResources,
    cumulative_metrics_promises: MetricPromises,
    metrics_promises: MetricPromises,
}

impl<'q, C: DataCell> DataSelector<'q, C> {
    pub fn new(cells: Vec<C>, query: &'q DataSelectQuery) -> Self {
        Self {
            cells,
            query,
            cached: &NO_CACHED_RESOURCES,
            cumulative_metrics_promises: MetricPromises::empty(),
            metrics_promises: MetricPromises::empty(),
        }
    }

    pub fn with_cached_resources(mut self, cached: &'q CachedResources) -> Self {
        self.cached = cached;
        self
    }

    pub fn cells(&self) -> &[C] { &self.cells }

    pub fn len(&self) -> usize { self.cells.len() }

    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    pub fn into_cells(self) -> Vec<C> { self.cells }

    pub fn take_cumulative_metrics(&mut self) -> MetricPromises {
        std::mem::take(&mut self.cumulative_metrics_promises)
    }

    pub fn take_metrics(&mut self) -> MetricPromises { std::mem::take(&mut self.metrics_promises) }

    /// Keep only cells matching every filter pair. A cell that does not
    /// support a filtered property never matches.
    pub fn filter(&mut self) -> &mut Self {
        let query = self.query;
        let filters = &query.filter_query.filter_by_list;
        if filters.is_empty() {
            return self;
        }
        let before = self.cells.len();
        self.cells.retain(|cell| filters.iter().all(|f| matches_filter(cell, f)));
        debug!(before, after = self.cells.len(), filters = filters.len(), "dataselect: filter");
        self
    }

    /// Stable multi-key sort. The first key on which two cells differ decides
    /// their order; a key missing on either side, or holding values that
    /// cannot be compared, ends the comparison and keeps input order.
    pub fn sort(&mut self) -> &mut Self {
        let query = self.query;
        let sort_by = &query.sort_query.sort_by_list;
        if sort_by.is_empty() {
            return self;
        }
        let mut keyed: Vec<(SortKey, C)> = self
            .cells
            .drain(..)
            .map(|cell| {
                let key = sort_by.iter().map(|s| cell.get_property(&s.property)).collect();
                (key, cell)
            })
            .collect();
        let mut mismatches = 0usize;
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, sort_by, &mut mismatches));
        if mismatches > 0 {
            warn!(mismatches, "dataselect: sort compared values of different kinds; kept input order for those pairs");
        }
        self.cells = keyed.into_iter().map(|(_, cell)| cell).collect();
        self
    }

    /// Download per-cell metrics for every requested metric name and
    /// aggregate each name into one promise per aggregation mode. The
    /// aggregate covers the whole current list, not just one page.
    pub fn get_cumulative_metrics(&mut self, client: Option<&dyn MetricClient>) -> &mut Self {
        let Some((client, names, selectors)) = self.metric_request(client) else { return self };
        let aggregations = match &self.query.metric_query.aggregations {
            a if a.is_empty() => only_default_aggregation(),
            a => a.clone(),
        };
        let mut out = MetricPromises::empty();
        for name in names {
            let promises = client.download_metric(&selectors, name, self.cached);
            out.extend(client.aggregate_metrics(promises, name, &aggregations));
        }
        metrics::counter!("dataselect_metric_promises_total", out.len() as u64, "kind" => "cumulative");
        self.cumulative_metrics_promises = out;
        self
    }

    /// Download unaggregated per-cell metrics (sparklines).
    pub fn get_metrics(&mut self, client: Option<&dyn MetricClient>) -> &mut Self {
        let Some((client, names, selectors)) = self.metric_request(client) else { return self };
        let out = client.download_metrics(&selectors, names, self.cached);
        metrics::counter!("dataselect_metric_promises_total", out.len() as u64, "kind" => "per_item");
        self.metrics_promises = out;
        self
    }

    /// Window the current list to the requested page. Invalid pagination
    /// keeps everything; a page past the end leaves nothing.
    pub fn paginate(&mut self) -> &mut Self {
        let p = self.query.pagination_query;
        if !p.is_valid_pagination() {
            return self;
        }
        let total = self.cells.len();
        let (start, end) = p.get_pagination_settings(total);
        if !p.is_page_available(total, start) {
            self.cells.clear();
            return self;
        }
        self.cells.truncate(end);
        self.cells.drain(..start);
        self
    }

    /// Client, requested metric names and selectors of the current list, or
    /// `None` when metrics are not wanted or cannot be fetched.
    fn metric_request<'c>(
        &self,
        client: Option<&'c dyn MetricClient>,
    ) -> Option<(&'c dyn MetricClient, &'q [String], Vec<ResourceSelector>)> {
        let Some(client) = client else {
            warn!("dataselect: no metric client provided; skipping metrics");
            return None;
        };
        let query: &'q DataSelectQuery = self.query;
        let Some(names) = query.metric_query.metric_names.as_deref() else {
            debug!("dataselect: no metrics specified; skipping metrics");
            return None;
        };
        Some((client, names, self.resource_selectors()))
    }

    fn resource_selectors(&self) -> Vec<ResourceSelector> {
        let mut out = Vec::with_capacity(self.cells.len());
        for (i, cell) in self.cells.iter().enumerate() {
            match cell.as_metric_cell() {
                Some(m) => out.push(m.get_resource_selector()),
                None => warn!(index = i, "dataselect: data cell does not support metrics; skipping"),
            }
        }
        out
    }
}

fn matches_filter<C: DataCell>(cell: &C, filter: &FilterBy) -> bool {
    let Some(value) = cell.get_property(&filter.property) else { return false };
    match value.contains(&filter.value) {
        Ok(m) => m,
        Err(e) => {
            debug!(property = %filter.property, error = %e, "dataselect: filter value not comparable");
            false
        }
    }
}

fn compare_keys(a: &SortKey, b: &SortKey, sort_by: &[SortBy], mismatches: &mut usize) -> Ordering {
    for (i, s) in sort_by.iter().enumerate() {
        let (Some(va), Some(vb)) = (&a[i], &b[i]) else { break };
        match va.compare(vb) {
            Ok(Ordering::Equal) => continue,
            Ok(o) => return if s.ascending { o } else { o.reverse() },
            Err(_) => {
                *mismatches += 1;
                break;
            }
        }
    }
    Ordering::Equal
}
