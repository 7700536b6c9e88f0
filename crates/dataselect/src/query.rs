//! Parsed representations of a list request: pagination, sort, filter and
//! metrics, composed into one [`DataSelectQuery`].
//!
//! Sort and filter parsing is permissive: a token list that cannot be read
//! yields the no-op query, so a bad query string never breaks a list view.

#![forbid(unsafe_code)]

use kdash_core::{only_sum_aggregation, AggregationModes, ComparableValue, PropertyName, CPU_USAGE, MEMORY_USAGE};
use serde::{Deserialize, Serialize};

/// Outcome of permissive parsing. Both arms carry a usable query; `Fallback`
/// holds the no-op sentinel used in place of unreadable input.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Parsed(T),
    Fallback(T),
}

impl<T> Parsed<T> {
    pub fn into_inner(self) -> T {
        match self {
            Parsed::Parsed(t) | Parsed::Fallback(t) => t,
        }
    }

    pub fn is_fallback(&self) -> bool { matches!(self, Parsed::Fallback(_)) }
}

/// Zero-based pagination. Negative fields disable pagination altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub items_per_page: i64,
    pub page: i64,
}

impl PaginationQuery {
    /// Return every item.
    pub const NO_PAGINATION: PaginationQuery = PaginationQuery { items_per_page: -1, page: -1 };
    /// Return no items.
    pub const EMPTY_PAGINATION: PaginationQuery = PaginationQuery { items_per_page: 0, page: 0 };
    pub const DEFAULT_PAGINATION: PaginationQuery = PaginationQuery { items_per_page: 10, page: 0 };

    pub fn new(items_per_page: i64, page: i64) -> Self { Self { items_per_page, page } }

    pub fn is_valid_pagination(&self) -> bool { self.items_per_page >= 0 && self.page >= 0 }

    /// False when the page starts past the end of the list (or pages are
    /// zero-sized); such a request yields an empty page, not an error.
    pub fn is_page_available(&self, items_count: usize, start_index: usize) -> bool {
        items_count > start_index && self.items_per_page > 0
    }

    /// `[start, end)` window of the requested page within `items_count`
    /// items. Only meaningful for valid pagination.
    pub fn get_pagination_settings(&self, items_count: usize) -> (usize, usize) {
        let per_page = self.items_per_page.max(0) as usize;
        let start = per_page.saturating_mul(self.page.max(0) as usize);
        let end = start.saturating_add(per_page).min(items_count);
        (start, end)
    }
}

impl Default for PaginationQuery {
    fn default() -> Self { Self::NO_PAGINATION }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortBy {
    pub property: PropertyName,
    pub ascending: bool,
}

/// Ordered sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortQuery {
    pub sort_by_list: Vec<SortBy>,
}

impl SortQuery {
    pub fn no_sort() -> Self { Self::default() }

    /// Parse flattened `(order, property)` pairs where order is `a` or `d`,
    /// e.g. `["a", "name", "d", "creationTimestamp"]`.
    pub fn parse<S: AsRef<str>>(raw: Option<&[S]>) -> Parsed<SortQuery> {
        let raw = match raw {
            Some(r) if r.len() % 2 == 0 => r,
            _ => return Parsed::Fallback(Self::no_sort()),
        };
        let mut sort_by_list = Vec::with_capacity(raw.len() / 2);
        for pair in raw.chunks_exact(2) {
            let ascending = match pair[0].as_ref() {
                "a" => true,
                "d" => false,
                _ => return Parsed::Fallback(Self::no_sort()),
            };
            sort_by_list.push(SortBy { property: PropertyName::new(pair[1].as_ref()), ascending });
        }
        Parsed::Parsed(SortQuery { sort_by_list })
    }

    pub fn new<S: AsRef<str>>(raw: Option<&[S]>) -> Self { Self::parse(raw).into_inner() }

    pub fn is_empty(&self) -> bool { self.sort_by_list.is_empty() }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterBy {
    pub property: PropertyName,
    pub value: ComparableValue,
}

/// Filter pairs combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    pub filter_by_list: Vec<FilterBy>,
}

impl FilterQuery {
    pub fn no_filter() -> Self { Self::default() }

    /// Parse flattened `(property, value)` pairs. Values are always kept as
    /// strings, whatever the property's native type.
    pub fn parse<S: AsRef<str>>(raw: Option<&[S]>) -> Parsed<FilterQuery> {
        let raw = match raw {
            Some(r) if r.len() % 2 == 0 => r,
            _ => return Parsed::Fallback(Self::no_filter()),
        };
        let filter_by_list = raw
            .chunks_exact(2)
            .map(|pair| FilterBy {
                property: PropertyName::new(pair[0].as_ref()),
                value: ComparableValue::string(pair[1].as_ref()),
            })
            .collect();
        Parsed::Parsed(FilterQuery { filter_by_list })
    }

    pub fn new<S: AsRef<str>>(raw: Option<&[S]>) -> Self { Self::parse(raw).into_inner() }

    pub fn is_empty(&self) -> bool { self.filter_by_list.is_empty() }
}

/// Metrics to download and how to aggregate them. `metric_names == None`
/// means no metrics; empty aggregations mean the default (sum).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    pub metric_names: Option<Vec<String>>,
    pub aggregations: AggregationModes,
}

impl MetricQuery {
    pub fn new(metric_names: Option<Vec<String>>, aggregations: AggregationModes) -> Self {
        Self { metric_names, aggregations }
    }

    pub fn no_metrics() -> Self { Self::default() }

    pub fn standard_metrics() -> Self {
        Self::new(Some(vec![CPU_USAGE.to_string(), MEMORY_USAGE.to_string()]), only_sum_aggregation())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSelectQuery {
    pub pagination_query: PaginationQuery,
    pub sort_query: SortQuery,
    pub filter_query: FilterQuery,
    pub metric_query: MetricQuery,
}

impl DataSelectQuery {
    pub fn new(
        pagination_query: PaginationQuery,
        sort_query: SortQuery,
        filter_query: FilterQuery,
        metric_query: MetricQuery,
    ) -> Self {
        Self { pagination_query, sort_query, filter_query, metric_query }
    }

    /// Everything, unsorted, no metrics.
    pub fn no_data_select() -> Self {
        Self::new(PaginationQuery::NO_PAGINATION, SortQuery::no_sort(), FilterQuery::no_filter(), MetricQuery::no_metrics())
    }

    pub fn std_metrics_data_select() -> Self {
        Self::new(PaginationQuery::NO_PAGINATION, SortQuery::no_sort(), FilterQuery::no_filter(), MetricQuery::standard_metrics())
    }

    pub fn default_data_select() -> Self {
        Self::new(PaginationQuery::DEFAULT_PAGINATION, SortQuery::no_sort(), FilterQuery::no_filter(), MetricQuery::no_metrics())
    }

    pub fn default_data_select_with_metrics() -> Self {
        Self::new(
            PaginationQuery::DEFAULT_PAGINATION,
            SortQuery::no_sort(),
            FilterQuery::no_filter(),
            MetricQuery::standard_metrics(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn pagination_windows() {
        let p = PaginationQuery::new(10, 1);
        assert_eq!(p.get_pagination_settings(10), (10, 10));
        assert_eq!(p.get_pagination_settings(15), (10, 15));
        assert_eq!(p.get_pagination_settings(30), (10, 20));
        assert!(!p.is_page_available(10, 10));
        assert!(p.is_page_available(15, 10));
    }

    #[test]
    fn zero_items_per_page_yields_empty_window() {
        let p = PaginationQuery::EMPTY_PAGINATION;
        assert!(p.is_valid_pagination());
        assert_eq!(p.get_pagination_settings(5), (0, 0));
        assert!(!p.is_page_available(5, 0));
    }

    #[test]
    fn negative_fields_are_invalid() {
        assert!(!PaginationQuery::new(-1, 0).is_valid_pagination());
        assert!(!PaginationQuery::new(10, -1).is_valid_pagination());
        assert!(!PaginationQuery::NO_PAGINATION.is_valid_pagination());
        assert!(PaginationQuery::new(0, 3).is_valid_pagination());
    }

    #[test]
    fn sort_parses_order_property_pairs() {
        let raw = toks(&["a", "name", "d", "creationTimestamp"]);
        let q = SortQuery::parse(Some(raw.as_slice()));
        assert!(!q.is_fallback());
        let q = q.into_inner();
        assert_eq!(q.sort_by_list.len(), 2);
        assert_eq!(q.sort_by_list[0], SortBy { property: "name".into(), ascending: true });
        assert_eq!(q.sort_by_list[1], SortBy { property: "creationTimestamp".into(), ascending: false });
    }

    #[test]
    fn malformed_sort_degrades_to_no_sort() {
        for raw in [toks(&["a"]), toks(&["x", "name"]), toks(&["a", "name", "up", "id"]), toks(&[""])] {
            let q = SortQuery::parse(Some(raw.as_slice()));
            assert!(q.is_fallback(), "{:?} should fall back", raw);
            assert_eq!(q.into_inner(), SortQuery::no_sort());
        }
        assert_eq!(SortQuery::new::<String>(None), SortQuery::no_sort());
    }

    #[test]
    fn filter_values_are_strings() {
        let raw = toks(&["name", "web", "status", "3"]);
        let q = FilterQuery::new(Some(raw.as_slice()));
        assert_eq!(q.filter_by_list.len(), 2);
        assert_eq!(q.filter_by_list[1].value, ComparableValue::string("3"));
    }

    #[test]
    fn malformed_filter_degrades_to_no_filter() {
        let raw = toks(&["name"]);
        assert!(FilterQuery::parse(Some(raw.as_slice())).is_fallback());
        assert!(FilterQuery::parse::<String>(None).is_fallback());
        assert!(FilterQuery::new::<String>(None).is_empty());
    }

    #[test]
    fn presets() {
        let q = DataSelectQuery::default_data_select_with_metrics();
        assert_eq!(q.pagination_query, PaginationQuery::DEFAULT_PAGINATION);
        assert_eq!(q.metric_query.metric_names.as_ref().map(|v| v.len()), Some(2));
        assert!(DataSelectQuery::no_data_select().metric_query.metric_names.is_none());
    }
}
