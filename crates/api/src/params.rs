//! Decoding of data-select request parameters.

use kdash_core::AggregationMode;
use kdash_dataselect::{DataSelectQuery, FilterQuery, MetricQuery, PaginationQuery, SortQuery};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Raw query parameters as they arrive on a list request. Every field is
/// kept as text; [`parse_data_select_query`] decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSelectParams {
    pub items_per_page: Option<String>,
    /// 1-based.
    pub page: Option<String>,
    /// `a,name,d,creationTimestamp`
    pub sort_by: Option<String>,
    /// `name,web,namespace,prod`
    pub filter_by: Option<String>,
    pub metric_names: Option<String>,
    pub aggregations: Option<String>,
}

impl DataSelectParams {
    /// Decode `itemsPerPage=10&page=2&sortBy=d,name`. Unknown keys are ignored;
    /// a repeated key keeps its last value.
    pub fn from_query_str(query: &str) -> Self {
        let mut p = Self::default();
        for (k, v) in url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            let v = Some(v.into_owned());
            match k.as_ref() {
                "itemsPerPage" => p.items_per_page = v,
                "page" => p.page = v,
                "sortBy" => p.sort_by = v,
                "filterBy" => p.filter_by = v,
                "metricNames" => p.metric_names = v,
                "aggregations" => p.aggregations = v,
                other => debug!(key = %other, "params: ignoring query key"),
            }
        }
        p
    }
}

fn parse_pagination(params: &DataSelectParams) -> PaginationQuery {
    let items = params.items_per_page.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
    let page = params.page.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
    match (items, page) {
        (Some(0), _) => PaginationQuery::NO_PAGINATION,
        (Some(items), Some(page)) => PaginationQuery::new(items, page - 1),
        _ => PaginationQuery::NO_PAGINATION,
    }
}

fn split(raw: Option<&str>) -> Option<Vec<&str>> {
    raw.map(|s| s.split(',').collect())
}

fn split_non_empty(raw: Option<&str>) -> Option<Vec<String>> {
    raw.filter(|s| !s.is_empty()).map(|s| s.split(',').map(str::to_string).collect())
}

/// Query for the selection pipeline. Missing or malformed parts fall back to
/// their no-op form (no pagination, no sort, no filter, no metrics).
pub fn parse_data_select_query(params: &DataSelectParams) -> DataSelectQuery {
    let pagination = parse_pagination(params);

    let sort_tokens = split(params.sort_by.as_deref());
    let sort = SortQuery::parse(sort_tokens.as_deref());
    if sort.is_fallback() && params.sort_by.is_some() {
        debug!(sort_by = ?params.sort_by, "params: malformed sortBy; not sorting");
    }

    let filter_tokens = split(params.filter_by.as_deref());
    let filter = FilterQuery::parse(filter_tokens.as_deref());
    if filter.is_fallback() && params.filter_by.is_some() {
        debug!(filter_by = ?params.filter_by, "params: malformed filterBy; not filtering");
    }

    let aggregations: Vec<AggregationMode> = split_non_empty(params.aggregations.as_deref())
        .unwrap_or_default()
        .into_iter()
        .map(AggregationMode::from)
        .collect();
    let metrics = MetricQuery::new(split_non_empty(params.metric_names.as_deref()), aggregations);

    DataSelectQuery::new(pagination, sort.into_inner(), filter.into_inner(), metrics)
}
