//! List responses assembled from the selection pipeline.

use std::time::Instant;

use kdash_core::{CachedResources, Metric};
use kdash_dataselect::{generic_data_select_with_filter_and_metrics, DataSelectQuery, MetricClient};
use kdash_resources::{from_cells, to_cells, ResourceObject};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    /// Items left after filtering, before pagination.
    pub total_items: usize,
}

/// One page of a resource list, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList<T> {
    pub list_meta: ListMeta,
    pub cumulative_metrics: Vec<Metric>,
    pub items: Vec<T>,
    /// Non-fatal problems met while building the list.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// A list of any kind, items already serialized.
pub type ResourceListValue = ResourceList<serde_json::Value>;

impl<T> Default for ResourceList<T> {
    fn default() -> Self {
        Self { list_meta: ListMeta::default(), cumulative_metrics: Vec::new(), items: Vec::new(), errors: Vec::new() }
    }
}

impl<T: Serialize> ResourceList<T> {
    pub fn into_value(self) -> serde_json::Result<ResourceListValue> {
        let items = self.items.iter().map(serde_json::to_value).collect::<serde_json::Result<Vec<_>>>()?;
        Ok(ResourceList {
            list_meta: self.list_meta,
            cumulative_metrics: self.cumulative_metrics,
            items,
            errors: self.errors,
        })
    }
}

/// Filter, sort, paginate `objects` and resolve their cumulative metrics.
/// A failed metric download leaves `cumulative_metrics` empty.
pub async fn select_list<T: ResourceObject>(
    objects: Vec<T>,
    query: &DataSelectQuery,
    cached: &CachedResources,
    client: Option<&dyn MetricClient>,
) -> ResourceList<T> {
    let t0 = Instant::now();
    let (cells, promises, total_items) =
        generic_data_select_with_filter_and_metrics(to_cells(objects), query, cached, client);
    let cumulative_metrics = match promises.get_metrics().await {
        Ok(m) => m,
        Err(e) => {
            warn!(kind = %T::RESOURCE_KIND, error = %e, "api: cumulative metrics unavailable");
            Vec::new()
        }
    };
    let items = from_cells(cells);
    info!(kind = %T::RESOURCE_KIND, total_items, page_items = items.len(), metrics = cumulative_metrics.len(), took_ms = %t0.elapsed().as_millis(), "api: list selected");
    ResourceList { list_meta: ListMeta { total_items }, cumulative_metrics, items, errors: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Pod;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kdash_core::{DataPoint, MetricError, ResourceSelector, CPU_USAGE};
    use kdash_dataselect::{FilterQuery, MetricPromises, MetricQuery, PaginationQuery, SortQuery};
    use kdash_metrics::InMemoryMetricClient;

    fn pod(name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("prod".into()),
                uid: Some(name.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn query(ipp: i64, page: i64) -> DataSelectQuery {
        DataSelectQuery::new(
            PaginationQuery::new(ipp, page),
            SortQuery::new(Some(&["a", "name"])),
            FilterQuery::no_filter(),
            MetricQuery::new(Some(vec![CPU_USAGE.to_string()]), vec![]),
        )
    }

    struct Failing;

    impl MetricClient for Failing {
        fn download_metric(&self, selectors: &[ResourceSelector], _: &str, _: &CachedResources) -> MetricPromises {
            let (resolvers, promises) = MetricPromises::new(selectors.len());
            resolvers.put_metrics(Err(MetricError::Download("boom".into())));
            promises
        }
    }

    #[tokio::test]
    async fn cumulative_metrics_cover_every_filtered_item() {
        let client = InMemoryMetricClient::new()
            .with_series("a", CPU_USAGE, vec![DataPoint { x: 0, y: 1 }])
            .with_series("b", CPU_USAGE, vec![DataPoint { x: 0, y: 2 }])
            .with_series("c", CPU_USAGE, vec![DataPoint { x: 0, y: 4 }]);
        let list = select_list(vec![pod("c"), pod("a"), pod("b")], &query(1, 0), &CachedResources::default(), Some(&client)).await;
        assert_eq!(list.list_meta.total_items, 3);
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].metadata.name.as_deref(), Some("a"));
        assert_eq!(list.cumulative_metrics.len(), 1);
        assert_eq!(list.cumulative_metrics[0].data_points, vec![DataPoint { x: 0, y: 7 }]);
    }

    #[tokio::test]
    async fn metric_failure_degrades_to_no_metrics() {
        let list = select_list(vec![pod("a")], &query(10, 0), &CachedResources::default(), Some(&Failing)).await;
        assert_eq!(list.items.len(), 1);
        assert!(list.cumulative_metrics.is_empty());
    }

    #[test]
    fn list_serializes_camel_case() {
        let list = ResourceList { list_meta: ListMeta { total_items: 2 }, items: vec![pod("a")], ..Default::default() };
        let v = serde_json::to_value(list.into_value().unwrap()).unwrap();
        assert_eq!(v["listMeta"]["totalItems"], 2);
        assert_eq!(v["items"][0]["metadata"]["name"], "a");
        assert!(v["cumulativeMetrics"].as_array().unwrap().is_empty());
    }
}
