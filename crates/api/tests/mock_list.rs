use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kdash_api::{parse_data_select_query, DataSelectParams, KdashError, ListApi, MockApi};
use kdash_core::{DataPoint, ResourceKind, CPU_USAGE};
use kdash_metrics::InMemoryMetricClient;

fn labels(app: &str) -> Option<std::collections::BTreeMap<String, String>> {
    Some([("app".to_string(), app.to_string())].into_iter().collect())
}

fn pod(name: &str, ns: &str, app: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(ns.into()),
            uid: Some(format!("pod-{}", name)),
            labels: labels(app),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn deployment(name: &str, ns: &str) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(ns.into()),
            uid: Some(format!("deploy-{}", name)),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            selector: LabelSelector { match_labels: labels(name), ..Default::default() },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn api() -> MockApi {
    let pods = vec![pod("web-1", "prod", "web"), pod("web-2", "prod", "web"), pod("api-1", "prod", "api")];
    let metrics = InMemoryMetricClient::new()
        .with_series("pod-web-1", CPU_USAGE, vec![DataPoint { x: 60, y: 100 }])
        .with_series("pod-web-2", CPU_USAGE, vec![DataPoint { x: 60, y: 50 }])
        .with_series("pod-api-1", CPU_USAGE, vec![DataPoint { x: 60, y: 10 }]);
    let mut api = MockApi::new()
        .with_objects(&[deployment("web", "prod"), deployment("api", "prod"), deployment("web", "dev")])
        .with_objects(&pods);
    api.pods = pods;
    api.metrics = metrics;
    api
}

#[tokio::test]
async fn deployments_page_with_workload_metrics() {
    let params = DataSelectParams::from_query_str(
        "itemsPerPage=1&page=2&sortBy=a,name&metricNames=cpu/usage_rate&aggregations=sum",
    );
    let query = parse_data_select_query(&params);
    let list = api().list(ResourceKind::Deployment, Some("prod"), &query).await.unwrap();
    assert_eq!(list.list_meta.total_items, 2);
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0]["metadata"]["name"], "web");
    // both deployments in prod, each the sum of its pods
    assert_eq!(list.cumulative_metrics.len(), 1);
    assert_eq!(list.cumulative_metrics[0].data_points, vec![DataPoint { x: 60, y: 160 }]);
    assert!(list.errors.is_empty());
}

#[tokio::test]
async fn pods_filtered_by_name_across_namespaces() {
    let query = parse_data_select_query(&DataSelectParams::from_query_str("filterBy=name,web"));
    let list = api().list(ResourceKind::Pod, None, &query).await.unwrap();
    assert_eq!(list.list_meta.total_items, 2);
    assert!(list.cumulative_metrics.is_empty());
}

#[tokio::test]
async fn unknown_kind_list_is_empty_and_failures_propagate() {
    let query = parse_data_select_query(&DataSelectParams::default());
    let list = api().list(ResourceKind::Node, Some("prod"), &query).await.unwrap();
    assert_eq!(list.list_meta.total_items, 0);

    let mut failing = api();
    failing.fail_with = Some(KdashError::NotFound("nope".into()));
    assert_eq!(
        failing.list(ResourceKind::Pod, None, &query).await.unwrap_err(),
        KdashError::NotFound("nope".into())
    );
}
