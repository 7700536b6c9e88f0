//! kdash metric clients.
//!
//! [`MetricsServerClient`] reads current pod usage from the
//! `metrics.k8s.io` API; [`InMemoryMetricClient`] serves recorded series and
//! backs tests and offline runs. Both resolve workload selectors to pods
//! through the pods the caller already fetched.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use kdash_core::{CachedResources, DataPoint, Label, ResourceKind, ResourceSelector, CPU_USAGE, MEMORY_USAGE};
use kdash_resources::pods_for_selector;

pub mod memory;
pub mod quantity;
pub mod server;

pub use memory::InMemoryMetricClient;
pub use quantity::{parse_cpu_millis, parse_memory_bytes};
pub use server::{MetricsServerClient, PodMetrics};

/// A pod contributing to a selector's metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

/// Pods whose usage makes up the metric of `selector`, plus the label the
/// resulting series carries (the resource itself and its pods).
pub fn resolve_pods(selector: &ResourceSelector, cached: &CachedResources) -> (Vec<PodRef>, Label) {
    let mut label = Label::single(selector.resource_type, &selector.uid);
    if selector.resource_type == ResourceKind::Pod {
        let me = PodRef {
            namespace: selector.namespace.clone(),
            name: selector.resource_name.clone(),
            uid: selector.uid.clone(),
        };
        return (vec![me], label);
    }
    let Some(labels) = selector.selector.as_ref() else { return (Vec::new(), label) };
    let pods: Vec<PodRef> = pods_for_selector(&cached.pods, &selector.namespace, labels)
        .into_iter()
        .map(|p| PodRef {
            namespace: p.metadata.namespace.clone().unwrap_or_default(),
            name: p.metadata.name.clone().unwrap_or_default(),
            uid: p.metadata.uid.clone().unwrap_or_default(),
        })
        .collect();
    for p in pods.iter() {
        label.add_metric_label(&Label::single(ResourceKind::Pod, &p.uid));
    }
    (pods, label)
}

/// Per-timestamp sum of the series of `pods`. Pods without a series are
/// skipped; the result is ordered by `x`.
pub fn sum_pod_series<'a, F>(pods: &[PodRef], mut series_of: F) -> Vec<DataPoint>
where
    F: FnMut(&PodRef) -> Option<&'a [DataPoint]>,
{
    let mut sums: BTreeMap<i64, i64> = BTreeMap::new();
    for pod in pods {
        for p in series_of(pod).unwrap_or(&[]) {
            *sums.entry(p.x).or_insert(0) += p.y;
        }
    }
    sums.into_iter().map(|(x, y)| DataPoint { x, y }).collect()
}

pub(crate) fn is_supported(metric_name: &str) -> bool {
    metric_name == CPU_USAGE || metric_name == MEMORY_USAGE
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Pod;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn pod(name: &str, app: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.into()),
                namespace: Some("prod".into()),
                uid: Some(format!("uid-{}", name)),
                labels: Some([("app".to_string(), app.to_string())].into_iter().collect()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn selector(kind: ResourceKind, name: &str, app: Option<&str>) -> ResourceSelector {
        ResourceSelector {
            namespace: "prod".into(),
            resource_type: kind,
            resource_name: name.into(),
            selector: app.map(|a| {
                let mut m = BTreeMap::new();
                m.insert("app".to_string(), a.to_string());
                m
            }),
            uid: format!("uid-{}", name),
        }
    }

    #[test]
    fn workload_resolves_to_matching_cached_pods() {
        let cached = CachedResources::with_pods(vec![pod("web-1", "web"), pod("web-2", "web"), pod("api-1", "api")]);
        let (pods, label) = resolve_pods(&selector(ResourceKind::Deployment, "web", Some("web")), &cached);
        assert_eq!(pods.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), vec!["web-1", "web-2"]);
        assert_eq!(label.uids(ResourceKind::Deployment), &["uid-web".to_string()]);
        assert_eq!(label.uids(ResourceKind::Pod).len(), 2);
    }

    #[test]
    fn pod_resolves_to_itself_and_selectorless_workload_to_nothing() {
        let cached = CachedResources::default();
        let (pods, _) = resolve_pods(&selector(ResourceKind::Pod, "solo", None), &cached);
        assert_eq!(pods[0].name, "solo");
        let (pods, _) = resolve_pods(&selector(ResourceKind::DaemonSet, "ds", None), &cached);
        assert!(pods.is_empty());
    }

    #[test]
    fn pod_series_are_summed_per_timestamp() {
        let a = vec![DataPoint { x: 1, y: 10 }, DataPoint { x: 2, y: 20 }];
        let b = vec![DataPoint { x: 2, y: 5 }, DataPoint { x: 3, y: 1 }];
        let pods = vec![
            PodRef { namespace: "ns".into(), name: "a".into(), uid: "a".into() },
            PodRef { namespace: "ns".into(), name: "b".into(), uid: "b".into() },
            PodRef { namespace: "ns".into(), name: "gone".into(), uid: "gone".into() },
        ];
        let got = sum_pod_series(&pods, |p| match p.uid.as_str() {
            "a" => Some(a.as_slice()),
            "b" => Some(b.as_slice()),
            _ => None,
        });
        assert_eq!(got, vec![DataPoint { x: 1, y: 10 }, DataPoint { x: 2, y: 25 }, DataPoint { x: 3, y: 1 }]);
    }
}
