use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use kdash_core::{ComparableValue, PropertyName, ResourceKind};

use crate::ResourceObject;

/// Status reason when set (e.g. `Evicted`), otherwise the phase.
pub fn pod_status(pod: &Pod) -> String {
    let Some(status) = pod.status.as_ref() else { return "Unknown".to_string() };
    match (status.reason.as_deref(), status.phase.as_deref()) {
        (Some(reason), _) if !reason.is_empty() => reason.to_string(),
        (_, Some(phase)) if !phase.is_empty() => phase.to_string(),
        _ => "Unknown".to_string(),
    }
}

impl ResourceObject for Pod {
    const RESOURCE_KIND: ResourceKind = ResourceKind::Pod;

    fn extra_property(&self, name: &str) -> Option<ComparableValue> {
        match name {
            PropertyName::STATUS => Some(ComparableValue::string(pod_status(self))),
            _ => None,
        }
    }
}

/// Pods in `namespace` carrying every label of `selector`. An empty selector
/// selects nothing.
pub fn pods_for_selector<'a>(pods: &'a [Pod], namespace: &str, selector: &BTreeMap<String, String>) -> Vec<&'a Pod> {
    if selector.is_empty() {
        return Vec::new();
    }
    pods.iter()
        .filter(|p| p.metadata.namespace.as_deref().unwrap_or("") == namespace)
        .filter(|p| {
            let labels = p.metadata.labels.as_ref();
            selector.iter().all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::meta;
    use crate::ResourceCell;
    use k8s_openapi::api::core::v1::PodStatus;
    use kdash_core::{DataCell, MetricDataCell};

    fn pod(name: &str, ns: &str, labels: &[(&str, &str)], phase: &str) -> Pod {
        let mut m = meta(name, ns, name, "2022-02-02T00:00:00Z");
        m.labels = Some(labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect());
        Pod {
            metadata: m,
            status: Some(PodStatus { phase: Some(phase.to_string()), ..Default::default() }),
            ..Default::default()
        }
    }

    #[test]
    fn status_prefers_reason_over_phase() {
        let mut p = pod("a", "ns", &[], "Failed");
        assert_eq!(pod_status(&p), "Failed");
        if let Some(s) = p.status.as_mut() {
            s.reason = Some("Evicted".into());
        }
        assert_eq!(pod_status(&p), "Evicted");
        assert_eq!(pod_status(&Pod::default()), "Unknown");
    }

    #[test]
    fn pod_cell_selector_has_no_labels() {
        let cell = ResourceCell(pod("a", "ns", &[("app", "web")], "Running"));
        let sel = cell.get_resource_selector();
        assert_eq!(sel.resource_type, ResourceKind::Pod);
        assert_eq!(sel.selector, None);
        assert_eq!(cell.get_property(&PropertyName::from("status")), Some(ComparableValue::string("Running")));
    }

    #[test]
    fn selector_matches_namespace_and_all_labels() {
        let pods = vec![
            pod("a", "prod", &[("app", "web"), ("tier", "fe")], "Running"),
            pod("b", "prod", &[("app", "web")], "Running"),
            pod("c", "dev", &[("app", "web"), ("tier", "fe")], "Running"),
        ];
        let sel: BTreeMap<String, String> =
            [("app".to_string(), "web".to_string()), ("tier".to_string(), "fe".to_string())].into_iter().collect();
        let got: Vec<&str> = pods_for_selector(&pods, "prod", &sel)
            .iter()
            .filter_map(|p| p.metadata.name.as_deref())
            .collect();
        assert_eq!(got, vec!["a"]);
        assert!(pods_for_selector(&pods, "prod", &BTreeMap::new()).is_empty());
    }
}
