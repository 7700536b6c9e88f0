//! Cluster-scoped kinds. Neither carries metrics here.

use k8s_openapi::api::core::v1::{Namespace, Node};
use kdash_core::{ComparableValue, PropertyName, ResourceKind};

use crate::ResourceObject;

/// `Ready`, `NotReady` or `Unknown` from the node's Ready condition.
pub fn node_status(node: &Node) -> &'static str {
    let ready = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|cs| cs.iter().find(|c| c.type_ == "Ready"));
    match ready.map(|c| c.status.as_str()) {
        Some("True") => "Ready",
        Some("False") => "NotReady",
        _ => "Unknown",
    }
}

impl ResourceObject for Node {
    const RESOURCE_KIND: ResourceKind = ResourceKind::Node;
    const HAS_METRICS: bool = false;

    fn extra_property(&self, name: &str) -> Option<ComparableValue> {
        match name {
            PropertyName::STATUS => Some(ComparableValue::string(node_status(self))),
            _ => None,
        }
    }
}

impl ResourceObject for Namespace {
    const RESOURCE_KIND: ResourceKind = ResourceKind::Namespace;
    const HAS_METRICS: bool = false;

    fn extra_property(&self, name: &str) -> Option<ComparableValue> {
        match name {
            PropertyName::STATUS => {
                let phase = self.status.as_ref().and_then(|s| s.phase.clone());
                Some(ComparableValue::string(phase.unwrap_or_else(|| "Active".to_string())))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::meta;
    use crate::ResourceCell;
    use k8s_openapi::api::core::v1::{NodeCondition, NodeStatus};
    use kdash_core::DataCell;

    #[test]
    fn node_status_follows_ready_condition() {
        let mut node = Node { metadata: meta("n1", "", "n1", "2020-01-01T00:00:00Z"), ..Default::default() };
        assert_eq!(node_status(&node), "Unknown");
        node.status = Some(NodeStatus {
            conditions: Some(vec![NodeCondition { type_: "Ready".into(), status: "False".into(), ..Default::default() }]),
            ..Default::default()
        });
        assert_eq!(node_status(&node), "NotReady");
        let cell = ResourceCell(node);
        assert!(cell.as_metric_cell().is_none());
        assert_eq!(cell.get_property(&PropertyName::from("status")), Some(ComparableValue::string("NotReady")));
    }

    #[test]
    fn namespace_defaults_to_active() {
        let ns = Namespace { metadata: meta("kube-system", "", "ns1", "2020-01-01T00:00:00Z"), ..Default::default() };
        assert_eq!(ResourceCell(ns).get_property(&PropertyName::from("status")), Some(ComparableValue::string("Active")));
    }
}
