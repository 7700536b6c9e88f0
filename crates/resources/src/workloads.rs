//! Controllers that own pods through a label selector.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::core::v1::ReplicationController;
use kdash_core::ResourceKind;

use crate::{match_labels, ResourceObject};

impl ResourceObject for Deployment {
    const RESOURCE_KIND: ResourceKind = ResourceKind::Deployment;

    fn pod_selector(&self) -> Option<BTreeMap<String, String>> {
        self.spec.as_ref().and_then(|s| match_labels(&s.selector))
    }
}

impl ResourceObject for ReplicaSet {
    const RESOURCE_KIND: ResourceKind = ResourceKind::ReplicaSet;

    fn pod_selector(&self) -> Option<BTreeMap<String, String>> {
        self.spec.as_ref().and_then(|s| match_labels(&s.selector))
    }
}

impl ResourceObject for StatefulSet {
    const RESOURCE_KIND: ResourceKind = ResourceKind::StatefulSet;

    fn pod_selector(&self) -> Option<BTreeMap<String, String>> {
        self.spec.as_ref().and_then(|s| match_labels(&s.selector))
    }
}

impl ResourceObject for DaemonSet {
    const RESOURCE_KIND: ResourceKind = ResourceKind::DaemonSet;

    fn pod_selector(&self) -> Option<BTreeMap<String, String>> {
        self.spec.as_ref().and_then(|s| match_labels(&s.selector))
    }
}

impl ResourceObject for ReplicationController {
    const RESOURCE_KIND: ResourceKind = ResourceKind::ReplicationController;

    // plain map selector, not a LabelSelector
    fn pod_selector(&self) -> Option<BTreeMap<String, String>> {
        self.spec.as_ref().and_then(|s| s.selector.clone()).filter(|m| !m.is_empty())
    }
}
