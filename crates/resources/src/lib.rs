//! Data cell adapters for built-in Kubernetes kinds.
//!
//! Each supported kind implements [`ResourceObject`]; [`ResourceCell`] turns
//! any such object into a data cell the selection pipeline understands.
//! `to_cells` and `from_cells` convert whole lists in both directions.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kdash_core::{ComparableValue, DataCell, MetricDataCell, PropertyName, ResourceKind, ResourceSelector};

pub mod batch;
pub mod cluster;
pub mod pod;
pub mod workloads;

pub use pod::pods_for_selector;

/// A Kubernetes object the dashboard can list through the pipeline.
pub trait ResourceObject: k8s_openapi::Metadata<Ty = ObjectMeta> {
    const RESOURCE_KIND: ResourceKind;
    /// Whether metrics can be looked up for this kind.
    const HAS_METRICS: bool = true;

    /// Labels selecting the pods owned by this object, if any.
    fn pod_selector(&self) -> Option<BTreeMap<String, String>> { None }

    /// Properties beyond name, namespace and creationTimestamp.
    fn extra_property(&self, _name: &str) -> Option<ComparableValue> { None }
}

/// Data cell wrapping one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceCell<T>(pub T);

impl<T> ResourceCell<T> {
    pub fn into_inner(self) -> T { self.0 }
}

impl<T: ResourceObject> DataCell for ResourceCell<T> {
    fn get_property(&self, name: &PropertyName) -> Option<ComparableValue> {
        let meta = self.0.metadata();
        match name.as_str() {
            PropertyName::NAME => Some(ComparableValue::string(meta.name.clone().unwrap_or_default())),
            PropertyName::NAMESPACE => Some(ComparableValue::string(meta.namespace.clone().unwrap_or_default())),
            PropertyName::CREATION_TIMESTAMP => meta.creation_timestamp.as_ref().map(|t| ComparableValue::Time(t.0)),
            other => self.0.extra_property(other),
        }
    }

    fn as_metric_cell(&self) -> Option<&dyn MetricDataCell> {
        if T::HAS_METRICS { Some(self) } else { None }
    }
}

impl<T: ResourceObject> MetricDataCell for ResourceCell<T> {
    fn get_resource_selector(&self) -> ResourceSelector {
        let meta = self.0.metadata();
        ResourceSelector {
            namespace: meta.namespace.clone().unwrap_or_default(),
            resource_type: T::RESOURCE_KIND,
            resource_name: meta.name.clone().unwrap_or_default(),
            selector: self.0.pod_selector(),
            uid: meta.uid.clone().unwrap_or_default(),
        }
    }
}

pub fn to_cells<T: ResourceObject>(objects: Vec<T>) -> Vec<ResourceCell<T>> {
    objects.into_iter().map(ResourceCell).collect()
}

pub fn from_cells<T>(cells: Vec<ResourceCell<T>>) -> Vec<T> {
    cells.into_iter().map(ResourceCell::into_inner).collect()
}

/// `matchLabels` of a label selector; `None` when it has none.
pub(crate) fn match_labels(selector: &LabelSelector) -> Option<BTreeMap<String, String>> {
    selector.match_labels.clone().filter(|m| !m.is_empty())
}
