//! kdash core types: comparable values, data cell capabilities, resource
//! selectors and the metric data model.

#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod comparable;
pub mod metric;
pub mod resource;

pub use comparable::ComparableValue;
pub use metric::{
    only_default_aggregation, only_sum_aggregation, AggregationMode, AggregationModes, DataPoint, Label, Metric,
    MetricPoint, CPU_USAGE, MEMORY_USAGE,
};
pub use resource::{CachedResources, ResourceKind, ResourceSelector};

pub mod prelude {
    pub use super::{
        CachedResources, ComparableValue, DataCell, Metric, MetricDataCell, PropertyName, ResourceKind,
        ResourceSelector,
    };
}

/// Name of a sortable/filterable property. The set is open; the constants
/// below are the properties every adapter is expected to understand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyName(pub String);

impl PropertyName {
    pub const NAME: &'static str = "name";
    pub const NAMESPACE: &'static str = "namespace";
    pub const CREATION_TIMESTAMP: &'static str = "creationTimestamp";
    pub const STATUS: &'static str = "status";
    pub const TYPE: &'static str = "type";
    pub const FIRST_SEEN: &'static str = "firstSeen";
    pub const LAST_SEEN: &'static str = "lastSeen";
    pub const REASON: &'static str = "reason";

    pub fn new(s: impl Into<String>) -> Self { Self(s.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for PropertyName {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A resource view model that can report comparable values for named
/// properties. `None` means the property is not supported for this kind.
pub trait DataCell {
    fn get_property(&self, name: &PropertyName) -> Option<ComparableValue>;

    /// Metric capability of this cell, if it has one.
    fn as_metric_cell(&self) -> Option<&dyn MetricDataCell> { None }
}

/// A data cell whose metrics can be looked up.
pub trait MetricDataCell: DataCell {
    fn get_resource_selector(&self) -> ResourceSelector;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("cannot compare {left} value with {right} value")]
    Mismatch { left: &'static str, right: &'static str },
}

/// Failure of a metric download or aggregation. Cloned when one upstream
/// failure resolves several downstream promises.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    #[error("metric download failed: {0}")]
    Download(String),
    #[error("metric download timed out after {0}s")]
    Timeout(u64),
    #[error("unsupported metric: {0}")]
    Unsupported(String),
    #[error("metric producer dropped without resolving")]
    Closed,
    #[error("no async runtime to run the metric task on")]
    NoRuntime,
}
