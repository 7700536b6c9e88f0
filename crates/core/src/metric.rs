//! Metric data model shared by the pipeline and metric clients.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ResourceKind;

pub const CPU_USAGE: &str = "cpu/usage_rate";
pub const MEMORY_USAGE: &str = "memory/usage";

/// One point of a time series; `x` is a Unix timestamp bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: u64,
}

/// UIDs of the resources that contributed to a metric, per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label(pub BTreeMap<ResourceKind, Vec<String>>);

impl Label {
    pub fn new() -> Self { Self::default() }

    pub fn single(kind: ResourceKind, uid: impl Into<String>) -> Self {
        let mut m = BTreeMap::new();
        m.insert(kind, vec![uid.into()]);
        Self(m)
    }

    pub fn is_empty(&self) -> bool { self.0.values().all(|v| v.is_empty()) }

    pub fn uids(&self, kind: ResourceKind) -> &[String] {
        self.0.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Union `other` into `self`. A UID already present under any kind is
    /// not added again.
    pub fn add_metric_label(&mut self, other: &Label) {
        let mut seen: std::collections::HashSet<String> =
            self.0.values().flatten().cloned().collect();
        for (kind, uids) in other.0.iter() {
            for uid in uids {
                if seen.insert(uid.clone()) {
                    self.0.entry(*kind).or_default().push(uid.clone());
                }
            }
        }
    }
}

/// How several series sharing an X coordinate are folded into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AggregationMode {
    #[default]
    Sum,
    Max,
    Min,
    /// Unrecognised mode from the wire; aggregation falls back to the default.
    Other(String),
}

impl AggregationMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sum => "sum",
            Self::Max => "max",
            Self::Min => "min",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for AggregationMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "sum" => Self::Sum,
            "max" => Self::Max,
            "min" => Self::Min,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for AggregationMode {
    fn from(s: &str) -> Self { Self::from(s.to_string()) }
}

impl From<AggregationMode> for String {
    fn from(m: AggregationMode) -> Self { m.as_str().to_string() }
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

pub type AggregationModes = Vec<AggregationMode>;

pub fn only_sum_aggregation() -> AggregationModes { vec![AggregationMode::Sum] }

pub fn only_default_aggregation() -> AggregationModes { vec![AggregationMode::default()] }

/// A named, labeled time series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub data_points: Vec<DataPoint>,
    #[serde(default)]
    pub metric_points: Vec<MetricPoint>,
    pub metric_name: String,
    #[serde(skip)]
    pub label: Label,
    #[serde(rename = "aggregation", default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregationMode>,
}

impl Metric {
    pub fn new(metric_name: impl Into<String>, data_points: Vec<DataPoint>) -> Self {
        Self { metric_name: metric_name.into(), data_points, ..Default::default() }
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_union_skips_known_uids() {
        let mut a = Label::single(ResourceKind::Pod, "p1");
        let mut b = Label::single(ResourceKind::Pod, "p1");
        b.0.entry(ResourceKind::Pod).or_default().push("p2".into());
        b.0.entry(ResourceKind::Deployment).or_default().push("d1".into());
        a.add_metric_label(&b);
        assert_eq!(a.uids(ResourceKind::Pod), &["p1".to_string(), "p2".to_string()]);
        assert_eq!(a.uids(ResourceKind::Deployment), &["d1".to_string()]);

        // adding the same label again is a no-op
        let before = a.clone();
        a.add_metric_label(&b);
        assert_eq!(a, before);
    }

    #[test]
    fn aggregation_modes_round_trip_through_strings() {
        assert_eq!(AggregationMode::from("max"), AggregationMode::Max);
        assert_eq!(AggregationMode::from("avg"), AggregationMode::Other("avg".into()));
        let json = serde_json::to_string(&vec![AggregationMode::Sum, AggregationMode::Min]).unwrap();
        assert_eq!(json, r#"["sum","min"]"#);
    }

    #[test]
    fn metric_serializes_camel_case_without_label() {
        let m = Metric::new(CPU_USAGE, vec![DataPoint { x: 10, y: 7 }])
            .with_label(Label::single(ResourceKind::Pod, "p1"));
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["metricName"], "cpu/usage_rate");
        assert_eq!(v["dataPoints"][0]["y"], 7);
        assert!(v.get("label").is_none());
        assert!(v.get("aggregation").is_none());
    }
}
