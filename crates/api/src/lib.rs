//! kdash public API façade (in-process).
//!
//! This crate defines the list surface frontends (CLI, HTTP handlers) depend
//! on: request decoding, list assembly and the [`ListApi`] trait with an
//! in-process (kube) and a mock implementation.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt::Debug;
use std::time::{Duration, Instant};

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, ReplicationController};
use kdash_core::{CachedResources, ResourceKind};
use kdash_dataselect::{DataSelectQuery, MetricClient};
use kdash_metrics::{InMemoryMetricClient, MetricsServerClient};
use kdash_resources::ResourceObject;
use kube::api::{Api, ListParams};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub mod list;
pub mod params;

pub use list::{select_list, ListMeta, ResourceList, ResourceListValue};
pub use params::{parse_data_select_query, DataSelectParams};

/// API errors suitable for transport over RPC later.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum KdashError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type KdashResult<T> = Result<T, KdashError>;

/// Runtime configuration read from `KDASH_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// tracing filter (`KDASH_LOG`)
    pub log_filter: String,
    /// Prometheus exporter address (`KDASH_METRICS_ADDR`)
    pub metrics_addr: Option<String>,
    /// Upper bound on one metric download (`KDASH_METRIC_TIMEOUT_SECS`)
    pub metric_timeout: Duration,
    /// Page size when a request names none (`KDASH_DEFAULT_ITEMS_PER_PAGE`)
    pub default_items_per_page: Option<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            metrics_addr: None,
            metric_timeout: Duration::from_secs(10),
            default_items_per_page: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Same as [`Config::from_env`] with a custom variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            log_filter: get("KDASH_LOG").filter(|s| !s.trim().is_empty()).unwrap_or(d.log_filter),
            metrics_addr: get("KDASH_METRICS_ADDR").filter(|s| !s.trim().is_empty()),
            metric_timeout: get("KDASH_METRIC_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(d.metric_timeout),
            default_items_per_page: get("KDASH_DEFAULT_ITEMS_PER_PAGE").and_then(|s| s.parse::<i64>().ok()).filter(|n| *n > 0),
        }
    }
}

/// List surface: one page of one kind, selected by `query`.
#[async_trait::async_trait]
pub trait ListApi: Send + Sync {
    /// `namespace` is ignored for cluster-scoped kinds.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        query: &DataSelectQuery,
    ) -> KdashResult<ResourceListValue>;
}

fn is_cluster_scoped(kind: ResourceKind) -> bool { matches!(kind, ResourceKind::Node | ResourceKind::Namespace) }

/// Pods are only needed to resolve workload metrics.
fn needs_pod_cache(kind: ResourceKind, query: &DataSelectQuery) -> bool {
    let wants_metrics = query.metric_query.metric_names.as_ref().is_some_and(|n| !n.is_empty());
    wants_metrics && !matches!(kind, ResourceKind::Pod | ResourceKind::CronJob) && !is_cluster_scoped(kind)
}

fn to_value_list<T: Serialize>(list: ResourceList<T>) -> KdashResult<ResourceListValue> {
    list.into_value().map_err(|e| KdashError::Internal(e.to_string()))
}

/// Run `$body` with `$k` bound to the k8s-openapi type of `$kind`.
macro_rules! with_kind_type {
    ($kind:expr, $k:ident => $body:expr) => {
        match $kind {
            ResourceKind::Pod => { type $k = Pod; $body }
            ResourceKind::Deployment => { type $k = Deployment; $body }
            ResourceKind::ReplicaSet => { type $k = ReplicaSet; $body }
            ResourceKind::ReplicationController => { type $k = ReplicationController; $body }
            ResourceKind::StatefulSet => { type $k = StatefulSet; $body }
            ResourceKind::DaemonSet => { type $k = DaemonSet; $body }
            ResourceKind::Job => { type $k = Job; $body }
            ResourceKind::CronJob => { type $k = CronJob; $body }
            ResourceKind::Node => { type $k = Node; $body }
            ResourceKind::Namespace => { type $k = Namespace; $body }
        }
    };
}

// ----------------- Mock implementation -----------------

/// In-memory implementation for tests: serves canned objects (as JSON) per
/// kind through the real selection pipeline and an in-memory metric client.
#[derive(Default)]
pub struct MockApi {
    pub objects: HashMap<ResourceKind, Vec<serde_json::Value>>,
    pub pods: Vec<Pod>,
    pub metrics: InMemoryMetricClient,
    /// When set, every call fails with this error.
    pub fail_with: Option<KdashError>,
}

impl MockApi {
    pub fn new() -> Self { Self::default() }

    pub fn with_objects<T: ResourceObject + Serialize>(mut self, objects: &[T]) -> Self {
        let values = objects.iter().filter_map(|o| serde_json::to_value(o).ok());
        self.objects.entry(T::RESOURCE_KIND).or_default().extend(values);
        self
    }

    async fn select<K>(&self, namespace: Option<&str>, query: &DataSelectQuery) -> KdashResult<ResourceListValue>
    where
        K: ResourceObject + Serialize + DeserializeOwned + Send,
    {
        let raw = self.objects.get(&K::RESOURCE_KIND).map(|v| v.as_slice()).unwrap_or(&[]);
        let objects = raw
            .iter()
            .map(|v| serde_json::from_value::<K>(v.clone()))
            .collect::<Result<Vec<K>, _>>()
            .map_err(|e| KdashError::Internal(e.to_string()))?;
        let objects: Vec<K> = match namespace {
            Some(ns) if !is_cluster_scoped(K::RESOURCE_KIND) => {
                objects.into_iter().filter(|o| o.metadata().namespace.as_deref() == Some(ns)).collect()
            }
            _ => objects,
        };
        let cached = CachedResources::with_pods(self.pods.clone());
        to_value_list(select_list(objects, query, &cached, Some(&self.metrics)).await)
    }
}

#[async_trait::async_trait]
impl ListApi for MockApi {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        query: &DataSelectQuery,
    ) -> KdashResult<ResourceListValue> {
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        with_kind_type!(kind, K => self.select::<K>(namespace, query).await)
    }
}

// ----------------- In-process implementation -----------------

/// In-process implementation that lists through kube and reads metrics from
/// metrics-server.
pub struct InProcApi {
    client: kube::Client,
    metrics: MetricsServerClient,
}

impl InProcApi {
    pub fn new(client: kube::Client, config: &Config) -> Self {
        let metrics = MetricsServerClient::new(client.clone(), config.metric_timeout);
        Self { client, metrics }
    }

    pub async fn try_default(config: &Config) -> KdashResult<Self> {
        let client = kube::Client::try_default().await.map_err(|e| KdashError::Internal(e.to_string()))?;
        Ok(Self::new(client, config))
    }

    fn map_err(e: kube::Error) -> KdashError {
        match e {
            kube::Error::Api(ae) if ae.code == 404 => KdashError::NotFound(ae.message),
            kube::Error::Api(ae) if ae.code == 400 || ae.code == 422 => KdashError::Validation(ae.message),
            other => KdashError::Internal(other.to_string()),
        }
    }

    async fn fetch<K>(&self, namespace: Option<&str>) -> Result<Vec<K>, kube::Error>
    where
        K: ResourceObject + kube::Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let mut lp = ListParams::default();
        if let Some(ns) = namespace.filter(|_| !is_cluster_scoped(K::RESOURCE_KIND)) {
            lp = lp.fields(&format!("metadata.namespace={}", ns));
        }
        Ok(api.list(&lp).await?.items)
    }

    async fn select<K>(&self, namespace: Option<&str>, query: &DataSelectQuery) -> KdashResult<ResourceListValue>
    where
        K: ResourceObject + kube::Resource<DynamicType = ()> + Clone + DeserializeOwned + Serialize + Debug + Send + Sync,
    {
        let t0 = Instant::now();
        info!(kind = %K::RESOURCE_KIND, ns = %namespace.unwrap_or("(all)"), "api: list start");
        let objects = self.fetch::<K>(namespace).await.map_err(Self::map_err)?;
        let mut errors = Vec::new();
        let cached = if needs_pod_cache(K::RESOURCE_KIND, query) {
            match self.fetch::<Pod>(namespace).await {
                Ok(pods) => CachedResources::with_pods(pods),
                Err(e) => {
                    warn!(error = %e, "api: pod list for metrics failed");
                    errors.push(format!("pods: {}", e));
                    CachedResources::default()
                }
            }
        } else {
            CachedResources::default()
        };
        let client: &dyn MetricClient = &self.metrics;
        let mut list = select_list(objects, query, &cached, Some(client)).await;
        list.errors.extend(errors);
        info!(kind = %K::RESOURCE_KIND, items = list.items.len(), took_ms = %t0.elapsed().as_millis(), "api: list ok");
        to_value_list(list)
    }
}

#[async_trait::async_trait]
impl ListApi for InProcApi {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        query: &DataSelectQuery,
    ) -> KdashResult<ResourceListValue> {
        with_kind_type!(kind, K => self.select::<K>(namespace, query).await)
    }
}
