//! Single-assignment futures for metrics that are still being downloaded.
//!
//! A promise is created together with its resolver before the producing
//! task starts. The resolver is consumed by `resolve`, so a slot can be
//! written at most once; the promise is consumed by `get_metric`, so it can
//! be read at most once. Sending never blocks the producer.

#![forbid(unsafe_code)]

use kdash_core::{Metric, MetricError};
use tokio::sync::oneshot;

type Slot = Result<Option<Metric>, MetricError>;

/// Reading half of one metric slot.
#[derive(Debug)]
pub struct MetricPromise {
    rx: oneshot::Receiver<Slot>,
}

/// Writing half of one metric slot.
#[derive(Debug)]
pub struct MetricResolver {
    tx: oneshot::Sender<Slot>,
}

impl MetricPromise {
    pub fn new() -> (MetricResolver, MetricPromise) {
        let (tx, rx) = oneshot::channel();
        (MetricResolver { tx }, MetricPromise { rx })
    }

    /// Promise that is already resolved with `metric`.
    pub fn ready(metric: Metric) -> Self {
        let (resolver, promise) = Self::new();
        resolver.resolve(Ok(Some(metric)));
        promise
    }

    /// Wait for the producer. `Ok(None)` means the slot resolved without a
    /// metric; a producer dropped before resolving reads as `Closed`.
    pub async fn get_metric(self) -> Result<Option<Metric>, MetricError> {
        match self.rx.await {
            Ok(slot) => slot,
            Err(_) => Err(MetricError::Closed),
        }
    }
}

impl MetricResolver {
    pub fn resolve(self, value: Result<Option<Metric>, MetricError>) {
        // receiver gone means nobody is interested anymore
        let _ = self.tx.send(value);
    }
}

/// Ordered list of promises, read sequentially.
#[derive(Debug, Default)]
pub struct MetricPromises(Vec<MetricPromise>);

/// Resolvers matching a [`MetricPromises`] list slot for slot.
#[derive(Debug, Default)]
pub struct MetricResolvers(Vec<MetricResolver>);

impl MetricPromises {
    pub fn new(len: usize) -> (MetricResolvers, MetricPromises) {
        let (resolvers, promises): (Vec<_>, Vec<_>) = (0..len).map(|_| MetricPromise::new()).unzip();
        (MetricResolvers(resolvers), MetricPromises(promises))
    }

    pub fn empty() -> Self { Self::default() }

    pub fn ready(metrics: Vec<Metric>) -> Self {
        Self(metrics.into_iter().map(MetricPromise::ready).collect())
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn push(&mut self, promise: MetricPromise) { self.0.push(promise); }

    pub fn extend(&mut self, other: MetricPromises) { self.0.extend(other.0); }

    /// Await every promise in order. Stops at the first error and returns it;
    /// promises after the failing one are dropped unread. Empty slots are
    /// skipped.
    pub async fn get_metrics(self) -> Result<Vec<Metric>, MetricError> {
        let mut out = Vec::with_capacity(self.0.len());
        for promise in self.0 {
            if let Some(metric) = promise.get_metric().await? {
                out.push(metric);
            }
        }
        Ok(out)
    }
}

impl FromIterator<MetricPromise> for MetricPromises {
    fn from_iter<I: IntoIterator<Item = MetricPromise>>(iter: I) -> Self { Self(iter.into_iter().collect()) }
}

impl IntoIterator for MetricPromises {
    type Item = MetricPromise;
    type IntoIter = std::vec::IntoIter<MetricPromise>;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl MetricResolvers {
    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Resolve every slot exactly once. On error every slot gets the error;
    /// otherwise slot `i` gets `metrics[i]`, and slots beyond the end of
    /// `metrics` resolve empty.
    pub fn put_metrics(self, metrics: Result<Vec<Metric>, MetricError>) {
        match metrics {
            Err(e) => {
                for resolver in self.0 {
                    resolver.resolve(Err(e.clone()));
                }
            }
            Ok(metrics) => {
                let mut metrics = metrics.into_iter();
                for resolver in self.0 {
                    resolver.resolve(Ok(metrics.next()));
                }
            }
        }
    }
}

impl IntoIterator for MetricResolvers {
    type Item = MetricResolver;
    type IntoIter = std::vec::IntoIter<MetricResolver>;

    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdash_core::DataPoint;

    fn metric(name: &str, y: i64) -> Metric { Metric::new(name, vec![DataPoint { x: 1, y }]) }

    #[tokio::test]
    async fn put_then_get_returns_all_metrics_in_order() {
        let (resolvers, promises) = MetricPromises::new(2);
        resolvers.put_metrics(Ok(vec![metric("a", 1), metric("b", 2)]));
        let got = promises.get_metrics().await.unwrap();
        assert_eq!(got.iter().map(|m| m.metric_name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn error_fans_out_to_every_slot() {
        let (resolvers, promises) = MetricPromises::new(3);
        resolvers.put_metrics(Err(MetricError::Download("boom".into())));
        let mut n = 0;
        for p in promises {
            assert_eq!(p.get_metric().await, Err(MetricError::Download("boom".into())));
            n += 1;
        }
        assert_eq!(n, 3);
    }

    #[tokio::test]
    async fn get_metrics_returns_first_error() {
        let (r1, p1) = MetricPromise::new();
        let (r2, p2) = MetricPromise::new();
        let (_r3, p3) = MetricPromise::new();
        r1.resolve(Ok(Some(metric("a", 1))));
        r2.resolve(Err(MetricError::Timeout(5)));
        // p3 is never resolved; reading stops at p2 so this does not hang
        let promises: MetricPromises = vec![p1, p2, p3].into_iter().collect();
        assert_eq!(promises.get_metrics().await, Err(MetricError::Timeout(5)));
    }

    #[tokio::test]
    async fn dropped_resolver_reads_as_closed() {
        let (resolver, promise) = MetricPromise::new();
        drop(resolver);
        assert_eq!(promise.get_metric().await, Err(MetricError::Closed));
    }

    #[tokio::test]
    async fn producer_on_another_task_unblocks_reader() {
        let (resolvers, promises) = MetricPromises::new(1);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            resolvers.put_metrics(Ok(vec![metric("late", 9)]));
        });
        let got = promises.get_metrics().await.unwrap();
        assert_eq!(got[0].data_points[0].y, 9);
    }

    #[tokio::test]
    async fn empty_slots_are_skipped() {
        let (resolvers, promises) = MetricPromises::new(2);
        resolvers.put_metrics(Ok(vec![metric("only", 1)]));
        assert_eq!(promises.get_metrics().await.unwrap().len(), 1);
    }
}
