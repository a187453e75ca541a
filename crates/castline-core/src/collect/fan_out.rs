use std::{fmt::Debug, future::Future, time::Duration};

use castline_types::FetchError;
use futures::{stream, StreamExt};

pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct FanOutOptions {
    /// Maximum number of lookups in flight.
    pub concurrency: usize,
    /// Per-key deadline. A key that misses it is reported as unavailable.
    pub deadline: Option<Duration>,
}

impl Default for FanOutOptions {
    fn default() -> Self {
        Self { concurrency: DEFAULT_CONCURRENCY, deadline: None }
    }
}

/// Results of a fan-out, one entry per key in input order.
/// `None` marks a key whose lookup stayed unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOut<K, V> {
    entries: Vec<(K, Option<V>)>,
}

impl<K, V> FanOut<K, V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, Option<V>)> {
        self.entries.iter()
    }

    pub fn unavailable(&self) -> Vec<&K> {
        self.entries.iter().filter(|(_, v)| v.is_none()).map(|(k, _)| k).collect()
    }

    pub fn resolved(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().filter_map(|(k, v)| v.as_ref().map(|v| (k, v)))
    }

    pub fn into_entries(self) -> Vec<(K, Option<V>)> {
        self.entries
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for FanOut<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Run `lookup` for every key with bounded concurrency.
///
/// Results keep the order of `keys` regardless of completion order. A lookup
/// returning `Ok(None)`, or missing the deadline, leaves its key unavailable
/// without affecting the others. The first `Err` aborts the fan-out.
pub async fn fan_out<K, V, F, Fut>(
    keys: Vec<K>,
    options: FanOutOptions,
    lookup: F,
) -> Result<FanOut<K, V>, FetchError>
where
    K: Clone + Debug,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<Option<V>, FetchError>>,
{
    let total = keys.len();
    let concurrency = options.concurrency.max(1);

    tracing::debug!("Starting fan-out over {} keys with concurrency {}", total, concurrency);

    let mut results = stream::iter(keys.into_iter())
        .map(|key| {
            let pending = lookup(key.clone());
            async move {
                let outcome = match options.deadline {
                    Some(deadline) => match tokio::time::timeout(deadline, pending).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            tracing::warn!("Lookup for {:?} missed its {:?} deadline", key, deadline);
                            Ok(None)
                        }
                    },
                    None => pending.await,
                };
                (key, outcome)
            }
        })
        .buffered(concurrency);

    let mut entries = Vec::with_capacity(total);
    while let Some((key, outcome)) = results.next().await {
        match outcome {
            Ok(value) => entries.push((key, value)),
            Err(err) => {
                tracing::error!(error = %err, "Lookup for {:?} failed, aborting fan-out", key);
                return Err(err);
            }
        }
    }

    let fan_out = FanOut { entries };
    let missing = fan_out.unavailable().len();
    if missing > 0 {
        tracing::warn!("Fan-out completed with {}/{} keys unavailable", missing, total);
    } else {
        tracing::debug!("Fan-out completed, resolved {} keys", total);
    }

    Ok(fan_out)
}
