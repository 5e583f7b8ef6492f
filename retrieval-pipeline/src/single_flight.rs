use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;

/// The shared execution ended without producing a value (it panicked).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shared execution ended without a result: {0}")]
pub struct FlightAborted(String);

type Flight<T> = Shared<BoxFuture<'static, Result<T, FlightAborted>>>;
type Registry<T> = Arc<Mutex<HashMap<String, Flight<T>>>>;

/// Coalesces concurrent calls that share a key into one execution.
///
/// The execution runs on its own task, so it finishes and drops its entry
/// even when every caller waiting on it has gone away. A later call with the
/// same key always starts fresh.
pub struct SingleFlight<T: Clone> {
    in_flight: Registry<T>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

/// Owned by the spawned execution; removes its key when the task ends.
struct Landing<T: Clone> {
    registry: Registry<T>,
    key: String,
}

impl<T: Clone> Drop for Landing<T> {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Joins the running execution for `key`, or spawns `start()` if none runs.
    /// The flag is `true` when this call started the execution.
    pub async fn run<F, Fut>(&self, key: String, start: F) -> (Result<T, FlightAborted>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (flight, leader) = {
            let mut in_flight = self.registry();
            if let Some(existing) = in_flight.get(&key) {
                (existing.clone(), false)
            } else {
                let landing = Landing {
                    registry: Arc::clone(&self.in_flight),
                    key: key.clone(),
                };
                let work = start();
                let handle = tokio::spawn(async move {
                    let _landing = landing;
                    work.await
                });
                let flight = handle
                    .map(|joined| joined.map_err(|err| FlightAborted(err.to_string())))
                    .boxed()
                    .shared();
                in_flight.insert(key, flight.clone());
                (flight, true)
            }
        };

        (flight.await, leader)
    }

    pub fn in_flight(&self) -> usize {
        self.registry().len()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Flight<T>>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
