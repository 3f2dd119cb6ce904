//! Per-key coalescing of concurrent calls.
//!
//! While a call for a key is in flight, further calls for the same key attach to it and receive its
//! result instead of starting their own. The slot is released once the call completes, so a later
//! call runs again.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use parking_lot::Mutex;

type InFlight<T> = Shared<BoxFuture<'static, T>>;

pub struct Coalescer<K, T: Clone> {
    in_flight: Arc<Mutex<HashMap<K, InFlight<T>>>>,
}

impl<K, T: Clone> Clone for Coalescer<K, T> {
    fn clone(&self) -> Self {
        Self { in_flight: self.in_flight.clone() }
    }
}

impl<K, T: Clone> Default for Coalescer<K, T> {
    fn default() -> Self {
        Self { in_flight: Arc::default() }
    }
}

impl<K, T> Coalescer<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `make()` for `key`, or join the call already in flight for it.
    ///
    /// `make` is only invoked when no call for `key` is running.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&key) {
                Some(running) => {
                    trace!("Joining in-flight call");
                    running.clone()
                }
                None => {
                    let fresh = make().boxed().shared();
                    in_flight.insert(key.clone(), fresh.clone());
                    fresh
                }
            }
        };

        let output = shared.clone().await;

        let mut in_flight = self.in_flight.lock();
        if in_flight.get(&key).is_some_and(|running| running.ptr_eq(&shared)) {
            in_flight.remove(&key);
        }
        output
    }

    /// Number of keys with a call in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}
