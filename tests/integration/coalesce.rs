//! Key-coalescing loader built on shared futures.
//!
//! Concurrent requests for one key share a single in-flight load; a
//! reference count decides when the entry is evicted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use promissory::prelude::*;
use promissory::runtime::executor::try_spawn;

struct Entry<V> {
    future: SharedFuture<Arc<V>>,
    refs: usize,
}

struct Loader<V> {
    executor: PoolExecutor,
    entries: Mutex<HashMap<String, Entry<V>>>,
    load: Arc<dyn Fn(&str) -> Outcome<V> + Send + Sync>,
}

impl<V: Send + Sync + 'static> Loader<V> {
    fn new<F>(
        executor: PoolExecutor,
        load: F,
    ) -> Self
    where
        F: Fn(&str) -> Outcome<V> + Send + Sync + 'static,
    {
        Self {
            executor,
            entries: Mutex::new(HashMap::new()),
            load: Arc::new(load),
        }
    }

    fn acquire(
        &self,
        key: &str,
    ) -> SharedFuture<Arc<V>> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.to_string()).or_insert_with(|| {
            let load = Arc::clone(&self.load);
            let key = key.to_string();
            let future = try_spawn(&self.executor, move || (*load)(&key).map(Arc::new)).share();
            Entry { future, refs: 0 }
        });
        entry.refs += 1;
        entry.future.clone()
    }

    fn release(
        &self,
        key: &str,
    ) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.refs -= 1;
            if entry.refs == 0 {
                entries.remove(key);
            }
        }
    }

    fn cached(&self) -> usize {
        self.entries.lock().len()
    }
}

fn counting_loader(
    runtime: &Runtime,
    loads: &Arc<AtomicUsize>,
) -> Arc<Loader<String>> {
    let loads = Arc::clone(loads);
    Arc::new(Loader::new(runtime.executor(), move |key: &str| {
        loads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        Ok(format!("asset:{}", key))
    }))
}

#[test]
fn test_concurrent_requests_share_one_load() {
    let runtime = Runtime::with_threads(4).unwrap();
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = counting_loader(&runtime, &loads);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let loader = Arc::clone(&loader);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let asset = loader.acquire("mesh").get().unwrap();
                asset.len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "asset:mesh".len());
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    runtime.shutdown();
}

#[test]
fn test_waiters_observe_the_same_instance() {
    let runtime = Runtime::with_threads(2).unwrap();
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = counting_loader(&runtime, &loads);

    let a = loader.acquire("texture");
    let b = loader.acquire("texture");
    assert!(a.ptr_eq(&b));
    assert!(Arc::ptr_eq(&a.get().unwrap(), &b.get().unwrap()));
    runtime.shutdown();
}

#[test]
fn test_distinct_keys_load_separately() {
    let runtime = Runtime::with_threads(4).unwrap();
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = counting_loader(&runtime, &loads);

    let futures: Vec<_> = ["a", "b", "c", "a", "b", "c"]
        .iter()
        .map(|key| loader.acquire(key))
        .collect();
    let values: Vec<String> = futures
        .iter()
        .map(|f| f.get().unwrap().to_string())
        .collect();

    assert_eq!(values[0], values[3]);
    assert_eq!(values[2], "asset:c");
    assert_eq!(loads.load(Ordering::SeqCst), 3);
    runtime.shutdown();
}

#[test]
fn test_reference_count_decides_eviction() {
    let runtime = Runtime::with_threads(2).unwrap();
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = counting_loader(&runtime, &loads);

    let first = loader.acquire("sound");
    let second = loader.acquire("sound");
    first.wait();

    loader.release("sound");
    assert_eq!(loader.cached(), 1);
    loader.release("sound");
    assert_eq!(loader.cached(), 0);

    // Handles outlive the entry; the next request starts a fresh load.
    assert_eq!(second.get().unwrap().as_str(), "asset:sound");
    loader.acquire("sound").wait();
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    runtime.shutdown();
}

#[test]
fn test_failed_load_reaches_every_waiter() {
    let runtime = Runtime::with_threads(2).unwrap();
    let loader: Loader<String> = Loader::new(runtime.executor(), |key: &str| {
        Err(Error::msg(format!("no such asset: {}", key)))
    });

    let a = loader.acquire("missing");
    let b = loader.acquire("missing");
    let (ea, eb) = (a.get().unwrap_err(), b.get().unwrap_err());
    assert!(ea.ptr_eq(&eb));
    assert_eq!(ea.to_string(), "no such asset: missing");
    runtime.shutdown();
}

#[test]
fn test_continuations_on_a_coalesced_load() {
    let runtime = Runtime::with_threads(2).unwrap();
    let loads = Arc::new(AtomicUsize::new(0));
    let loader = counting_loader(&runtime, &loads);

    let sizes: Vec<_> = (0..4)
        .map(|i| {
            loader
                .acquire("shader")
                .via(runtime.executor())
                .then(move |asset: &Arc<String>| asset.len() + i)
        })
        .collect();
    let sizes: Vec<usize> = sizes.into_iter().map(|f| f.get().unwrap()).collect();

    let base = "asset:shader".len();
    assert_eq!(sizes, vec![base, base + 1, base + 2, base + 3]);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    runtime.shutdown();
}
