use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use rideops_domain::repositories::MissLedger;

/// 内存爽约台账
///
/// 每个乘客一个原子计数器；计数器在第一次爽约时创建。
#[derive(Debug, Default)]
pub struct InMemoryMissLedger {
    counters: RwLock<HashMap<String, Arc<AtomicU32>>>,
}

impl InMemoryMissLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, rider_key: &str) -> Option<Arc<AtomicU32>> {
        self.counters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(rider_key)
            .cloned()
    }

    fn counter_or_insert(&self, rider_key: &str) -> Arc<AtomicU32> {
        if let Some(counter) = self.counter(rider_key) {
            return counter;
        }
        let mut counters = self
            .counters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(counters.entry(rider_key.to_string()).or_default())
    }

    /// 已知乘客数量
    pub fn len(&self) -> usize {
        self.counters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MissLedger for InMemoryMissLedger {
    fn get(&self, rider_key: &str) -> u32 {
        self.counter(rider_key)
            .map_or(0, |counter| counter.load(Ordering::SeqCst))
    }

    fn increment(&self, rider_key: &str) -> u32 {
        self.counter_or_insert(rider_key)
            .fetch_add(1, Ordering::SeqCst)
            + 1
    }

    fn reset(&self, rider_key: &str) {
        if let Some(counter) = self.counter(rider_key) {
            counter.store(0, Ordering::SeqCst);
        }
    }
}
