use std::sync::Arc;

use rideops_config::PolicyConfigHandle;
use rideops_domain::{entities::normalize_rider_key, repositories::MissLedger};
use tracing::{debug, info};

/// 爽约策略：维护乘客连续爽约次数并判断是否暂停服务
///
/// 所有乘客键在访问台账前都会规范化。
#[derive(Clone)]
pub struct NoShowPolicy {
    ledger: Arc<dyn MissLedger>,
    config: PolicyConfigHandle,
}

impl NoShowPolicy {
    pub fn new(ledger: Arc<dyn MissLedger>, config: PolicyConfigHandle) -> Self {
        Self { ledger, config }
    }

    pub fn threshold(&self) -> u32 {
        self.config.snapshot().suspension_threshold
    }

    pub fn miss_count_for(&self, rider_key: &str) -> u32 {
        self.ledger.get(&normalize_rider_key(rider_key))
    }

    pub fn record_no_show(&self, rider_key: &str) -> u32 {
        let key = normalize_rider_key(rider_key);
        let count = self.ledger.increment(&key);
        info!("乘客 {} 爽约，连续爽约次数 {}", key, count);
        count
    }

    pub fn record_completion(&self, rider_key: &str) {
        let key = normalize_rider_key(rider_key);
        self.ledger.reset(&key);
        debug!("乘客 {} 完成行程，连续爽约次数清零", key);
    }

    pub fn is_suspended(&self, rider_key: &str) -> bool {
        self.miss_count_for(rider_key) >= self.threshold()
    }
}

impl std::fmt::Debug for NoShowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoShowPolicy")
            .field("threshold", &self.threshold())
            .finish()
    }
}
