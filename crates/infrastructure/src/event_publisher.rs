use async_trait::async_trait;
use rideops_domain::{events::RideEvent, repositories::RideEventPublisher};
use rideops_errors::DispatchResult;
use tokio::sync::broadcast;
use tracing::debug;

/// 基于 tokio broadcast 的事件发布器
///
/// 通知层通过 [`BroadcastEventPublisher::subscribe`] 接收事件。
/// 订阅者处理过慢时会丢失最旧的事件。
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<RideEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RideEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl RideEventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: &RideEvent) -> DispatchResult<()> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                debug!("事件 {} 已发送给 {} 个订阅者", event.event_type(), receivers);
            }
            // 没有订阅者不算失败
            Err(_) => debug!("事件 {} 无订阅者", event.event_type()),
        }
        Ok(())
    }
}
