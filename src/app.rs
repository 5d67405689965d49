use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rideops_config::{watch_config_file, AppConfig, ConfigWatchGuard, PolicyConfigHandle};
use rideops_dispatcher::{default_roster, default_shifts, DispatchController};
use rideops_domain::entities::RideRequest;
use rideops_domain::events::RideEvent;
use rideops_infrastructure::{
    BroadcastEventPublisher, InMemoryEmployeeRepository, InMemoryMissLedger,
    InMemoryRideRepository, InMemoryShiftRepository,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 主应用程序：组装仓储、策略与控制器
pub struct Application {
    config_path: Option<PathBuf>,
    policy: PolicyConfigHandle,
    publisher: BroadcastEventPublisher,
    controller: Arc<DispatchController>,
}

impl Application {
    /// `config_path` 为 None 时不监听配置文件
    pub fn new(config: AppConfig, config_path: Option<PathBuf>) -> Result<Self> {
        let policy = PolicyConfigHandle::from_app_config(&config).context("构建策略配置失败")?;
        let publisher = BroadcastEventPublisher::new(config.dispatch.event_channel_capacity);

        let controller = DispatchController::new(
            Arc::new(InMemoryRideRepository::new()),
            Arc::new(InMemoryEmployeeRepository::with_employees(default_roster())),
            Arc::new(InMemoryShiftRepository::with_shifts(default_shifts())),
            Arc::new(InMemoryMissLedger::new()),
            Arc::new(publisher.clone()),
            policy.clone(),
        );

        info!(
            "应用初始化完成: 暂停阈值 {}, 宽限期 {} 分钟",
            config.no_show.suspension_threshold, config.dispatch.grace_period_minutes
        );

        Ok(Self {
            config_path,
            policy,
            publisher,
            controller: Arc::new(controller),
        })
    }

    pub fn controller(&self) -> Arc<DispatchController> {
        Arc::clone(&self.controller)
    }

    pub fn policy(&self) -> &PolicyConfigHandle {
        &self.policy
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RideEvent> {
        self.publisher.subscribe()
    }

    pub async fn seed(&self, date: NaiveDate) -> Result<Vec<RideRequest>> {
        self.controller
            .seed_sample_rides(date)
            .await
            .context("插入示例行程失败")
    }

    /// 运行到收到关闭信号为止
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let _watch_guard = self.start_config_watcher()?;
        let notifier = tokio::spawn(run_notifier(self.subscribe()));

        let _ = shutdown_rx.recv().await;
        notifier.abort();

        let summary = self.controller.summary().await?;
        info!(
            "应用停止: 共 {} 个行程, 进行中 {}, 已结束 {}",
            summary.total(),
            summary.active(),
            summary.finished()
        );
        Ok(())
    }

    fn start_config_watcher(&self) -> Result<Option<ConfigWatchGuard>> {
        match &self.config_path {
            Some(path) => {
                let guard = watch_config_file(path, self.policy.clone())
                    .with_context(|| format!("监听配置文件失败: {}", path.display()))?;
                Ok(Some(guard))
            }
            None => Ok(None),
        }
    }
}

/// 通知层的占位实现：把每个事件写入日志
async fn run_notifier(mut events: broadcast::Receiver<RideEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => info!(
                "通知: {} 行程 {} 乘客 {} (操作方 {})",
                event.event_type(),
                event.ride_id,
                event.ride.rider.email,
                event.actor
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("通知处理过慢，丢失 {} 个事件", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
