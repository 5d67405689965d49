//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则。实现方自行负责内部同步。

use std::collections::HashMap;

use async_trait::async_trait;
use rideops_errors::DispatchResult;
use uuid::Uuid;

use crate::entities::{Employee, RideRequest, RideStatus, Shift};
use crate::events::RideEvent;

/// 在单个行程的临界区内执行的变更
///
/// 变更作用于当前记录的副本；返回 `Ok` 时副本整体写回，返回 `Err` 时原记录不变。
/// 仓储在变更返回后只再校验 id 与 [`RideRequest::check_invariants`]，
/// 带外部副作用的变更应先自行完成这两项校验，再把副作用放在最后一步。
pub type RideMutation = Box<dyn FnOnce(&mut RideRequest) -> DispatchResult<()> + Send>;

/// 行程仓储抽象
#[async_trait]
pub trait RideRepository: Send + Sync {
    async fn create(&self, ride: RideRequest) -> DispatchResult<RideRequest>;
    async fn get_by_id(&self, id: Uuid) -> DispatchResult<Option<RideRequest>>;
    /// 按创建顺序返回全部行程
    async fn list(&self) -> DispatchResult<Vec<RideRequest>>;
    /// 按创建顺序返回指定状态的行程
    async fn list_by_status(&self, status: RideStatus) -> DispatchResult<Vec<RideRequest>>;
    async fn count_by_status(&self) -> DispatchResult<HashMap<RideStatus, usize>>;
    /// 以行程 id 为粒度的原子 读取-校验-写入，行程不存在时返回 `RideNotFound`
    async fn compare_and_set(&self, id: Uuid, mutation: RideMutation)
        -> DispatchResult<RideRequest>;
}

/// 员工（司机/调度）仓储抽象
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn upsert(&self, employee: Employee) -> DispatchResult<Employee>;
    async fn get_by_id(&self, id: &str) -> DispatchResult<Option<Employee>>;
    async fn list_drivers(&self) -> DispatchResult<Vec<Employee>>;
    /// 打卡上班/下班
    async fn set_active(&self, id: &str, active: bool) -> DispatchResult<Employee>;
}

/// 排班仓储抽象
#[async_trait]
pub trait ShiftRepository: Send + Sync {
    async fn create(&self, shift: Shift) -> DispatchResult<Shift>;
    async fn list(&self) -> DispatchResult<Vec<Shift>>;
    async fn delete(&self, id: &str) -> DispatchResult<Shift>;
}

/// 乘客连续爽约台账
///
/// 同一乘客键上的操作必须是原子的；调用方传入的键已规范化。
pub trait MissLedger: Send + Sync {
    fn get(&self, rider_key: &str) -> u32;
    fn increment(&self, rider_key: &str) -> u32;
    fn reset(&self, rider_key: &str);
}

/// 状态转换事件发布
#[async_trait]
pub trait RideEventPublisher: Send + Sync {
    async fn publish(&self, event: &RideEvent) -> DispatchResult<()>;
}
