use async_trait::async_trait;
use rideops_domain::{entities::Shift, repositories::ShiftRepository};
use rideops_errors::{DispatchError, DispatchResult};
use tokio::sync::RwLock;
use tracing::debug;

/// 内存排班仓储，按添加顺序保存
#[derive(Debug, Default)]
pub struct InMemoryShiftRepository {
    shifts: RwLock<Vec<Shift>>,
}

impl InMemoryShiftRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shifts(shifts: Vec<Shift>) -> Self {
        Self {
            shifts: RwLock::new(shifts),
        }
    }
}

#[async_trait]
impl ShiftRepository for InMemoryShiftRepository {
    async fn create(&self, shift: Shift) -> DispatchResult<Shift> {
        let mut shifts = self.shifts.write().await;
        if shifts.iter().any(|existing| existing.id == shift.id) {
            return Err(DispatchError::validation_error(format!(
                "排班已存在: {}",
                shift.id
            )));
        }
        shifts.push(shift.clone());
        debug!("添加排班: {} (员工 {})", shift.id, shift.employee_id);
        Ok(shift)
    }

    async fn list(&self) -> DispatchResult<Vec<Shift>> {
        Ok(self.shifts.read().await.clone())
    }

    async fn delete(&self, id: &str) -> DispatchResult<Shift> {
        let mut shifts = self.shifts.write().await;
        let index = shifts
            .iter()
            .position(|shift| shift.id == id)
            .ok_or_else(|| DispatchError::shift_not_found(id))?;
        let removed = shifts.remove(index);
        debug!("删除排班: {}", removed.id);
        Ok(removed)
    }
}
