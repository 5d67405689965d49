use std::collections::HashMap;

use async_trait::async_trait;
use rideops_domain::{entities::Employee, repositories::EmployeeRepository};
use rideops_errors::{DispatchError, DispatchResult};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 内存员工仓储
#[derive(Debug, Default)]
pub struct InMemoryEmployeeRepository {
    employees: RwLock<HashMap<String, Employee>>,
}

impl InMemoryEmployeeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees(employees: Vec<Employee>) -> Self {
        Self {
            employees: RwLock::new(
                employees
                    .into_iter()
                    .map(|employee| (employee.id.clone(), employee))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn upsert(&self, employee: Employee) -> DispatchResult<Employee> {
        let mut employees = self.employees.write().await;
        employees.insert(employee.id.clone(), employee.clone());
        debug!("保存员工信息: {}", employee.id);
        Ok(employee)
    }

    async fn get_by_id(&self, id: &str) -> DispatchResult<Option<Employee>> {
        Ok(self.employees.read().await.get(id).cloned())
    }

    async fn list_drivers(&self) -> DispatchResult<Vec<Employee>> {
        let employees = self.employees.read().await;
        let mut drivers: Vec<Employee> = employees
            .values()
            .filter(|employee| employee.is_driver())
            .cloned()
            .collect();
        drivers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(drivers)
    }

    async fn set_active(&self, id: &str, active: bool) -> DispatchResult<Employee> {
        let mut employees = self.employees.write().await;
        let employee = employees
            .get_mut(id)
            .ok_or_else(|| DispatchError::employee_not_found(id))?;
        employee.active = active;
        info!(
            "员工 {} {}",
            id,
            if active { "已打卡上班" } else { "已打卡下班" }
        );
        Ok(employee.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_drivers_excludes_office() {
        let repo = InMemoryEmployeeRepository::with_employees(vec![
            Employee::driver("emp2", "Avery"),
            Employee::office("office", "Office"),
            Employee::driver("emp1", "Jamie"),
        ]);

        let drivers = repo.list_drivers().await.unwrap();
        let ids: Vec<&str> = drivers.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["emp1", "emp2"]);
    }

    #[tokio::test]
    async fn test_set_active() {
        let repo = InMemoryEmployeeRepository::with_employees(vec![Employee::driver(
            "emp1", "Jamie",
        )]);

        let clocked_in = repo.set_active("emp1", true).await.unwrap();
        assert!(clocked_in.active);
        assert!(repo.get_by_id("emp1").await.unwrap().unwrap().active);

        let clocked_out = repo.set_active("emp1", false).await.unwrap();
        assert!(!clocked_out.active);

        let err = repo.set_active("ghost", true).await.unwrap_err();
        assert!(matches!(err, DispatchError::EmployeeNotFound { .. }));
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let repo = InMemoryEmployeeRepository::new();
        repo.upsert(Employee::driver("emp1", "Jamie")).await.unwrap();
        repo.upsert(Employee::driver("emp1", "Jamie R.")).await.unwrap();

        let employee = repo.get_by_id("emp1").await.unwrap().unwrap();
        assert_eq!(employee.name, "Jamie R.");
    }
}
