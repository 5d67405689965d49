use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use rideops_domain::{
    entities::{RideRequest, RideStatus},
    repositories::{RideMutation, RideRepository},
};
use rideops_errors::{DispatchError, DispatchResult};
use tracing::debug;
use uuid::Uuid;

struct RideSlot {
    seq: u64,
    ride: Mutex<RideRequest>,
}

/// 内存行程仓储
///
/// 每个行程拥有独立的互斥锁，不同行程上的操作互不阻塞。
/// 状态索引只在持有行程锁时更新，加锁顺序固定为 行程 -> 索引。
pub struct InMemoryRideRepository {
    slots: RwLock<HashMap<Uuid, Arc<RideSlot>>>,
    status_index: Mutex<HashMap<RideStatus, BTreeMap<u64, Uuid>>>,
    next_seq: AtomicU64,
}

impl InMemoryRideRepository {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            status_index: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(1),
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> DispatchResult<MutexGuard<'_, T>> {
        mutex
            .lock()
            .map_err(|_| DispatchError::Internal("行程存储锁已中毒".to_string()))
    }

    fn slot(&self, id: Uuid) -> DispatchResult<Option<Arc<RideSlot>>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| DispatchError::Internal("行程存储锁已中毒".to_string()))?;
        Ok(slots.get(&id).cloned())
    }

    fn ordered_slots(&self) -> DispatchResult<Vec<Arc<RideSlot>>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| DispatchError::Internal("行程存储锁已中毒".to_string()))?;
        let mut ordered: Vec<Arc<RideSlot>> = slots.values().cloned().collect();
        ordered.sort_by_key(|slot| slot.seq);
        Ok(ordered)
    }

    /// 索引只做整条目的插入和删除，中毒后仍可继续使用
    fn index(&self) -> MutexGuard<'_, HashMap<RideStatus, BTreeMap<u64, Uuid>>> {
        self.status_index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryRideRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RideRepository for InMemoryRideRepository {
    async fn create(&self, ride: RideRequest) -> DispatchResult<RideRequest> {
        ride.check_invariants()?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let id = ride.id;

        let mut slots = self
            .slots
            .write()
            .map_err(|_| DispatchError::Internal("行程存储锁已中毒".to_string()))?;
        if slots.contains_key(&id) {
            return Err(DispatchError::validation_error(format!("行程已存在: {id}")));
        }

        self.index()
            .entry(ride.status)
            .or_default()
            .insert(seq, id);
        slots.insert(
            id,
            Arc::new(RideSlot {
                seq,
                ride: Mutex::new(ride.clone()),
            }),
        );

        debug!("创建行程成功: {}", id);
        Ok(ride)
    }

    async fn get_by_id(&self, id: Uuid) -> DispatchResult<Option<RideRequest>> {
        match self.slot(id)? {
            Some(slot) => Ok(Some(Self::lock(&slot.ride)?.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> DispatchResult<Vec<RideRequest>> {
        let mut rides = Vec::new();
        for slot in self.ordered_slots()? {
            rides.push(Self::lock(&slot.ride)?.clone());
        }
        Ok(rides)
    }

    async fn list_by_status(&self, status: RideStatus) -> DispatchResult<Vec<RideRequest>> {
        let ids: Vec<Uuid> = self.index()
            .get(&status)
            .map(|entries| entries.values().copied().collect())
            .unwrap_or_default();

        let mut rides = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(slot) = self.slot(id)? {
                let ride = Self::lock(&slot.ride)?.clone();
                // 读取索引与读取行程之间状态可能已变化
                if ride.status == status {
                    rides.push(ride);
                }
            }
        }
        Ok(rides)
    }

    async fn count_by_status(&self) -> DispatchResult<HashMap<RideStatus, usize>> {
        let index = self.index();
        Ok(RideStatus::ALL
            .iter()
            .map(|status| (*status, index.get(status).map_or(0, BTreeMap::len)))
            .collect())
    }

    async fn compare_and_set(
        &self,
        id: Uuid,
        mutation: RideMutation,
    ) -> DispatchResult<RideRequest> {
        let slot = self
            .slot(id)?
            .ok_or_else(|| DispatchError::ride_not_found(id.to_string()))?;

        let mut current = Self::lock(&slot.ride)?;
        let mut draft = current.clone();
        mutation(&mut draft)?;

        if draft.id != current.id {
            return Err(DispatchError::Internal(format!("不允许修改行程 id: {id}")));
        }
        draft.check_invariants()?;

        // 变更成功后不再有失败路径
        if draft.status != current.status {
            let mut index = self.index();
            if let Some(entries) = index.get_mut(&current.status) {
                entries.remove(&slot.seq);
            }
            index.entry(draft.status).or_default().insert(slot.seq, id);
        }

        *current = draft.clone();
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rideops_testing_utils::RideRequestBuilder;

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryRideRepository::new();
        let ride = RideRequestBuilder::new().build();
        let created = repo.create(ride.clone()).await.unwrap();

        assert_eq!(created, ride);
        assert_eq!(repo.get_by_id(ride.id).await.unwrap(), Some(ride));
        assert_eq!(repo.get_by_id(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let repo = InMemoryRideRepository::new();
        let ride = RideRequestBuilder::new().build();
        repo.create(ride.clone()).await.unwrap();

        let err = repo.create(ride).await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_preserves_creation_order() {
        let repo = InMemoryRideRepository::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let ride = RideRequestBuilder::new().build();
            ids.push(ride.id);
            repo.create(ride).await.unwrap();
        }

        let listed: Vec<Uuid> = repo.list().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(listed, ids);

        let pending: Vec<Uuid> = repo
            .list_by_status(RideStatus::Pending)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(pending, ids);
    }

    #[tokio::test]
    async fn test_compare_and_set_moves_status_index() {
        let repo = InMemoryRideRepository::new();
        let ride = repo.create(RideRequestBuilder::new().build()).await.unwrap();

        let updated = repo
            .compare_and_set(
                ride.id,
                Box::new(|ride| {
                    ride.status = RideStatus::Approved;
                    Ok(())
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, RideStatus::Approved);

        assert!(repo.list_by_status(RideStatus::Pending).await.unwrap().is_empty());
        assert_eq!(repo.list_by_status(RideStatus::Approved).await.unwrap().len(), 1);

        let counts = repo.count_by_status().await.unwrap();
        assert_eq!(counts[&RideStatus::Approved], 1);
        assert_eq!(counts[&RideStatus::Pending], 0);
        assert_eq!(counts.len(), RideStatus::ALL.len());
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_ride_untouched() {
        let repo = InMemoryRideRepository::new();
        let ride = repo.create(RideRequestBuilder::new().build()).await.unwrap();

        let err = repo
            .compare_and_set(
                ride.id,
                Box::new(|ride| {
                    ride.status = RideStatus::Denied;
                    ride.pickup_location = "changed".to_string();
                    Err(DispatchError::validation_error("rejected"))
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));

        let stored = repo.get_by_id(ride.id).await.unwrap().unwrap();
        assert_eq!(stored, ride);
        assert_eq!(repo.list_by_status(RideStatus::Pending).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_compare_and_set_rejects_driver_invariant_violation() {
        let repo = InMemoryRideRepository::new();
        let ride = repo
            .create(RideRequestBuilder::new().with_status(RideStatus::Approved).build())
            .await
            .unwrap();

        let err = repo
            .compare_and_set(
                ride.id,
                Box::new(|ride| {
                    ride.status = RideStatus::Scheduled;
                    Ok(())
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Internal(_)));
        assert_eq!(
            repo.get_by_id(ride.id).await.unwrap().unwrap().status,
            RideStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_compare_and_set_survives_poisoned_index() {
        let repo = Arc::new(InMemoryRideRepository::new());
        let ride = repo.create(RideRequestBuilder::new().build()).await.unwrap();

        let holder = Arc::clone(&repo);
        let _ = std::thread::spawn(move || {
            let _guard = holder.status_index.lock().unwrap();
            panic!("index holder panicked");
        })
        .join();
        assert!(repo.status_index.is_poisoned());

        let updated = repo
            .compare_and_set(
                ride.id,
                Box::new(|ride| {
                    ride.status = RideStatus::Approved;
                    Ok(())
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, RideStatus::Approved);
        assert_eq!(repo.list_by_status(RideStatus::Approved).await.unwrap().len(), 1);
        assert!(repo.list_by_status(RideStatus::Pending).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compare_and_set_unknown_ride() {
        let repo = InMemoryRideRepository::new();
        let err = repo
            .compare_and_set(Uuid::new_v4(), Box::new(|_| Ok(())))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::RideNotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_are_serialized_per_ride() {
        let repo = Arc::new(InMemoryRideRepository::new());
        let ride = repo
            .create(RideRequestBuilder::new().with_status(RideStatus::Approved).build())
            .await
            .unwrap();
        let ride_id = ride.id;

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = Arc::clone(&repo);
            let driver = format!("emp{i}");
            handles.push(tokio::spawn(async move {
                repo.compare_and_set(
                    ride_id,
                    Box::new(move |ride| ride.assign_driver(&driver, chrono::Utc::now())),
                )
                .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(e) => assert!(matches!(e, DispatchError::AlreadyAssigned { .. })),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(repo.list_by_status(RideStatus::Scheduled).await.unwrap().len(), 1);
    }
}
