mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;

pub use availability::{alternative_slots, free_slots, merge_overlapping, subtract_intervals};
pub use error::EngineError;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::config::EngineConfig;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability;

pub type SharedResourceState = Arc<RwLock<ResourceState>>;

/// The reservation ledger.
///
/// Each resource sits behind its own lock together with its occupancy index
/// and the reservations booked on it. Operations that span resources take
/// their locks in name order.
pub struct Engine {
    pub(super) state: DashMap<String, SharedResourceState>,
    /// Reverse lookup: reservation id → resource name.
    pub(super) entity_to_resource: DashMap<ReservationId, String>,
    next_id: AtomicU64,
    auto_resolve: AtomicBool,
    config: EngineConfig,
    pub notify: Arc<NotifyHub>,
}

impl Engine {
    pub fn new<I, S>(resources: I, config: EngineConfig, notify: Arc<NotifyHub>) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let engine = Self {
            state: DashMap::new(),
            entity_to_resource: DashMap::new(),
            next_id: AtomicU64::new(1),
            auto_resolve: AtomicBool::new(config.auto_resolve),
            config,
            notify,
        };
        for name in resources {
            engine.add_resource(name)?;
        }
        tracing::info!(
            "reservation ledger ready: {} resources, axis {} minutes",
            engine.state.len(),
            engine.config.axis_len
        );
        Ok(engine)
    }

    /// Default config and a private notify hub.
    pub fn with_resources<I, S>(resources: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(resources, EngineConfig::default(), Arc::new(NotifyHub::new()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn enable_auto_resolve(&self, enable: bool) {
        self.auto_resolve.store(enable, Ordering::SeqCst);
        tracing::info!("auto conflict resolution {}", if enable { "enabled" } else { "disabled" });
    }

    pub fn auto_resolve_enabled(&self) -> bool {
        self.auto_resolve.load(Ordering::SeqCst)
    }

    pub fn get_resource(&self, name: &str) -> Option<SharedResourceState> {
        self.state.get(name).map(|e| e.value().clone())
    }

    pub fn get_resource_for_entity(&self, id: ReservationId) -> Option<String> {
        self.entity_to_resource.get(&id).map(|e| e.value().clone())
    }

    pub(super) fn next_reservation_id(&self) -> ReservationId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Lookup + write lock. Fails if the resource was removed while we waited.
    pub(super) async fn write_resource(
        &self,
        name: &str,
    ) -> Result<OwnedRwLockWriteGuard<ResourceState>, EngineError> {
        let rs = self
            .get_resource(name)
            .ok_or_else(|| EngineError::UnknownResource(name.to_string()))?;
        let guard = rs.write_owned().await;
        if guard.retired {
            return Err(EngineError::UnknownResource(name.to_string()));
        }
        Ok(guard)
    }

    pub(super) async fn read_resource(
        &self,
        name: &str,
    ) -> Result<OwnedRwLockReadGuard<ResourceState>, EngineError> {
        let rs = self
            .get_resource(name)
            .ok_or_else(|| EngineError::UnknownResource(name.to_string()))?;
        let guard = rs.read_owned().await;
        if guard.retired {
            return Err(EngineError::UnknownResource(name.to_string()));
        }
        Ok(guard)
    }

    /// Read locks on every live resource, acquired and returned in name order.
    pub(super) async fn read_all(&self) -> Vec<OwnedRwLockReadGuard<ResourceState>> {
        let mut entries: Vec<(String, SharedResourceState)> = self
            .state
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut guards = Vec::with_capacity(entries.len());
        for (_, rs) in entries {
            let guard = rs.read_owned().await;
            if !guard.retired {
                guards.push(guard);
            }
        }
        guards
    }

    /// Write locks on two distinct resources, taken in name order.
    /// Returned as `(first, second)` matching the argument order.
    pub(super) async fn write_pair(
        &self,
        first: &str,
        second: &str,
    ) -> Result<(OwnedRwLockWriteGuard<ResourceState>, OwnedRwLockWriteGuard<ResourceState>), EngineError>
    {
        debug_assert_ne!(first, second);
        if first < second {
            let a = self.write_resource(first).await?;
            let b = self.write_resource(second).await?;
            Ok((a, b))
        } else {
            let b = self.write_resource(second).await?;
            let a = self.write_resource(first).await?;
            Ok((a, b))
        }
    }

    /// Write lock on the resource currently holding reservation `id`.
    ///
    /// The id→resource map is only changed under the owning resource's lock,
    /// so if the reservation is missing once we hold the lock it either moved
    /// (retry with the new owner) or is gone.
    pub(super) async fn resolve_entity_write(
        &self,
        id: ReservationId,
    ) -> Result<OwnedRwLockWriteGuard<ResourceState>, EngineError> {
        loop {
            let resource = self
                .get_resource_for_entity(id)
                .ok_or(EngineError::NotFound(id))?;
            let guard = self
                .write_resource(&resource)
                .await
                .map_err(|_| EngineError::NotFound(id))?;
            if guard.get(id).is_some() {
                return Ok(guard);
            }
            drop(guard);
            if !self.moved_elsewhere(id, &resource) {
                return Err(EngineError::NotFound(id));
            }
        }
    }

    /// True if the id map now places `id` on a resource other than `resource`.
    /// Called after a lock on `resource` showed the reservation missing.
    pub(super) fn moved_elsewhere(&self, id: ReservationId, resource: &str) -> bool {
        self.get_resource_for_entity(id)
            .is_some_and(|owner| owner != resource)
    }

    pub(super) fn record_gauges(&self) {
        metrics::gauge!(observability::RESERVATIONS_ACTIVE).set(self.entity_to_resource.len() as f64);
        metrics::gauge!(observability::RESOURCES_ACTIVE).set(self.state.len() as f64);
    }
}

/// Record latency for `op`.
pub(super) fn observe(op: &'static str, started: Instant) {
    metrics::histogram!(observability::OPERATION_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
}
