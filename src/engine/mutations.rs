use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::limits::*;
use crate::model::*;
use crate::observability::{self, status_label};

use super::availability::alternative_slots;
use super::conflict::{admit, validate_name, validate_request, validate_slot};
use super::{observe, Engine, EngineError};

impl Engine {
    pub fn add_resource(&self, name: impl Into<String>) -> Result<(), EngineError> {
        let name = name.into();
        validate_name(&name)?;
        if self.state.len() >= MAX_RESOURCES {
            return Err(EngineError::LimitExceeded("too many resources"));
        }
        match self.state.entry(name.clone()) {
            Entry::Occupied(_) => return Err(EngineError::AlreadyExists(name)),
            Entry::Vacant(slot) => {
                let rs = ResourceState::new(name.clone(), self.config().axis_len);
                slot.insert(Arc::new(RwLock::new(rs)));
            }
        }
        info!("resource added: {name}");
        self.notify.send(&name, &Event::ResourceAdded { resource: name.clone() });
        self.record_gauges();
        Ok(())
    }

    /// Unregister a resource. Its reservations are removed with it and returned.
    pub async fn remove_resource(&self, name: &str) -> Result<Vec<Reservation>, EngineError> {
        let rs = self
            .get_resource(name)
            .ok_or_else(|| EngineError::UnknownResource(name.to_string()))?;
        let mut guard = rs.clone().write_owned().await;
        if guard.retired {
            return Err(EngineError::UnknownResource(name.to_string()));
        }
        guard.retired = true;
        let cascaded = guard.drain();
        self.state.remove_if(name, |_, current| Arc::ptr_eq(current, &rs));
        for r in &cascaded {
            self.entity_to_resource.remove(&r.id);
        }
        drop(guard);

        info!("resource removed: {name} ({} reservations cancelled)", cascaded.len());
        let event = Event::ResourceRemoved {
            resource: name.to_string(),
            cascaded: cascaded.iter().map(|r| r.id).collect(),
        };
        self.notify.send(name, &event);
        self.notify.remove(name);
        self.record_gauges();
        Ok(cascaded)
    }

    /// Book `request.slot` on `request.resource`, applying the conflict policy.
    pub async fn add_reservation(&self, request: ReservationRequest) -> Result<ReservationId, EngineError> {
        let started = Instant::now();
        let result = self.insert_reservation(request).await;
        metrics::counter!(observability::RESERVATIONS_TOTAL, "status" => status_label(&result)).increment(1);
        observe("add_reservation", started);
        result
    }

    async fn insert_reservation(&self, request: ReservationRequest) -> Result<ReservationId, EngineError> {
        validate_request(&request, self.config().axis_len)?;
        let mut guard = self.write_resource(&request.resource).await?;
        if guard.len() >= MAX_RESERVATIONS_PER_RESOURCE {
            return Err(EngineError::LimitExceeded("too many reservations on resource"));
        }

        let evicted = admit(&mut guard, &request.slot, self.auto_resolve_enabled()).inspect_err(|e| {
            warn!("reservation rejected: {} @ {}: {e}", request.activity, request.resource);
        })?;

        let id = self.next_reservation_id();
        let reservation = request.into_reservation(id);
        guard.insert(reservation.clone());
        self.entity_to_resource.insert(id, reservation.resource.clone());
        if let Some(victim) = evicted {
            self.note_eviction(&victim, id);
        }
        drop(guard);

        info!(
            "reservation {id} admitted: {} @ {} [{}, {})",
            reservation.activity, reservation.resource, reservation.slot.start, reservation.slot.end
        );
        let resource = reservation.resource.clone();
        self.notify.send(&resource, &Event::ReservationAdded { reservation });
        self.record_gauges();
        Ok(id)
    }

    pub async fn remove_reservation(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let mut guard = self.resolve_entity_write(id).await?;
        let removed = guard.remove(id).ok_or(EngineError::NotFound(id))?;
        self.entity_to_resource.remove(&id);
        drop(guard);

        info!("reservation {id} cancelled: {} @ {}", removed.activity, removed.resource);
        self.notify.send(
            &removed.resource,
            &Event::ReservationRemoved { id, resource: removed.resource.clone() },
        );
        self.record_gauges();
        observe("remove_reservation", started);
        Ok(removed)
    }

    /// Replace reservation `id` with `request`, keeping the id.
    ///
    /// Atomic: both resources stay locked for the whole swap, and if the new
    /// slot cannot be admitted the previous reservation is put back unchanged.
    pub async fn update_reservation(
        &self,
        id: ReservationId,
        request: ReservationRequest,
    ) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = self.replace_reservation(id, request).await;
        metrics::counter!(observability::RESERVATIONS_TOTAL, "status" => status_label(&result)).increment(1);
        observe("update_reservation", started);
        result
    }

    async fn replace_reservation(
        &self,
        id: ReservationId,
        request: ReservationRequest,
    ) -> Result<Reservation, EngineError> {
        validate_request(&request, self.config().axis_len)?;
        let auto_resolve = self.auto_resolve_enabled();
        let updated = request.into_reservation(id);

        // The owner is read before locking; a concurrent move means retry.
        let (previous, evicted) = loop {
            let current = self
                .get_resource_for_entity(id)
                .ok_or(EngineError::NotFound(id))?;
            if self.get_resource(&updated.resource).is_none() {
                return Err(EngineError::UnknownResource(updated.resource));
            }

            if current == updated.resource {
                let mut guard = match self.write_resource(&current).await {
                    Ok(guard) => guard,
                    Err(_) if self.moved_elsewhere(id, &current) => continue,
                    Err(_) => return Err(EngineError::NotFound(id)),
                };
                let Some(previous) = guard.remove(id) else {
                    drop(guard);
                    if self.moved_elsewhere(id, &current) {
                        continue;
                    }
                    return Err(EngineError::NotFound(id));
                };
                match admit(&mut guard, &updated.slot, auto_resolve) {
                    Ok(evicted) => {
                        guard.insert(updated.clone());
                        break (previous, evicted);
                    }
                    Err(e) => {
                        guard.insert(previous);
                        return Err(e);
                    }
                }
            }

            let (mut old_guard, mut new_guard) = match self.write_pair(&current, &updated.resource).await {
                Ok(guards) => guards,
                Err(EngineError::UnknownResource(name)) if name == current => {
                    if self.moved_elsewhere(id, &current) {
                        continue;
                    }
                    return Err(EngineError::NotFound(id));
                }
                Err(e) => return Err(e),
            };
            let Some(previous) = old_guard.remove(id) else {
                drop((old_guard, new_guard));
                if self.moved_elsewhere(id, &current) {
                    continue;
                }
                return Err(EngineError::NotFound(id));
            };
            if new_guard.len() >= MAX_RESERVATIONS_PER_RESOURCE {
                old_guard.insert(previous);
                return Err(EngineError::LimitExceeded("too many reservations on resource"));
            }
            match admit(&mut new_guard, &updated.slot, auto_resolve) {
                Ok(evicted) => {
                    new_guard.insert(updated.clone());
                    self.entity_to_resource.insert(id, updated.resource.clone());
                    break (previous, evicted);
                }
                Err(e) => {
                    old_guard.insert(previous);
                    return Err(e);
                }
            }
        };
        if let Some(victim) = evicted {
            self.note_eviction(&victim, id);
        }

        info!(
            "reservation {id} updated: {} [{}, {}) -> {} [{}, {})",
            previous.resource,
            previous.slot.start,
            previous.slot.end,
            updated.resource,
            updated.slot.start,
            updated.slot.end
        );
        let event = Event::ReservationUpdated {
            previous: previous.clone(),
            current: updated.clone(),
        };
        self.notify.send(&previous.resource, &event);
        if previous.resource != updated.resource {
            self.notify.send(&updated.resource, &event);
        }
        self.record_gauges();
        Ok(updated)
    }

    /// Evict the lowest-priority reservation overlapping `slot` (ties: lowest id).
    /// Returns `None` when nothing overlaps.
    pub async fn resolve_conflict_by_priority(
        &self,
        resource: &str,
        slot: TimeSlot,
    ) -> Result<Option<Reservation>, EngineError> {
        let started = Instant::now();
        validate_slot(&slot, self.config().axis_len)?;
        let mut guard = self.write_resource(resource).await?;
        let Some(victim) = guard.lowest_priority_overlap(&slot).map(|r| r.id) else {
            return Ok(None);
        };
        let evicted = guard.remove(victim).ok_or(EngineError::NotFound(victim))?;
        self.entity_to_resource.remove(&victim);
        drop(guard);

        info!(
            "resolved conflict on {resource} by priority: cancelled reservation {victim} (priority {})",
            evicted.priority
        );
        metrics::counter!(observability::EVICTIONS_TOTAL).increment(1);
        self.notify.send(
            resource,
            &Event::ReservationRemoved { id: victim, resource: resource.to_string() },
        );
        self.record_gauges();
        observe("resolve_conflict_by_priority", started);
        Ok(Some(evicted))
    }

    /// Move reservation `id` to the first free alternative slot on its resource.
    pub async fn resolve_conflict_by_rescheduling(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        let started = Instant::now();
        let result = self.reschedule_reservation(id).await;
        metrics::counter!(observability::RESERVATIONS_TOTAL, "status" => status_label(&result)).increment(1);
        observe("resolve_conflict_by_rescheduling", started);
        result
    }

    async fn reschedule_reservation(&self, id: ReservationId) -> Result<Reservation, EngineError> {
        let mut guard = self.resolve_entity_write(id).await?;
        let previous = guard.remove(id).ok_or(EngineError::NotFound(id))?;

        // The reservation is out of the index here, so it cannot block its own move.
        let candidates = alternative_slots(
            &guard,
            &previous.slot,
            previous.slot.duration(),
            self.config().reschedule_offset,
            self.config().axis_len,
        );
        let Some(&slot) = candidates.first() else {
            guard.insert(previous);
            return Err(EngineError::NoAlternative(id));
        };

        let moved = Reservation {
            slot,
            ..previous.clone()
        };
        guard.insert(moved.clone());
        drop(guard);

        info!(
            "rescheduled reservation {id} on {}: [{}, {}) -> [{}, {})",
            moved.resource, previous.slot.start, previous.slot.end, slot.start, slot.end
        );
        self.notify.send(
            &moved.resource,
            &Event::ReservationUpdated {
                previous,
                current: moved.clone(),
            },
        );
        Ok(moved)
    }

    /// Bookkeeping for a reservation displaced by `by`. Caller holds the lock.
    fn note_eviction(&self, victim: &Reservation, by: ReservationId) {
        self.entity_to_resource.remove(&victim.id);
        metrics::counter!(observability::EVICTIONS_TOTAL).increment(1);
        info!(
            "auto-resolve on {}: reservation {} (priority {}) evicted by {by}",
            victim.resource, victim.id, victim.priority
        );
        self.notify.send(
            &victim.resource,
            &Event::ReservationEvicted {
                id: victim.id,
                resource: victim.resource.clone(),
                by,
            },
        );
    }
}
