use std::collections::BTreeMap;
use std::time::Instant;

use tracing::debug;

use crate::model::*;
use crate::observability;

use super::availability::{alternative_slots, free_slots};
use super::conflict::validate_slot;
use super::{observe, Engine, EngineError};

impl Engine {
    pub async fn has_conflict(&self, resource: &str, slot: TimeSlot) -> Result<bool, EngineError> {
        validate_slot(&slot, self.config().axis_len)?;
        let guard = self.read_resource(resource).await?;
        Ok(guard.has_conflict(&slot))
    }

    /// Highest number of reservations covering any minute of `slot`.
    pub async fn query_occupancy(&self, resource: &str, slot: TimeSlot) -> Result<u32, EngineError> {
        validate_slot(&slot, self.config().axis_len)?;
        let guard = self.read_resource(resource).await?;
        Ok(guard.occupancy(&slot))
    }

    pub async fn find_conflicting_reservations(
        &self,
        resource: &str,
        slot: TimeSlot,
    ) -> Result<Vec<Reservation>, EngineError> {
        validate_slot(&slot, self.config().axis_len)?;
        let guard = self.read_resource(resource).await?;
        Ok(guard.overlapping(&slot).cloned().collect())
    }

    /// Every overlapping pair on every resource, each reported once.
    /// Resources in name order; pairs by start time, then id.
    pub async fn detect_all_conflicts(&self) -> Vec<ConflictInfo> {
        let started = Instant::now();
        let mut conflicts = Vec::new();
        for guard in self.read_all().await {
            let mut booked: Vec<&Reservation> = guard.reservations().collect();
            booked.sort_by_key(|r| (r.slot.start, r.id));
            for (i, a) in booked.iter().enumerate() {
                // Sorted by start: once b starts at or after a ends, nothing later overlaps a.
                for b in booked[i + 1..].iter().take_while(|b| b.slot.start < a.slot.end) {
                    if let Some(period) = a.slot.intersection(&b.slot) {
                        conflicts.push(ConflictInfo {
                            resource: guard.name.clone(),
                            period,
                            reservations: [(*a).clone(), (*b).clone()],
                        });
                    }
                }
            }
        }
        metrics::gauge!(observability::CONFLICTS_DETECTED).set(conflicts.len() as f64);
        observe("detect_all_conflicts", started);
        conflicts
    }

    /// Resources with no booking overlapping `slot`, in name order.
    pub async fn find_available_resources(&self, slot: TimeSlot) -> Result<Vec<String>, EngineError> {
        validate_slot(&slot, self.config().axis_len)?;
        let available: Vec<String> = self
            .read_all()
            .await
            .iter()
            .filter(|rs| !rs.has_conflict(&slot))
            .map(|rs| rs.name.clone())
            .collect();
        debug!("[{}, {}): {} resources available", slot.start, slot.end, available.len());
        Ok(available)
    }

    /// `preferred` shifted earlier and later by the configured offset, each
    /// `duration` long; only in-range, conflict-free candidates are kept.
    pub async fn suggest_alternative_slots(
        &self,
        resource: &str,
        preferred: TimeSlot,
        duration: Minute,
    ) -> Result<Vec<TimeSlot>, EngineError> {
        validate_slot(&preferred, self.config().axis_len)?;
        let guard = self.read_resource(resource).await?;
        let slots = alternative_slots(
            &guard,
            &preferred,
            duration,
            self.config().reschedule_offset,
            self.config().axis_len,
        );
        debug!("{resource}: {} alternative slots", slots.len());
        Ok(slots)
    }

    /// First free resource in name order. If none is free, the first resource
    /// where exactly one reservation overlaps `slot` and its priority is below
    /// `min_priority`: the one case a single auto-resolve eviction can clear.
    pub async fn find_best_resource(
        &self,
        slot: TimeSlot,
        min_priority: u8,
    ) -> Result<Option<String>, EngineError> {
        validate_slot(&slot, self.config().axis_len)?;
        let guards = self.read_all().await;
        if let Some(free) = guards.iter().find(|rs| !rs.has_conflict(&slot)) {
            return Ok(Some(free.name.clone()));
        }
        Ok(guards
            .iter()
            .find(|rs| {
                let mut overlaps = rs.overlapping(&slot);
                matches!(
                    (overlaps.next(), overlaps.next()),
                    (Some(only), None) if only.priority < min_priority
                )
            })
            .map(|rs| rs.name.clone()))
    }

    /// Maximal free gaps within the work day, at least `min_duration` long.
    pub async fn find_free_slots(&self, resource: &str, min_duration: Minute) -> Result<Vec<TimeSlot>, EngineError> {
        let guard = self.read_resource(resource).await?;
        Ok(free_slots(&guard, &self.config().work_day, min_duration))
    }

    /// Concrete ways out of a reported conflict, most specific first.
    pub async fn resolution_suggestions(&self, conflict: &ConflictInfo) -> Vec<ResolutionSuggestion> {
        let mut suggestions = Vec::new();

        let others: Vec<String> = self
            .find_available_resources(conflict.period)
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|name| *name != conflict.resource)
            .collect();
        if !others.is_empty() {
            suggestions.push(ResolutionSuggestion::SwitchResource(others));
        }

        let yielding = conflict.lower_priority();
        if let Ok(slots) = self
            .suggest_alternative_slots(&conflict.resource, yielding.slot, yielding.slot.duration())
            .await
            && !slots.is_empty()
        {
            suggestions.push(ResolutionSuggestion::Reschedule {
                reservation: yielding.id,
                slots,
            });
        }

        let [a, b] = &conflict.reservations;
        if a.priority != b.priority {
            suggestions.push(ResolutionSuggestion::CancelLowerPriority(yielding.id));
        }
        suggestions.push(ResolutionSuggestion::ShareResource);
        suggestions
    }

    pub async fn get_reservation(&self, id: ReservationId) -> Option<Reservation> {
        let resource = self.get_resource_for_entity(id)?;
        let guard = self.read_resource(&resource).await.ok()?;
        guard.get(id).cloned()
    }

    pub async fn get_reservations_by_resource(&self, resource: &str) -> Result<Vec<Reservation>, EngineError> {
        let guard = self.read_resource(resource).await?;
        Ok(guard.reservations().cloned().collect())
    }

    /// Reservations on any resource overlapping `range`, in id order.
    pub async fn get_reservations_by_time_range(&self, range: TimeSlot) -> Result<Vec<Reservation>, EngineError> {
        validate_slot(&range, self.config().axis_len)?;
        let mut found: Vec<Reservation> = self
            .read_all()
            .await
            .iter()
            .flat_map(|rs| rs.overlapping(&range).cloned().collect::<Vec<_>>())
            .collect();
        found.sort_by_key(|r| r.id);
        Ok(found)
    }

    pub async fn get_all_reservations(&self) -> Vec<Reservation> {
        let mut all: Vec<Reservation> = self
            .read_all()
            .await
            .iter()
            .flat_map(|rs| rs.reservations().cloned().collect::<Vec<_>>())
            .collect();
        all.sort_by_key(|r| r.id);
        all
    }

    /// Booked minutes over the utilization window, clamped to 1.0.
    pub async fn get_resource_utilization(&self, resource: &str) -> Result<f64, EngineError> {
        let guard = self.read_resource(resource).await?;
        let window = self.config().utilization_window.max(1) as f64;
        Ok((guard.booked_minutes() as f64 / window).min(1.0))
    }

    /// Reservation count per resource.
    pub async fn get_resource_usage_stats(&self) -> BTreeMap<String, usize> {
        self.read_all()
            .await
            .iter()
            .map(|rs| (rs.name.clone(), rs.len()))
            .collect()
    }

    pub fn get_total_reservations(&self) -> usize {
        self.entity_to_resource.len()
    }

    /// Registered resource names, sorted.
    pub fn get_available_resources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
