use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::occupancy::OccupancyIndex;

/// Minute offset on the day axis. The only time type.
pub type Minute = u32;

/// Ledger-assigned reservation identity. Monotonic, never reused.
pub type ReservationId = u64;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;
pub const DEFAULT_PRIORITY: u8 = 5;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: Minute,
    pub end: Minute,
}

impl TimeSlot {
    pub fn new(start: Minute, end: Minute) -> Self {
        debug_assert!(start < end, "TimeSlot start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> Minute {
        self.end.saturating_sub(self.start)
    }

    /// Shared boundary points do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }

    pub fn contains_slot(&self, other: &TimeSlot) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Overlapping part of two slots, if any.
    pub fn intersection(&self, other: &TimeSlot) -> Option<TimeSlot> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeSlot { start, end })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub resource: String,
    pub activity: String,
    pub slot: TimeSlot,
    /// 1..=10, 10 is highest.
    pub priority: u8,
    pub contact: String,
}

/// What a caller submits; the ledger turns it into a [`Reservation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub resource: String,
    pub activity: String,
    pub slot: TimeSlot,
    pub priority: u8,
    pub contact: String,
}

impl ReservationRequest {
    pub fn new(resource: impl Into<String>, activity: impl Into<String>, slot: TimeSlot) -> Self {
        Self {
            resource: resource.into(),
            activity: activity.into(),
            slot,
            priority: DEFAULT_PRIORITY,
            contact: String::new(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = contact.into();
        self
    }

    pub(crate) fn into_reservation(self, id: ReservationId) -> Reservation {
        Reservation {
            id,
            resource: self.resource,
            activity: self.activity,
            slot: self.slot,
            priority: self.priority,
            contact: self.contact,
        }
    }
}

/// One resource's bookings plus the occupancy index mirroring them.
///
/// `insert` and `remove` are the only paths that touch the index, so the
/// counts always equal the union of the stored slots.
#[derive(Debug, Clone)]
pub struct ResourceState {
    pub name: String,
    index: OccupancyIndex,
    reservations: BTreeMap<ReservationId, Reservation>,
    /// Set once the resource has been removed from the ledger.
    pub(crate) retired: bool,
}

impl ResourceState {
    pub fn new(name: String, axis_len: Minute) -> Self {
        Self {
            name,
            index: OccupancyIndex::new(axis_len as usize),
            reservations: BTreeMap::new(),
            retired: false,
        }
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    pub fn get(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.get(&id)
    }

    /// Reservations in id order.
    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    pub fn insert(&mut self, reservation: Reservation) {
        let slot = reservation.slot;
        if let Some(previous) = self.reservations.insert(reservation.id, reservation) {
            self.index
                .remove_interval(previous.slot.start as usize, previous.slot.end as usize);
        }
        self.index.add_interval(slot.start as usize, slot.end as usize);
    }

    pub fn remove(&mut self, id: ReservationId) -> Option<Reservation> {
        let removed = self.reservations.remove(&id)?;
        self.index
            .remove_interval(removed.slot.start as usize, removed.slot.end as usize);
        Some(removed)
    }

    /// Drain every reservation and reset the index.
    pub fn drain(&mut self) -> Vec<Reservation> {
        self.index.clear();
        std::mem::take(&mut self.reservations).into_values().collect()
    }

    pub fn has_conflict(&self, slot: &TimeSlot) -> bool {
        self.index.is_conflict(slot.start as usize, slot.end as usize)
    }

    /// Maximum number of stored reservations covering any minute of `slot`.
    pub fn occupancy(&self, slot: &TimeSlot) -> u32 {
        self.index
            .query_occupancy(slot.start as usize, slot.end as usize)
            .max(0) as u32
    }

    /// Stored reservations whose slot overlaps `slot`, in id order.
    pub fn overlapping<'a>(&'a self, slot: &TimeSlot) -> impl Iterator<Item = &'a Reservation> + use<'a> {
        let slot = *slot;
        self.reservations.values().filter(move |r| r.slot.overlaps(&slot))
    }

    /// Lowest priority among the overlaps; ties go to the lowest id.
    pub fn lowest_priority_overlap(&self, slot: &TimeSlot) -> Option<&Reservation> {
        let mut lowest: Option<&Reservation> = None;
        for r in self.overlapping(slot) {
            if lowest.is_none_or(|l| r.priority < l.priority) {
                lowest = Some(r);
            }
        }
        lowest
    }

    pub fn booked_minutes(&self) -> u64 {
        self.reservations.values().map(|r| r.slot.duration() as u64).sum()
    }
}

// ── Conflict reporting ───────────────────────────────────────────

/// One overlapping pair on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub resource: String,
    /// Intersection of the two slots.
    pub period: TimeSlot,
    pub reservations: [Reservation; 2],
}

impl ConflictInfo {
    /// The party that would yield under priority resolution.
    pub fn lower_priority(&self) -> &Reservation {
        let [a, b] = &self.reservations;
        if b.priority < a.priority { b } else { a }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionSuggestion {
    /// Resources free for the whole conflict period.
    SwitchResource(Vec<String>),
    /// Free slots the lower-priority reservation could move to.
    Reschedule {
        reservation: ReservationId,
        slots: Vec<TimeSlot>,
    },
    CancelLowerPriority(ReservationId),
    /// Nothing automatic applies; parties have to negotiate.
    ShareResource,
}

/// Ledger changes broadcast to subscribers of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ResourceAdded {
        resource: String,
    },
    ResourceRemoved {
        resource: String,
        cascaded: Vec<ReservationId>,
    },
    ReservationAdded {
        reservation: Reservation,
    },
    ReservationRemoved {
        id: ReservationId,
        resource: String,
    },
    ReservationEvicted {
        id: ReservationId,
        resource: String,
        by: ReservationId,
    },
    ReservationUpdated {
        previous: Reservation,
        current: Reservation,
    },
}
