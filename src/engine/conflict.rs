use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn validate_slot(slot: &TimeSlot, axis_len: Minute) -> Result<(), EngineError> {
    if slot.start >= slot.end || slot.end > axis_len {
        return Err(EngineError::InvalidRange {
            start: slot.start,
            end: slot.end,
        });
    }
    Ok(())
}

pub(crate) fn validate_request(req: &ReservationRequest, axis_len: Minute) -> Result<(), EngineError> {
    validate_slot(&req.slot, axis_len)?;
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&req.priority) {
        return Err(EngineError::InvalidPriority(req.priority));
    }
    if req.activity.len() > MAX_LABEL_LEN {
        return Err(EngineError::LimitExceeded("activity label too long"));
    }
    if req.contact.len() > MAX_CONTACT_LEN {
        return Err(EngineError::LimitExceeded("contact too long"));
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.is_empty() {
        return Err(EngineError::LimitExceeded("empty resource name"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("resource name too long"));
    }
    Ok(())
}

/// Index lookup first; only on a hit do we scan for the ids to report.
pub(crate) fn check_no_conflict(rs: &ResourceState, slot: &TimeSlot) -> Result<(), EngineError> {
    if !rs.has_conflict(slot) {
        return Ok(());
    }
    Err(EngineError::Conflict {
        resource: rs.name.clone(),
        conflicting: rs.overlapping(slot).map(|r| r.id).collect(),
    })
}

/// Make room for `slot` under the ledger's conflict policy.
///
/// Without auto-resolve any overlap is a `Conflict`. With auto-resolve the
/// single lowest-priority overlap is evicted and the slot re-checked once; if
/// it is still occupied the eviction is undone and the original conflict is
/// returned. On success returns the evicted reservation, if any.
pub(crate) fn admit(
    rs: &mut ResourceState,
    slot: &TimeSlot,
    auto_resolve: bool,
) -> Result<Option<Reservation>, EngineError> {
    let conflict = match check_no_conflict(rs, slot) {
        Ok(()) => return Ok(None),
        Err(e) => e,
    };
    if !auto_resolve {
        return Err(conflict);
    }

    let Some(victim) = rs.lowest_priority_overlap(slot).map(|r| r.id) else {
        return Err(conflict);
    };
    let evicted = rs.remove(victim).ok_or(EngineError::NotFound(victim))?;
    if check_no_conflict(rs, slot).is_ok() {
        return Ok(Some(evicted));
    }
    rs.insert(evicted);
    Err(conflict)
}
