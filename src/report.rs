//! Human-readable views of the ledger: per-resource schedules, usage and
//! the conflict report. All report types serialize for JSON output.

use std::fmt;

use serde::Serialize;

use crate::clock::SlotDisplay;
use crate::engine::{Engine, EngineError};
use crate::model::*;

#[derive(Debug, Clone, Serialize)]
pub struct ResourceSchedule {
    pub resource: String,
    /// Sorted by start time.
    pub entries: Vec<Reservation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleReport {
    pub resources: Vec<ResourceSchedule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageRow {
    pub resource: String,
    pub reservations: usize,
    pub utilization: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub rows: Vec<UsageRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictEntry {
    pub conflict: ConflictInfo,
    pub suggestions: Vec<ResolutionSuggestion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<ConflictEntry>,
}

impl Engine {
    /// Schedule of one resource, or of all resources in name order.
    pub async fn schedule_report(&self, resource: Option<&str>) -> Result<ScheduleReport, EngineError> {
        let names = match resource {
            Some(name) => vec![name.to_string()],
            None => self.get_available_resources(),
        };
        let mut resources = Vec::with_capacity(names.len());
        for name in names {
            let mut entries = match self.get_reservations_by_resource(&name).await {
                Ok(entries) => entries,
                // Removed between listing and reading.
                Err(EngineError::UnknownResource(_)) if resource.is_none() => continue,
                Err(e) => return Err(e),
            };
            entries.sort_by_key(|r| (r.slot.start, r.id));
            resources.push(ResourceSchedule { resource: name, entries });
        }
        Ok(ScheduleReport { resources })
    }

    pub async fn usage_report(&self) -> UsageReport {
        let mut rows = Vec::new();
        for (resource, reservations) in self.get_resource_usage_stats().await {
            let Ok(utilization) = self.get_resource_utilization(&resource).await else {
                continue;
            };
            rows.push(UsageRow {
                resource,
                reservations,
                utilization,
            });
        }
        UsageReport { rows }
    }

    pub async fn conflict_report(&self) -> ConflictReport {
        let mut conflicts = Vec::new();
        for conflict in self.detect_all_conflicts().await {
            let suggestions = self.resolution_suggestions(&conflict).await;
            conflicts.push(ConflictEntry { conflict, suggestions });
        }
        ConflictReport { conflicts }
    }
}

impl fmt::Display for ScheduleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== schedule ===")?;
        for schedule in &self.resources {
            writeln!(f, "{}:", schedule.resource)?;
            if schedule.entries.is_empty() {
                writeln!(f, "  (no reservations)")?;
            }
            for r in &schedule.entries {
                writeln!(
                    f,
                    "  {}  {} (priority {}, id {})",
                    SlotDisplay(&r.slot),
                    r.activity,
                    r.priority,
                    r.id
                )?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== resource usage ===")?;
        for row in &self.rows {
            writeln!(
                f,
                "  {}: {} reservations, utilization {:.1}%",
                row.resource,
                row.reservations,
                row.utilization * 100.0
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for ResolutionSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSuggestion::SwitchResource(names) => {
                write!(f, "move to another resource: {}", names.join(", "))
            }
            ResolutionSuggestion::Reschedule { reservation, slots } => {
                write!(f, "reschedule reservation {reservation} to ")?;
                for (i, slot) in slots.iter().enumerate() {
                    if i > 0 {
                        write!(f, " or ")?;
                    }
                    write!(f, "{}", SlotDisplay(slot))?;
                }
                Ok(())
            }
            ResolutionSuggestion::CancelLowerPriority(id) => {
                write!(f, "cancel lower-priority reservation {id}")
            }
            ResolutionSuggestion::ShareResource => write!(f, "negotiate shared use of the resource"),
        }
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== conflict report ===")?;
        if self.conflicts.is_empty() {
            return writeln!(f, "  no conflicts");
        }
        writeln!(f, "  {} conflicts:", self.conflicts.len())?;
        for entry in &self.conflicts {
            let c = &entry.conflict;
            writeln!(f, "  {} at {}", c.resource, SlotDisplay(&c.period))?;
            for r in &c.reservations {
                writeln!(f, "    - {} (priority {}, id {})", r.activity, r.priority, r.id)?;
            }
            for s in &entry.suggestions {
                writeln!(f, "    * {s}")?;
            }
        }
        Ok(())
    }
}
