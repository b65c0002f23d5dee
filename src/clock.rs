//! "HH:MM" conversion for collaborators and reports. The engine itself only
//! sees minute offsets.

use std::fmt;

use crate::model::{Minute, TimeSlot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockError(pub String);

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time of day: {:?}", self.0)
    }
}

impl std::error::Error for ClockError {}

/// Parse `"HH:MM"` (or `"YYYY-MM-DD HH:MM"`, date ignored) into minutes since
/// midnight. `"24:00"` is accepted as the end of the day.
pub fn parse_hhmm(s: &str) -> Result<Minute, ClockError> {
    let err = || ClockError(s.to_string());
    let time = s.trim().rsplit(' ').next().ok_or_else(err)?;
    let (h, m) = time.split_once(':').ok_or_else(err)?;
    let hours: Minute = h.parse().map_err(|_| err())?;
    let minutes: Minute = m.parse().map_err(|_| err())?;
    if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
        return Err(err());
    }
    Ok(hours * 60 + minutes)
}

pub fn format_hhmm(minute: Minute) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Build a slot from two `"HH:MM"` strings.
pub fn parse_slot(start: &str, end: &str) -> Result<TimeSlot, ClockError> {
    let s = parse_hhmm(start)?;
    let e = parse_hhmm(end)?;
    if s >= e {
        return Err(ClockError(format!("{start} - {end}")));
    }
    Ok(TimeSlot::new(s, e))
}

/// `"HH:MM - HH:MM"` rendering of a slot.
pub struct SlotDisplay<'a>(pub &'a TimeSlot);

impl fmt::Display for SlotDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", format_hhmm(self.0.start), format_hhmm(self.0.end))
    }
}
