use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::parse_hhmm;
use crate::limits::MAX_AXIS_LEN;
use crate::model::{Minute, TimeSlot};

/// Tunables of the reservation ledger. `Default` is a single day in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Axis length N; every slot must lie in `[0, N)`.
    pub axis_len: Minute,
    /// Reference window for utilization (one 8-hour workday).
    pub utilization_window: Minute,
    /// Shift used by alternative-slot suggestions.
    pub reschedule_offset: Minute,
    /// Window searched by free-slot queries.
    pub work_day: TimeSlot,
    pub auto_resolve: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            axis_len: 1440,
            utilization_window: 480,
            reschedule_offset: 60,
            work_day: TimeSlot::new(8 * 60, 18 * 60),
            auto_resolve: false,
        }
    }
}

impl EngineConfig {
    /// Read `SLOTGUARD_*` overrides; unparseable values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let axis_len = env_parse("SLOTGUARD_AXIS_LEN")
            .filter(|n: &Minute| *n > 0 && *n <= MAX_AXIS_LEN)
            .unwrap_or(defaults.axis_len);
        let utilization_window = env_parse("SLOTGUARD_UTILIZATION_WINDOW")
            .filter(|n: &Minute| *n > 0)
            .unwrap_or(defaults.utilization_window);
        let reschedule_offset = env_parse("SLOTGUARD_RESCHEDULE_OFFSET")
            .filter(|n: &Minute| *n > 0)
            .unwrap_or(defaults.reschedule_offset);
        let work_start = std::env::var("SLOTGUARD_WORK_START")
            .ok()
            .and_then(|s| parse_hhmm(&s).ok())
            .unwrap_or(defaults.work_day.start);
        let work_end = std::env::var("SLOTGUARD_WORK_END")
            .ok()
            .and_then(|s| parse_hhmm(&s).ok())
            .unwrap_or(defaults.work_day.end);
        let work_day = if work_start < work_end && work_end <= axis_len {
            TimeSlot::new(work_start, work_end)
        } else if defaults.work_day.end <= axis_len {
            tracing::warn!("ignoring invalid work day {work_start}..{work_end}");
            defaults.work_day
        } else {
            TimeSlot::new(0, axis_len)
        };
        let auto_resolve = env_flag("SLOTGUARD_AUTO_RESOLVE").unwrap_or(defaults.auto_resolve);

        Self {
            axis_len,
            utilization_window,
            reschedule_offset,
            work_day,
            auto_resolve,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

/// Daemon settings (binary only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub resources: Vec<String>,
    pub metrics_port: Option<u16>,
    pub report_interval: Duration,
    pub report_format: ReportFormat,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let resources = std::env::var("SLOTGUARD_RESOURCES")
            .map(|s| parse_resource_list(&s))
            .unwrap_or_default();
        let metrics_port = env_parse("SLOTGUARD_METRICS_PORT");
        let report_interval = Duration::from_secs(
            env_parse("SLOTGUARD_REPORT_INTERVAL_SECS")
                .filter(|n: &u64| *n > 0)
                .unwrap_or(60),
        );
        let report_format = match std::env::var("SLOTGUARD_REPORT_FORMAT").as_deref() {
            Ok("json") => ReportFormat::Json,
            _ => ReportFormat::Text,
        };
        Self {
            resources,
            metrics_port,
            report_interval,
            report_format,
        }
    }
}

/// Comma separated, whitespace trimmed, empties dropped.
pub fn parse_resource_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    match std::env::var(key).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
