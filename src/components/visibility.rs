use std::time::Duration;

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;

use crate::api::models::{ComponentRecord, ComponentStatus};

#[derive(Debug, Clone, Copy)]
pub struct VisibilityConfig {
    /// How long a replaced component stays listed after `replaced_at`.
    pub window: Duration,
    pub tick: Duration,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        VisibilityConfig {
            window: Duration::from_secs(15 * 60),
            tick: Duration::from_secs(1),
        }
    }
}

impl VisibilityConfig {
    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Parses a backend timestamp into epoch milliseconds. Naive timestamps are UTC.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Epoch ms at which a replaced record stops being shown, if it expires at all.
pub fn visibility_deadline(record: &ComponentRecord, window_ms: i64) -> Option<i64> {
    if record.status != ComponentStatus::Replaced {
        return None;
    }
    let replaced_at = parse_timestamp(record.replaced_at.as_deref()?)?;
    Some(replaced_at.saturating_add(window_ms))
}

/// Milliseconds until the record is hidden; zero or negative means expired.
/// `None` for records that never expire.
pub fn compute_remaining(record: &ComponentRecord, now_ms: i64, window_ms: i64) -> Option<i64> {
    visibility_deadline(record, window_ms).map(|deadline| deadline - now_ms)
}

pub fn format_countdown(remaining_ms: i64) -> String {
    let remaining_ms = remaining_ms.max(0);
    let minutes = remaining_ms / 60_000;
    let seconds = (remaining_ms % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}

#[derive(Debug, Clone)]
pub struct VisibleComponent {
    pub record: ComponentRecord,
    remaining_ms: Option<i64>,
}

impl VisibleComponent {
    pub fn countdown(&self) -> Option<String> {
        self.remaining_ms.map(format_countdown)
    }

    fn has_countdown(&self) -> bool {
        self.remaining_ms.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownEntry {
    pub id: String,
    pub countdown: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub updated: Vec<CountdownEntry>,
    pub removed: Vec<String>,
}

/// The components currently shown for one device.
#[derive(Debug, Clone, Default)]
pub struct ComponentList {
    items: Vec<VisibleComponent>,
    window_ms: i64,
}

impl ComponentList {
    pub fn render(records: Vec<ComponentRecord>, now_ms: i64, window_ms: i64) -> Self {
        let items = records
            .into_iter()
            .filter_map(|record| {
                let remaining_ms = compute_remaining(&record, now_ms, window_ms);
                if remaining_ms.is_some_and(|ms| ms <= 0) {
                    return None;
                }
                if record.status == ComponentStatus::Replaced && remaining_ms.is_none() {
                    tracing::debug!(
                        component = %record.id,
                        "Replaced component without a usable replaced_at; showing without countdown"
                    );
                }
                Some(VisibleComponent {
                    record,
                    remaining_ms,
                })
            })
            .collect();
        ComponentList { items, window_ms }
    }

    /// Advances every countdown, dropping records whose time is up.
    pub fn tick(&mut self, now_ms: i64) -> TickOutcome {
        let window_ms = self.window_ms;
        let mut outcome = TickOutcome::default();
        self.items.retain_mut(|item| {
            let Some(current) = compute_remaining(&item.record, now_ms, window_ms) else {
                return true;
            };
            // Never count back up if the wall clock steps backwards.
            let remaining = item.remaining_ms.map_or(current, |previous| previous.min(current));
            if remaining <= 0 {
                outcome.removed.push(item.record.id.clone());
                return false;
            }
            item.remaining_ms = Some(remaining);
            outcome.updated.push(CountdownEntry {
                id: item.record.id.clone(),
                countdown: Some(format_countdown(remaining)),
            });
            true
        });
        outcome
    }

    pub fn items(&self) -> &[VisibleComponent] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_countdowns(&self) -> bool {
        self.items.iter().any(VisibleComponent::has_countdown)
    }

    pub fn entries(&self) -> Vec<CountdownEntry> {
        self.items
            .iter()
            .map(|item| CountdownEntry {
                id: item.record.id.clone(),
                countdown: item.countdown(),
            })
            .collect()
    }
}
