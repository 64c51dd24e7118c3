//! Mutable in-memory state of the running session.

use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use sessionlog_types::{
    config::AppInfo,
    diagnostics::Severity,
    snapshot::{CustomEvent, LogEntry},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    fps::{FpsTracker, Viewpoint},
    registry::ActionRegistry,
};

pub(crate) const SESSION_EVENT_MESSAGE: &str = "SessionEvent";
pub(crate) const SESSION_CUSTOM_EVENT_MESSAGE: &str = "SessionCustomEvent";

/// Name → last accepted value, iterated in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct CustomEventStore {
    entries: Vec<CustomEvent>,
    index: HashMap<String, usize>,
}

impl CustomEventStore {
    /// Writes when the key is new or `overwrite` is set. Returns whether the
    /// store changed.
    pub fn apply(&mut self, name: &str, value: &str, overwrite: bool) -> bool {
        match self.index.get(name) {
            Some(&slot) if overwrite => {
                self.entries[slot].event_value = value.to_owned();
                true
            }
            Some(_) => false,
            None => {
                self.index.insert(name.to_owned(), self.entries.len());
                self.entries.push(CustomEvent {
                    event_name: name.to_owned(),
                    event_value: value.to_owned(),
                });
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&slot| self.entries[slot].event_value.as_str())
    }

    pub fn entries(&self) -> &[CustomEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
pub struct SessionAggregator {
    id: Uuid,
    app: AppInfo,
    started_at: DateTime<Utc>,
    started: Instant,
    registry: ActionRegistry,
    counts: Vec<u32>,
    custom_events: CustomEventStore,
    logs: Vec<LogEntry>,
    seen_diagnostics: HashSet<(Severity, String)>,
    fps: FpsTracker,
}

impl SessionAggregator {
    /// Opens a new session with every declared action at zero.
    pub fn initialize(app: AppInfo, registry: ActionRegistry) -> Self {
        let aggregator = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            counts: vec![0; registry.len()],
            registry,
            app,
            custom_events: CustomEventStore::default(),
            logs: Vec::new(),
            seen_diagnostics: HashSet::new(),
            fps: FpsTracker::new(),
        };
        info!(
            session = %aggregator.id,
            "Session started for {} {} with {} declared actions",
            aggregator.app.name,
            aggregator.app.version,
            aggregator.registry.len()
        );
        aggregator
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn app(&self) -> &AppInfo {
        &self.app
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Counts a declared action and always appends a log entry.
    /// Returns whether a counter was incremented.
    ///
    /// The warning for an undeclared name reaches the log through the
    /// diagnostic channel, so its entry lands after this event's own entry.
    pub fn record_event(&mut self, name: &str) -> bool {
        let counted = match self.registry.position(name) {
            Some(slot) => {
                self.counts[slot] = self.counts[slot].saturating_add(1);
                true
            }
            None => {
                warn!(
                    "Logged event '{}' which is not a declared action; it is kept in the log but excluded from the completion percentage",
                    name
                );
                false
            }
        };
        self.logs.push(LogEntry::now(name, SESSION_EVENT_MESSAGE));
        counted
    }

    /// Returns whether the custom event store changed.
    pub fn record_custom_event(&mut self, name: &str, value: &str, overwrite: bool) -> bool {
        if name.is_empty() {
            warn!("Custom event recorded with an empty name; ignoring");
            return false;
        }

        let changed = self.custom_events.apply(name, value, overwrite);
        if changed {
            debug!("Custom event {} = {}", name, value);
        } else {
            debug!(
                "Custom event '{}' already holds '{}'; pass overwrite to replace it",
                name,
                self.custom_events.get(name).unwrap_or_default()
            );
        }

        self.logs.push(LogEntry::now(
            format!("{name} [{value}] overwrite:{overwrite}"),
            SESSION_CUSTOM_EVENT_MESSAGE,
        ));
        changed
    }

    /// Appends a free-form entry. Both fields are required.
    pub fn record_log(&mut self, kind: &str, message: &str) -> bool {
        if kind.is_empty() || message.is_empty() {
            warn!("Log entry requires a non-empty type and message; ignoring");
            return false;
        }
        self.logs.push(LogEntry::now(kind, message));
        true
    }

    /// Records a message from the diagnostic channel once per
    /// (severity, text) pair. Returns whether an entry was appended.
    pub fn capture_diagnostic(&mut self, severity: Severity, text: &str, trace: &str) -> bool {
        if severity.is_informational() {
            return false;
        }
        if !self.seen_diagnostics.insert((severity, text.to_owned())) {
            return false;
        }

        let message = if severity.carries_trace() {
            format!("{text}\nStackTrace: {trace}")
        } else {
            text.to_owned()
        };
        self.logs.push(LogEntry::now(severity.to_string(), message));
        true
    }

    pub fn sample_fps(&mut self, fps: f32, viewpoint: Option<&Viewpoint>) -> Option<f32> {
        self.fps.sample(fps, viewpoint)
    }

    pub fn count(&self, name: &str) -> Option<u32> {
        self.registry.position(name).map(|slot| self.counts[slot])
    }

    /// Declared actions with their counts, in declaration order.
    pub fn action_counts(&self) -> impl Iterator<Item = (&str, u32)> {
        self.registry.names().zip(self.counts.iter().copied())
    }

    pub fn custom_events(&self) -> &CustomEventStore {
        &self.custom_events
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn fps(&self) -> &FpsTracker {
        &self.fps
    }
}
