// Runtime metrics module
//
// Lightweight counters for the event bridge and the dialog controller

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared runtime counters
///
/// Uses atomic operations so engine callback threads and the UI thread can
/// record without locks. Logged on shutdown for diagnosis.
#[derive(Debug)]
pub struct Metrics {
    /// Events posted into the UI queue
    events_posted: AtomicU64,

    /// Events dropped because the UI side was gone
    events_dropped: AtomicU64,

    /// Events consumed by the dialog controller
    events_handled: AtomicU64,

    /// Engine commands issued by the dialog controller
    commands_issued: AtomicU64,

    /// Engine commands rejected synchronously
    commands_rejected: AtomicU64,

    /// Precondition prompts shown to the operator
    prompts_shown: AtomicU64,

    /// Operator log entries appended
    log_entries: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            events_posted: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            events_handled: AtomicU64::new(0),
            commands_issued: AtomicU64::new(0),
            commands_rejected: AtomicU64::new(0),
            prompts_shown: AtomicU64::new(0),
            log_entries: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_event_posted(&self) {
        self.events_posted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_event_handled(&self) {
        self.events_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self, accepted: bool) {
        self.commands_issued.fetch_add(1, Ordering::Relaxed);
        if !accepted {
            self.commands_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_prompt(&self) {
        self.prompts_shown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_log_entry(&self) {
        self.log_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_posted(&self) -> u64 {
        self.events_posted.load(Ordering::Relaxed)
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    pub fn events_handled(&self) -> u64 {
        self.events_handled.load(Ordering::Relaxed)
    }

    pub fn commands_issued(&self) -> u64 {
        self.commands_issued.load(Ordering::Relaxed)
    }

    pub fn commands_rejected(&self) -> u64 {
        self.commands_rejected.load(Ordering::Relaxed)
    }

    pub fn prompts_shown(&self) -> u64 {
        self.prompts_shown.load(Ordering::Relaxed)
    }

    pub fn log_entries(&self) -> u64 {
        self.log_entries.load(Ordering::Relaxed)
    }

    /// Events posted but not yet consumed.
    pub fn events_in_flight(&self) -> u64 {
        self.events_posted().saturating_sub(self.events_handled())
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Runtime Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Events: {} posted, {} handled, {} dropped",
            self.events_posted(),
            self.events_handled(),
            self.events_dropped()
        );
        tracing::info!(
            "Commands: {} issued, {} rejected",
            self.commands_issued(),
            self.commands_rejected()
        );
        tracing::info!(
            "Operator log: {} entries, {} prompts",
            self.log_entries(),
            self.prompts_shown()
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
