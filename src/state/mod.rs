// State management module
//
// The dialog's UI-visible state lives in a StateStore owned by the dialog
// controller. Every mutation is diffed against the previous state and turned
// into StateChange events, which are returned to the caller (to apply to the
// window) and broadcast to any other observer.

pub mod log;

pub use log::{EventLog, LogEntry};

use crate::metrics::Metrics;
use crate::models::{InjectionState, SessionState, Uid};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

/// A remote participant seen through a user-joined callback.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteUser {
    pub joined_at: Instant,
    pub is_injected_stream: bool,
}

/// Everything the dialog shows, apart from the log.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DialogState {
    pub session: SessionState,
    pub injection: InjectionState,

    /// Channel of the current (or pending) session
    pub channel: Option<String>,

    /// Local uid confirmed by join success
    pub local_uid: Option<Uid>,

    /// URL of the injected (or pending) stream
    pub inject_url: Option<String>,

    /// Remote participants in join order
    pub remote_users: IndexMap<Uid, RemoteUser>,
}

impl DialogState {
    pub fn controls(&self) -> ControlState {
        ControlState::derive(self.session, self.injection)
    }
}

/// Enablement and labels of the dialog controls.
///
/// Always derived from session and injection state so the two can never disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlState {
    pub join_enabled: bool,
    pub join_label: &'static str,
    pub channel_input_enabled: bool,
    pub inject_enabled: bool,
    pub inject_url_enabled: bool,
    pub inject_label: &'static str,
}

pub const JOIN_LABEL: &str = "JoinChannel";
pub const LEAVE_LABEL: &str = "LeaveChannel";
pub const INJECT_LABEL: &str = "Inject URL";
pub const REMOVE_LABEL: &str = "Remove URL";

impl ControlState {
    pub fn derive(session: SessionState, injection: InjectionState) -> Self {
        let in_channel = session == SessionState::InChannel;
        let inject_enabled = in_channel && !injection.is_in_flight();

        Self {
            join_enabled: session != SessionState::Uninitialized && !session.is_transitioning(),
            join_label: match session {
                SessionState::InChannel | SessionState::LeavingChannel => LEAVE_LABEL,
                _ => JOIN_LABEL,
            },
            channel_input_enabled: session == SessionState::Initialized,
            inject_enabled,
            inject_url_enabled: inject_enabled && injection == InjectionState::NotInjected,
            inject_label: if injection.toggles_to_remove() {
                REMOVE_LABEL
            } else {
                INJECT_LABEL
            },
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::derive(SessionState::default(), InjectionState::default())
    }
}

/// Change events emitted when dialog state is modified
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    SessionChanged {
        from: SessionState,
        to: SessionState,
    },

    InjectionChanged {
        from: InjectionState,
        to: InjectionState,
    },

    /// Control enablement or labels changed
    ControlsChanged(ControlState),

    ParticipantsChanged {
        count: usize,
    },

    /// A line was appended to the operator log
    LogAppended {
        index: usize,
        message: String,
    },

    /// The detail display should show `text`
    DetailChanged {
        text: String,
    },

    /// A precondition failed; show a blocking prompt
    PromptRequested {
        message: String,
    },
}

/// Owner of [`DialogState`] and the [`EventLog`]
///
/// Only touched from the thread that drives the dialog controller.
/// Observers on other threads use [`subscribe`](Self::subscribe).
pub struct StateStore {
    state: DialogState,
    log: EventLog,
    state_tx: broadcast::Sender<StateChange>,
    metrics: Arc<Metrics>,
}

impl StateStore {
    /// Create a store with default state and a broadcast buffer of 100 events
    pub fn new(metrics: Arc<Metrics>) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: DialogState::default(),
            log: EventLog::new(),
            state_tx,
            metrics,
        }
    }

    pub fn state(&self) -> &DialogState {
        &self.state
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn controls(&self) -> ControlState {
        self.state.controls()
    }

    /// Subscribe to every change emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Mutate the state and emit the resulting changes
    ///
    /// # Returns
    /// The StateChange events that were emitted, in emission order
    pub fn update<F>(&mut self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut DialogState),
    {
        let old_state = self.state.clone();
        update_fn(&mut self.state);

        let changes = detect_changes(&old_state, &self.state);
        for change in &changes {
            self.emit(change);
        }
        changes
    }

    /// Append a line to the operator log.
    pub fn append_log(&mut self, message: impl Into<String>) -> StateChange {
        let message = message.into();
        tracing::info!(target: "streaminject::oplog", "{}", message);

        let index = self.log.push(message.clone());
        self.metrics.record_log_entry();

        let change = StateChange::LogAppended { index, message };
        self.emit(&change);
        change
    }

    /// Ask the UI for a blocking prompt.
    pub fn prompt(&mut self, message: impl Into<String>) -> StateChange {
        let message = message.into();
        tracing::info!("prompting operator: {}", message);
        self.metrics.record_prompt();

        let change = StateChange::PromptRequested { message };
        self.emit(&change);
        change
    }

    /// Select a log entry for the detail display.
    pub fn select_log(&mut self, index: usize) -> StateChange {
        let text = self.log.select(index).unwrap_or_default().to_string();
        let change = StateChange::DetailChanged { text };
        self.emit(&change);
        change
    }

    fn emit(&self, change: &StateChange) {
        // Nobody listening is fine
        let _ = self.state_tx.send(change.clone());
    }
}

/// Diff two states into change events.
fn detect_changes(old: &DialogState, new: &DialogState) -> Vec<StateChange> {
    let mut changes = Vec::new();

    if old.session != new.session {
        changes.push(StateChange::SessionChanged {
            from: old.session,
            to: new.session,
        });
    }

    if old.injection != new.injection {
        changes.push(StateChange::InjectionChanged {
            from: old.injection,
            to: new.injection,
        });
    }

    let controls = new.controls();
    if old.controls() != controls {
        changes.push(StateChange::ControlsChanged(controls));
    }

    if old.remote_users.len() != new.remote_users.len() {
        changes.push(StateChange::ParticipantsChanged {
            count: new.remote_users.len(),
        });
    }

    changes
}
