// StreamInject - live broadcast console for injecting RTMP streams into an RTC channel
//
// This is the library crate containing the core logic and data structures.
// The binary crate (main.rs) provides the GUI entry point.

pub mod config;
pub mod engine;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use engine::{RtcEngine, SimulatedEngine};
pub use events::{EngineEvent, EventPoster, EventQueue, event_channel};
pub use metrics::Metrics;
pub use models::{AppConfig, InjectStreamStatus, InjectionState, SessionState, Uid};
pub use services::{DialogController, DialogSettings};
pub use state::{ControlState, StateChange, StateStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
