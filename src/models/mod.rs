//! Data models for the stream injection console.
//!
//! - [`SessionState`] / [`InjectionState`]: the two state machines the dialog drives
//! - [`Uid`]: participant identifier, including the reserved injected-stream id
//! - [`InjectStreamStatus`]: closed set of statuses reported after add/remove stream URL
//! - [`AppConfig`]: settings loaded from `streaminject.yaml`
//!
//! None of these types know about threads; the dialog controller owns them and
//! mutates them on the UI thread only.

pub mod config;
pub mod inject_status;
pub mod session;

pub use config::{
    AppConfig, EngineSettings, InjectionSettings, LoggingSettings, SimulationSettings, UiSettings,
};
pub use inject_status::{InjectOutcome, InjectStreamStatus, UnknownInjectStatus};
pub use session::{InjectionState, SessionState, Uid};
