//! RTC engine boundary.
//!
//! The engine is an external collaborator: commands return synchronously with
//! an accept/reject result, and their outcome arrives later through
//! [`EngineEventHandler`] callbacks invoked on threads the engine owns.
//!
//! - [`RtcEngine`]: command surface the dialog controller drives
//! - [`EngineEventHandler`]: callback surface the engine drives
//! - [`SimulatedEngine`]: in-process engine honouring the same contract on tokio tasks

pub mod simulated;

pub use simulated::SimulatedEngine;

use crate::models::Uid;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Engine error code for "not initialized".
pub const ERR_NOT_INITIALIZED: i32 = 7;

/// Engine error code for an invalid or missing application id.
pub const ERR_INVALID_APP_ID: i32 = 101;

/// Synchronous rejection of an engine command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("rejected with code {0}")]
    Rejected(i32),

    #[error("engine not initialized")]
    NotInitialized,
}

impl EngineError {
    /// Integer code as the engine reports it.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::Rejected(code) => *code,
            EngineError::NotInitialized => ERR_NOT_INITIALIZED,
        }
    }
}

pub type EngineResult = Result<(), EngineError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelProfile {
    Communication,
    #[default]
    LiveBroadcasting,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    #[default]
    Broadcaster,
    Audience,
}

/// Opaque handle of a native surface video is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

/// Binds (or unbinds, with `view: None`) a participant's video to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoCanvas {
    pub uid: Uid,
    pub view: Option<ViewHandle>,
}

impl VideoCanvas {
    pub fn local(view: ViewHandle) -> Self {
        Self {
            uid: Uid::AUTO,
            view: Some(view),
        }
    }

    /// Canvas that detaches whatever surface is bound to `uid`.
    pub fn detached(uid: Uid) -> Self {
        Self {
            uid,
            view: None,
        }
    }
}

/// Transcoding parameters for an injected stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectStreamConfig {
    pub width: u32,
    pub height: u32,
    pub video_gop: u32,
    pub video_framerate: u32,
    pub video_bitrate_kbps: u32,
    pub audio_sample_rate: u32,
    pub audio_bitrate_kbps: u32,
    pub audio_channels: u32,
}

impl Default for InjectStreamConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            video_gop: 30,
            video_framerate: 15,
            video_bitrate_kbps: 400,
            audio_sample_rate: 48_000,
            audio_bitrate_kbps: 48,
            audio_channels: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOfflineReason {
    Quit,
    Dropped,
    BecomeAudience,
    Other(i32),
}

impl UserOfflineReason {
    pub fn code(self) -> i32 {
        match self {
            UserOfflineReason::Quit => 0,
            UserOfflineReason::Dropped => 1,
            UserOfflineReason::BecomeAudience => 2,
            UserOfflineReason::Other(code) => code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            0 => UserOfflineReason::Quit,
            1 => UserOfflineReason::Dropped,
            2 => UserOfflineReason::BecomeAudience,
            other => UserOfflineReason::Other(other),
        }
    }
}

/// Call statistics delivered with the leave-channel callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RtcStats {
    pub duration_secs: u32,
    pub user_count: u32,
}

/// Callback surface of the engine.
///
/// Implementations are invoked from engine-owned threads, possibly
/// concurrently for different callbacks, and must return quickly.
pub trait EngineEventHandler: Send + Sync {
    fn on_join_channel_success(&self, _channel: &str, _uid: Uid, _elapsed_ms: u32) {}

    fn on_leave_channel(&self, _stats: &RtcStats) {}

    fn on_user_joined(&self, _uid: Uid, _elapsed_ms: u32) {}

    fn on_user_offline(&self, _uid: Uid, _reason: UserOfflineReason) {}

    /// `status` is the raw engine code; see [`crate::models::InjectStreamStatus`].
    fn on_stream_injected_status(&self, _url: &str, _uid: Uid, _status: i32) {}
}

/// Everything the engine needs at initialization.
#[derive(Clone)]
pub struct EngineContext {
    pub app_id: String,
    pub event_handler: Arc<dyn EngineEventHandler>,
}

/// Command surface of the engine.
///
/// `Ok` only means the command was accepted for processing.
#[cfg_attr(test, mockall::automock)]
pub trait RtcEngine {
    fn initialize(&mut self, context: EngineContext) -> EngineResult;

    fn enable_video(&mut self) -> EngineResult;

    fn disable_video(&mut self) -> EngineResult;

    fn set_channel_profile(&mut self, profile: ChannelProfile) -> EngineResult;

    fn set_client_role(&mut self, role: ClientRole) -> EngineResult;

    /// `token` may be empty for projects without token authentication.
    fn join_channel(&mut self, token: &str, channel: &str, info: &str, uid: Uid) -> EngineResult;

    fn leave_channel(&mut self) -> EngineResult;

    fn start_preview(&mut self) -> EngineResult;

    fn stop_preview(&mut self) -> EngineResult;

    fn setup_local_video(&mut self, canvas: VideoCanvas) -> EngineResult;

    fn setup_remote_video(&mut self, canvas: VideoCanvas) -> EngineResult;

    fn add_inject_stream_url(&mut self, url: &str, config: &InjectStreamConfig) -> EngineResult;

    fn remove_inject_stream_url(&mut self, url: &str) -> EngineResult;

    fn mute_remote_audio_stream(&mut self, uid: Uid, mute: bool) -> EngineResult;

    fn mute_remote_video_stream(&mut self, uid: Uid, mute: bool) -> EngineResult;

    /// Release all engine resources. No callbacks are delivered afterwards.
    fn release(&mut self, sync: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(EngineError::Rejected(-17).code(), -17);
        assert_eq!(EngineError::NotInitialized.code(), ERR_NOT_INITIALIZED);
    }

    #[test]
    fn test_offline_reason_codes() {
        assert_eq!(UserOfflineReason::from_code(1), UserOfflineReason::Dropped);
        assert_eq!(UserOfflineReason::from_code(9), UserOfflineReason::Other(9));
        assert_eq!(UserOfflineReason::BecomeAudience.code(), 2);
    }

    #[test]
    fn test_detached_canvas_has_no_view() {
        let canvas = VideoCanvas::detached(Uid(666));
        assert_eq!(canvas.uid, Uid(666));
        assert!(canvas.view.is_none());
    }
}
