use super::{
    ChannelProfile, ClientRole, ERR_INVALID_APP_ID, EngineContext, EngineError,
    EngineEventHandler, EngineResult, InjectStreamConfig, RtcEngine, RtcStats, UserOfflineReason,
    VideoCanvas,
};
use crate::models::{InjectStreamStatus, SimulationSettings, Uid};
use indexmap::IndexSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// Engine error code for an invalid argument.
pub const ERR_INVALID_ARGUMENT: i32 = 2;

/// Engine error code for a command issued in the wrong session state.
pub const ERR_NOT_READY: i32 = 3;

/// Engine error code for a join while already in a channel.
pub const ERR_JOIN_CHANNEL_REJECTED: i32 = 17;

struct ChannelSession {
    name: String,
    uid: Uid,
    joined_at: Instant,
}

/// In-process engine that answers commands the way a hosted RTC engine does.
///
/// Commands are validated and accepted synchronously; their outcome is
/// delivered later from a tokio task through the registered
/// [`EngineEventHandler`]. After [`release`](RtcEngine::release) no further
/// callbacks fire, including ones already scheduled.
pub struct SimulatedEngine {
    runtime: Handle,
    settings: SimulationSettings,
    injected_uid: Uid,
    handler: Option<Arc<dyn EngineEventHandler>>,
    alive: Arc<AtomicBool>,
    video_enabled: bool,
    previewing: bool,
    profile: Option<ChannelProfile>,
    role: Option<ClientRole>,
    channel: Option<ChannelSession>,
    injected_urls: IndexSet<String>,
    commands: Vec<&'static str>,
}

impl SimulatedEngine {
    /// Create an engine that schedules its callbacks on `runtime`.
    ///
    /// # Arguments
    /// * `runtime` - Handle of the runtime standing in for the engine's threads
    /// * `settings` - Latencies and scripted outcomes
    /// * `injected_uid` - Participant id injected streams join under
    pub fn new(runtime: Handle, settings: SimulationSettings, injected_uid: Uid) -> Self {
        Self {
            runtime,
            settings,
            injected_uid,
            handler: None,
            alive: Arc::new(AtomicBool::new(true)),
            video_enabled: false,
            previewing: false,
            profile: None,
            role: None,
            channel: None,
            injected_urls: IndexSet::new(),
            commands: Vec::new(),
        }
    }

    /// Names of the commands received so far, in call order.
    pub fn commands(&self) -> &[&'static str] {
        &self.commands
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn is_previewing(&self) -> bool {
        self.previewing
    }

    pub fn channel_name(&self) -> Option<&str> {
        self.channel.as_ref().map(|c| c.name.as_str())
    }

    pub fn injected_urls(&self) -> impl Iterator<Item = &str> {
        self.injected_urls.iter().map(String::as_str)
    }

    pub fn is_released(&self) -> bool {
        !self.alive.load(Ordering::SeqCst)
    }

    fn record(&mut self, command: &'static str) {
        tracing::trace!("simulated engine command: {}", command);
        self.commands.push(command);
    }

    fn handler(&self) -> Result<Arc<dyn EngineEventHandler>, EngineError> {
        self.handler.clone().ok_or(EngineError::NotInitialized)
    }

    /// Run `callback` on a runtime task after `delay`, unless released by then.
    fn dispatch<F>(&self, delay: Duration, callback: F) -> EngineResult
    where
        F: FnOnce(&dyn EngineEventHandler) + Send + 'static,
    {
        let handler = self.handler()?;
        let alive = Arc::clone(&self.alive);

        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if alive.load(Ordering::SeqCst) {
                callback(handler.as_ref());
            } else {
                tracing::trace!("simulated engine released, callback discarded");
            }
        });

        Ok(())
    }

    fn require_initialized(&self) -> EngineResult {
        if self.handler.is_some() {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }
}

impl RtcEngine for SimulatedEngine {
    fn initialize(&mut self, context: EngineContext) -> EngineResult {
        self.record("initialize");
        if context.app_id.trim().is_empty() {
            return Err(EngineError::Rejected(ERR_INVALID_APP_ID));
        }

        self.handler = Some(context.event_handler);
        self.alive.store(true, Ordering::SeqCst);
        tracing::debug!("simulated engine initialized");
        Ok(())
    }

    fn enable_video(&mut self) -> EngineResult {
        self.record("enable_video");
        self.require_initialized()?;
        self.video_enabled = true;
        Ok(())
    }

    fn disable_video(&mut self) -> EngineResult {
        self.record("disable_video");
        self.require_initialized()?;
        self.video_enabled = false;
        Ok(())
    }

    fn set_channel_profile(&mut self, profile: ChannelProfile) -> EngineResult {
        self.record("set_channel_profile");
        self.require_initialized()?;
        self.profile = Some(profile);
        Ok(())
    }

    fn set_client_role(&mut self, role: ClientRole) -> EngineResult {
        self.record("set_client_role");
        self.require_initialized()?;
        self.role = Some(role);
        Ok(())
    }

    fn join_channel(&mut self, _token: &str, channel: &str, _info: &str, uid: Uid) -> EngineResult {
        self.record("join_channel");
        self.require_initialized()?;
        if channel.is_empty() {
            return Err(EngineError::Rejected(ERR_INVALID_ARGUMENT));
        }
        if self.channel.is_some() {
            return Err(EngineError::Rejected(ERR_JOIN_CHANNEL_REJECTED));
        }

        let uid = if uid == Uid::AUTO {
            self.settings.local_uid
        } else {
            uid
        };
        let name = channel.to_string();
        let delay = Duration::from_millis(self.settings.join_delay_ms);
        let elapsed_ms = self.settings.join_delay_ms.min(u32::MAX as u64) as u32;

        let callback_name = name.clone();
        self.dispatch(delay, move |handler| {
            handler.on_join_channel_success(&callback_name, uid, elapsed_ms);
        })?;

        self.channel = Some(ChannelSession {
            name,
            uid,
            joined_at: Instant::now(),
        });
        Ok(())
    }

    fn leave_channel(&mut self) -> EngineResult {
        self.record("leave_channel");
        self.require_initialized()?;

        let stats = match self.channel.take() {
            Some(session) => {
                tracing::debug!(
                    "simulated engine leaving {} as {}",
                    session.name,
                    session.uid
                );
                RtcStats {
                    duration_secs: session.joined_at.elapsed().as_secs() as u32,
                    user_count: 1 + self.injected_urls.len() as u32,
                }
            }
            None => RtcStats::default(),
        };
        self.injected_urls.clear();

        let delay = Duration::from_millis(self.settings.leave_delay_ms);
        self.dispatch(delay, move |handler| handler.on_leave_channel(&stats))
    }

    fn start_preview(&mut self) -> EngineResult {
        self.record("start_preview");
        self.require_initialized()?;
        self.previewing = true;
        Ok(())
    }

    fn stop_preview(&mut self) -> EngineResult {
        self.record("stop_preview");
        self.require_initialized()?;
        self.previewing = false;
        Ok(())
    }

    fn setup_local_video(&mut self, _canvas: VideoCanvas) -> EngineResult {
        self.record("setup_local_video");
        self.require_initialized()
    }

    fn setup_remote_video(&mut self, _canvas: VideoCanvas) -> EngineResult {
        self.record("setup_remote_video");
        self.require_initialized()
    }

    fn add_inject_stream_url(&mut self, url: &str, _config: &InjectStreamConfig) -> EngineResult {
        self.record("add_inject_stream_url");
        self.require_initialized()?;
        if self.channel.is_none() {
            return Err(EngineError::Rejected(ERR_NOT_READY));
        }
        if url.trim().is_empty() {
            return Err(EngineError::Rejected(ERR_INVALID_ARGUMENT));
        }

        let status = if self.injected_urls.contains(url) {
            InjectStreamStatus::StartAlreadyExists
        } else {
            self.settings
                .forced_start_status
                .unwrap_or(InjectStreamStatus::StartSuccess)
        };
        if status == InjectStreamStatus::StartSuccess {
            self.injected_urls.insert(url.to_string());
        }

        let url = url.to_string();
        let injected_uid = self.injected_uid;
        let delay = Duration::from_millis(self.settings.inject_delay_ms);
        self.dispatch(delay, move |handler| {
            handler.on_stream_injected_status(&url, injected_uid, status.code());
            if status == InjectStreamStatus::StartSuccess {
                handler.on_user_joined(injected_uid, 0);
            }
        })
    }

    fn remove_inject_stream_url(&mut self, url: &str) -> EngineResult {
        self.record("remove_inject_stream_url");
        self.require_initialized()?;
        if self.channel.is_none() {
            return Err(EngineError::Rejected(ERR_NOT_READY));
        }

        let was_injected = self.injected_urls.shift_remove(url);
        let url = url.to_string();
        let injected_uid = self.injected_uid;
        let delay = Duration::from_millis(self.settings.inject_delay_ms);
        self.dispatch(delay, move |handler| {
            if was_injected {
                handler.on_user_offline(injected_uid, UserOfflineReason::Quit);
                handler.on_stream_injected_status(
                    &url,
                    injected_uid,
                    InjectStreamStatus::StopSuccess.code(),
                );
            } else {
                handler.on_stream_injected_status(
                    &url,
                    injected_uid,
                    InjectStreamStatus::StopNotFound.code(),
                );
            }
        })
    }

    fn mute_remote_audio_stream(&mut self, _uid: Uid, _mute: bool) -> EngineResult {
        self.record("mute_remote_audio_stream");
        self.require_initialized()
    }

    fn mute_remote_video_stream(&mut self, _uid: Uid, _mute: bool) -> EngineResult {
        self.record("mute_remote_video_stream");
        self.require_initialized()
    }

    fn release(&mut self, _sync: bool) {
        self.record("release");
        self.alive.store(false, Ordering::SeqCst);
        self.handler = None;
        self.channel = None;
        self.injected_urls.clear();
        self.previewing = false;
        self.video_enabled = false;
        tracing::debug!("simulated engine released");
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
