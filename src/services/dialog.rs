use crate::engine::{
    ChannelProfile, ClientRole, EngineContext, EngineError, EngineResult, InjectStreamConfig,
    RtcEngine, UserOfflineReason, VideoCanvas, ViewHandle,
};
use crate::events::{EngineEvent, EventPoster};
use crate::metrics::Metrics;
use crate::models::{AppConfig, InjectOutcome, InjectStreamStatus, InjectionState, SessionState, Uid};
use crate::services::validation::{validate_channel_name, validate_inject_url};
use crate::state::{ControlState, DialogState, EventLog, RemoteUser, StateChange, StateStore};
use chrono::Local;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

/// Engine-facing settings of the dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogSettings {
    pub app_id: String,
    pub token: String,
    pub channel_profile: ChannelProfile,
    pub client_role: ClientRole,
    pub reserved_uid: Uid,
    pub stream_config: InjectStreamConfig,
}

impl Default for DialogSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for DialogSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            app_id: config.engine.app_id.clone(),
            token: config.token().unwrap_or_default().to_string(),
            channel_profile: config.engine.channel_profile,
            client_role: config.engine.client_role,
            reserved_uid: config.injection.reserved_uid,
            stream_config: config.injection.stream.clone(),
        }
    }
}

/// Controller behind the stream injection dialog
///
/// Owns the engine handle and the dialog state. User actions become engine
/// commands; engine events (marshalled by [`crate::events::EventForwarder`])
/// become state changes. Every method runs on the one thread that drives the
/// dialog and returns the [`StateChange`]s it produced, in order.
///
/// Commands are fire-and-forget: an accepted command only moves the state to
/// its pending form (JoiningChannel, InjectRequested, ...) and disables the
/// matching controls. The outcome arrives later through
/// [`handle_event`](Self::handle_event). Rejected commands are logged with
/// their code and leave the state untouched so the operator can retry.
///
/// # Example
/// ```ignore
/// let metrics = Arc::new(Metrics::new());
/// let (poster, mut queue) = event_channel(metrics.clone());
/// let mut dialog = DialogController::new(settings, poster, metrics);
///
/// dialog.initialize(engine);
/// dialog.toggle_join("demo");
/// while let Some(event) = queue.next().await {
///     let changes = dialog.handle_event(event);
///     // apply changes to the window
/// }
/// ```
pub struct DialogController<E: RtcEngine> {
    settings: DialogSettings,
    engine: Option<E>,
    store: StateStore,
    poster: EventPoster,
    metrics: Arc<Metrics>,
}

impl<E: RtcEngine> DialogController<E> {
    pub fn new(settings: DialogSettings, poster: EventPoster, metrics: Arc<Metrics>) -> Self {
        Self {
            settings,
            engine: None,
            store: StateStore::new(Arc::clone(&metrics)),
            poster,
            metrics,
        }
    }

    pub fn state(&self) -> &DialogState {
        self.store.state()
    }

    pub fn session(&self) -> SessionState {
        self.store.state().session
    }

    pub fn injection(&self) -> InjectionState {
        self.store.state().injection
    }

    pub fn controls(&self) -> ControlState {
        self.store.controls()
    }

    pub fn log(&self) -> &EventLog {
        self.store.log()
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Subscribe to every state change, e.g. from a parent window.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.store.subscribe()
    }

    /// Take ownership of `engine` and bring it up for live broadcasting.
    ///
    /// A failed `initialize` is terminal: it is logged with its code, the
    /// session stays Uninitialized and join stays disabled. The engine is
    /// still kept so teardown can release it.
    pub fn initialize(&mut self, engine: E) -> Vec<StateChange> {
        if self.engine.is_some() {
            tracing::warn!("Engine already owned by this dialog, ignoring initialize");
            return Vec::new();
        }

        self.engine = Some(engine);
        let mut changes = Vec::new();

        let context = EngineContext {
            app_id: self.settings.app_id.clone(),
            event_handler: Arc::new(self.poster.forwarder()),
        };
        if let Err(err) = self.command("initialize", |engine| engine.initialize(context)) {
            tracing::error!("Engine initialization failed: {}", err);
            changes.push(
                self.store
                    .append_log(format!("initialize failed: {}", err.code())),
            );
            return changes;
        }
        changes.push(self.store.append_log("initialize success"));

        self.command_logged(&mut changes, "enableVideo", "enable video", |engine| {
            engine.enable_video()
        });

        let profile = self.settings.channel_profile;
        let profile_message = match profile {
            ChannelProfile::LiveBroadcasting => "live broadcasting",
            ChannelProfile::Communication => "communication",
        };
        self.command_logged(&mut changes, "setChannelProfile", profile_message, |engine| {
            engine.set_channel_profile(profile)
        });

        let role = self.settings.client_role;
        let role_message = match role {
            ClientRole::Broadcaster => "setClientRole broadcaster",
            ClientRole::Audience => "setClientRole audience",
        };
        self.command_logged(&mut changes, "setClientRole", role_message, |engine| {
            engine.set_client_role(role)
        });

        changes.extend(
            self.store
                .update(|state| state.session = SessionState::Initialized),
        );

        tracing::info!("Engine initialized, ready to join");
        changes
    }

    /// Start the camera preview and bind it to `view`.
    pub fn render_local_video(&mut self, view: ViewHandle) -> Vec<StateChange> {
        if self.session() == SessionState::Uninitialized {
            tracing::debug!("Local preview requested before engine initialization");
            return Vec::new();
        }

        let mut changes = Vec::new();
        self.command_logged(&mut changes, "startPreview", "startPreview", |engine| {
            engine.start_preview()
        });
        self.command_logged(&mut changes, "setupLocalVideo", "setupLocalVideo", |engine| {
            engine.setup_local_video(VideoCanvas::local(view))
        });
        changes
    }

    /// The join/leave button: join while Initialized, leave while InChannel.
    pub fn toggle_join(&mut self, channel_input: &str) -> Vec<StateChange> {
        match self.session() {
            SessionState::Initialized => self.request_join(channel_input),
            SessionState::InChannel => self.request_leave(),
            other => {
                tracing::debug!("Join toggle ignored while {:?}", other);
                Vec::new()
            }
        }
    }

    /// Ask the engine to join `channel_input`.
    ///
    /// No-op unless the session is Initialized. An invalid channel name
    /// prompts the operator without issuing any command.
    pub fn request_join(&mut self, channel_input: &str) -> Vec<StateChange> {
        if self.session() != SessionState::Initialized {
            tracing::debug!("Join request ignored while {:?}", self.session());
            return Vec::new();
        }

        let channel = match validate_channel_name(channel_input) {
            Ok(channel) => channel.to_string(),
            Err(err) => return vec![self.store.prompt(err.to_string())],
        };

        let token = self.settings.token.clone();
        match self.command("joinChannel", |engine| {
            engine.join_channel(&token, &channel, "", Uid::AUTO)
        }) {
            Ok(()) => {
                tracing::info!("Joining channel {}", channel);
                self.store.update(|state| {
                    state.session = SessionState::JoiningChannel;
                    state.channel = Some(channel);
                })
            }
            Err(err) => vec![
                self.store
                    .append_log(format!("join channel failed: {}", err.code())),
            ],
        }
    }

    /// Ask the engine to leave the current channel. No-op unless InChannel.
    pub fn request_leave(&mut self) -> Vec<StateChange> {
        if self.session() != SessionState::InChannel {
            tracing::debug!("Leave request ignored while {:?}", self.session());
            return Vec::new();
        }

        match self.command("leaveChannel", |engine| engine.leave_channel()) {
            Ok(()) => {
                let mut changes = vec![self.store.append_log("leave channel")];
                changes.extend(
                    self.store
                        .update(|state| state.session = SessionState::LeavingChannel),
                );
                changes
            }
            Err(err) => vec![
                self.store
                    .append_log(format!("leave channel failed: {}", err.code())),
            ],
        }
    }

    /// The inject/remove button.
    ///
    /// Only acts while InChannel with no injection command in flight.
    pub fn toggle_injection(&mut self, url_input: &str) -> Vec<StateChange> {
        if !self.controls().inject_enabled {
            tracing::debug!(
                "Injection toggle ignored while {:?}/{:?}",
                self.session(),
                self.injection()
            );
            return Vec::new();
        }

        match self.injection() {
            InjectionState::NotInjected => self.request_inject(url_input),
            InjectionState::Injected => self.request_remove(),
            InjectionState::InjectRequested | InjectionState::RemoveRequested => Vec::new(),
        }
    }

    /// Inject `url_input` into the channel.
    pub fn request_inject(&mut self, url_input: &str) -> Vec<StateChange> {
        if self.session() != SessionState::InChannel
            || self.injection() != InjectionState::NotInjected
        {
            tracing::debug!("Inject request ignored while {:?}", self.injection());
            return Vec::new();
        }

        let url = match validate_inject_url(url_input) {
            Ok(url) => url.to_string(),
            Err(err) => return vec![self.store.prompt(err.to_string())],
        };

        let config = self.settings.stream_config.clone();
        match self.command("addInjectStreamUrl", |engine| {
            engine.add_inject_stream_url(&url, &config)
        }) {
            Ok(()) => {
                tracing::info!("Injecting {}", url);
                self.store.update(|state| {
                    state.injection = InjectionState::InjectRequested;
                    state.inject_url = Some(url);
                })
            }
            Err(err) => vec![
                self.store
                    .append_log(format!("addInjectStreamUrl failed: {}", err.code())),
            ],
        }
    }

    /// Remove the injected stream from the channel.
    pub fn request_remove(&mut self) -> Vec<StateChange> {
        if self.session() != SessionState::InChannel
            || self.injection() != InjectionState::Injected
        {
            tracing::debug!("Remove request ignored while {:?}", self.injection());
            return Vec::new();
        }

        let Some(url) = self.state().inject_url.clone() else {
            tracing::warn!("Remove request without an injected url");
            return Vec::new();
        };
        match self.command("removeInjectStreamUrl", |engine| {
            engine.remove_inject_stream_url(&url)
        }) {
            Ok(()) => {
                tracing::info!("Removing injected stream {}", url);
                self.store
                    .update(|state| state.injection = InjectionState::RemoveRequested)
            }
            Err(err) => vec![
                self.store
                    .append_log(format!("removeInjectStreamUrl failed: {}", err.code())),
            ],
        }
    }

    /// Show the selected log entry in the detail display.
    pub fn select_log_entry(&mut self, index: usize) -> Vec<StateChange> {
        vec![self.store.select_log(index)]
    }

    /// React to one marshalled engine event.
    pub fn handle_event(&mut self, event: EngineEvent) -> Vec<StateChange> {
        self.metrics.record_event_handled();
        tracing::trace!("Handling {:?}", event);

        match event {
            EngineEvent::JoinChannelSuccess { uid, .. } => self.on_join_channel_success(uid),
            EngineEvent::LeaveChannel => self.on_leave_channel(),
            EngineEvent::UserJoined { uid, .. } => self.on_user_joined(uid),
            EngineEvent::UserOffline { uid, reason } => self.on_user_offline(uid, reason),
            EngineEvent::StreamInjectedStatus { status, .. } => self.on_stream_injected_status(status),
        }
    }

    /// Leave (if needed), stop the preview, disable video and release the engine.
    ///
    /// Idempotent; also run on drop.
    pub fn shutdown(&mut self) -> Vec<StateChange> {
        if self.engine.is_none() {
            return Vec::new();
        }

        tracing::info!("Shutting down engine");
        let mut changes = Vec::new();

        // A leave already in progress is not repeated
        if matches!(
            self.session(),
            SessionState::JoiningChannel | SessionState::InChannel
        ) {
            self.command_logged(&mut changes, "leaveChannel", "leave channel", |engine| {
                engine.leave_channel()
            });
        }

        if self.session() != SessionState::Uninitialized {
            self.command_logged(&mut changes, "stopPreview", "stopPreview", |engine| {
                engine.stop_preview()
            });
            self.command_logged(&mut changes, "disableVideo", "disableVideo", |engine| {
                engine.disable_video()
            });
        }

        if let Some(mut engine) = self.engine.take() {
            engine.release(true);
            self.metrics.record_command(true);
        }
        changes.push(self.store.append_log("release rtc engine"));

        changes.extend(self.store.update(|state| {
            *state = DialogState::default();
        }));
        changes
    }

    fn on_join_channel_success(&mut self, uid: Uid) -> Vec<StateChange> {
        if self.session() != SessionState::JoiningChannel {
            tracing::debug!("Stray join success while {:?}", self.session());
            return Vec::new();
        }

        let mut changes = self.store.update(|state| {
            state.session = SessionState::InChannel;
            state.local_uid = Some(uid);
        });
        changes.push(self.store.append_log(format!(
            "{}:join success, uid={}",
            Local::now().format("%H:%M:%S"),
            uid
        )));
        changes
    }

    fn on_leave_channel(&mut self) -> Vec<StateChange> {
        if !self.session().is_joined_or_joining() {
            tracing::debug!("Stray leave channel while {:?}", self.session());
            return Vec::new();
        }

        let mut changes = self.store.update(|state| {
            state.session = SessionState::Initialized;
            state.injection = InjectionState::NotInjected;
            state.channel = None;
            state.local_uid = None;
            state.inject_url = None;
            state.remote_users.clear();
        });
        changes.push(self.store.append_log("leave channel success"));
        changes
    }

    fn on_user_joined(&mut self, uid: Uid) -> Vec<StateChange> {
        if self.session() != SessionState::InChannel {
            tracing::debug!("Stray user joined {} while {:?}", uid, self.session());
            return Vec::new();
        }

        let mut changes = Vec::new();
        let is_injected_stream = uid == self.settings.reserved_uid;

        if is_injected_stream {
            changes.push(
                self.store
                    .append_log(format!("{} joined, {} is inject stream", uid, uid)),
            );
            // The injected stream is not rendered as a participant
            self.command_failure_logged(&mut changes, "muteRemoteAudioStream", |engine| {
                engine.mute_remote_audio_stream(uid, true)
            });
            self.command_failure_logged(&mut changes, "muteRemoteVideoStream", |engine| {
                engine.mute_remote_video_stream(uid, true)
            });
        } else {
            changes.push(self.store.append_log(format!("{} joined", uid)));
        }

        changes.extend(self.store.update(|state| {
            state.remote_users.insert(
                uid,
                RemoteUser {
                    joined_at: Instant::now(),
                    is_injected_stream,
                },
            );
        }));
        changes
    }

    fn on_user_offline(&mut self, uid: Uid, reason: UserOfflineReason) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if uid == self.settings.reserved_uid {
            self.command_failure_logged(&mut changes, "setupRemoteVideo", |engine| {
                engine.setup_remote_video(VideoCanvas::detached(uid))
            });
        } else if !self.state().remote_users.contains_key(&uid) {
            tracing::debug!("Stray user offline {}", uid);
            return changes;
        }

        changes.push(
            self.store
                .append_log(format!("{} offline, reason:{}", uid, reason.code())),
        );
        changes.extend(self.store.update(|state| {
            state.remote_users.shift_remove(&uid);
        }));
        changes
    }

    fn on_stream_injected_status(&mut self, code: i32) -> Vec<StateChange> {
        let status = InjectStreamStatus::try_from(code);
        let message = match status {
            Ok(status) => {
                if status.is_transient() {
                    tracing::warn!("Inject stream interrupted: {:?}", status);
                } else if status.is_failure() {
                    tracing::error!("Inject stream failure: {:?}", status);
                }
                status.to_string()
            }
            Err(unknown) => {
                tracing::warn!("{}", unknown);
                format!("unknown inject status, err: {}.", unknown.0)
            }
        };
        let mut changes = vec![self.store.append_log(message)];

        if self.session() != SessionState::InChannel {
            tracing::debug!("Inject status after leaving channel, state untouched");
            return changes;
        }

        // Any status settles an in-flight command. With nothing in flight only
        // a broken stream changes state.
        let current = self.injection();
        let next = match (current, status) {
            (InjectionState::InjectRequested | InjectionState::RemoveRequested, Ok(status)) => {
                match status.outcome() {
                    InjectOutcome::Present => InjectionState::Injected,
                    InjectOutcome::Absent => InjectionState::NotInjected,
                }
            }
            (InjectionState::InjectRequested, Err(_)) => InjectionState::NotInjected,
            (InjectionState::RemoveRequested, Err(_)) => InjectionState::Injected,
            (InjectionState::Injected, Ok(InjectStreamStatus::Broken)) => {
                InjectionState::NotInjected
            }
            (settled, _) => {
                tracing::debug!("Stray inject status while {:?}, state untouched", settled);
                settled
            }
        };

        changes.extend(self.store.update(|state| {
            state.injection = next;
            if next == InjectionState::NotInjected {
                state.inject_url = None;
            }
        }));
        changes
    }

    /// Issue one engine command and count it.
    fn command<F>(&mut self, name: &'static str, issue: F) -> EngineResult
    where
        F: FnOnce(&mut E) -> EngineResult,
    {
        let engine = self.engine.as_mut().ok_or(EngineError::NotInitialized)?;
        let result = issue(engine);
        self.metrics.record_command(result.is_ok());

        if let Err(ref err) = result {
            tracing::warn!("{} rejected: {}", name, err);
        }
        result
    }

    /// Issue a command and log `ok_message` or `<name> failed: <code>`.
    fn command_logged<F>(
        &mut self,
        changes: &mut Vec<StateChange>,
        name: &'static str,
        ok_message: &str,
        issue: F,
    ) -> bool
    where
        F: FnOnce(&mut E) -> EngineResult,
    {
        match self.command(name, issue) {
            Ok(()) => {
                changes.push(self.store.append_log(ok_message));
                true
            }
            Err(err) => {
                changes.push(
                    self.store
                        .append_log(format!("{} failed: {}", name, err.code())),
                );
                false
            }
        }
    }

    /// Issue a command and log only if it is rejected.
    fn command_failure_logged<F>(
        &mut self,
        changes: &mut Vec<StateChange>,
        name: &'static str,
        issue: F,
    ) where
        F: FnOnce(&mut E) -> EngineResult,
    {
        if let Err(err) = self.command(name, issue) {
            changes.push(
                self.store
                    .append_log(format!("{} failed: {}", name, err.code())),
            );
        }
    }
}

impl<E: RtcEngine> Drop for DialogController<E> {
    fn drop(&mut self) {
        if self.engine.is_some() {
            self.shutdown();
        }
    }
}
