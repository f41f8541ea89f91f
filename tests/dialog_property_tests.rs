//! Property tests for the dialog state machine
//!
//! Arbitrary interleavings of operator actions and engine events are fed to
//! the controller over a mocked engine. After every step:
//! - controls match the state they are derived from
//! - no join/leave command is issued outside Initialized/InChannel
//! - at most one injection command is ever in flight
//! - a stray inject status never marks a stream injected without its url
//! - the injected stream's surface is detached on every offline event

use mockall::mock;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::sync::{Arc, Mutex};
use streaminject::engine::{
    ChannelProfile, ClientRole, EngineContext, EngineError, EngineResult, InjectStreamConfig,
    RtcEngine, UserOfflineReason, VideoCanvas,
};
use streaminject::{
    ControlState, DialogController, DialogSettings, EngineEvent, InjectStreamStatus,
    InjectionState, Metrics, SessionState, StateChange, Uid, event_channel,
};

mock! {
    pub Engine {}

    impl RtcEngine for Engine {
        fn initialize(&mut self, context: EngineContext) -> EngineResult;
        fn enable_video(&mut self) -> EngineResult;
        fn disable_video(&mut self) -> EngineResult;
        fn set_channel_profile(&mut self, profile: ChannelProfile) -> EngineResult;
        fn set_client_role(&mut self, role: ClientRole) -> EngineResult;
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
        fn release(&mut self, sync: bool);
    }
}

const INJECTED: Uid = Uid(666);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counts {
    join: usize,
    leave: usize,
    inject: usize,
    remove: usize,
    mute: usize,
    detach: usize,
}

type SharedCounts = Arc<Mutex<Counts>>;

fn outcome(accept: bool) -> EngineResult {
    if accept {
        Ok(())
    } else {
        Err(EngineError::Rejected(17))
    }
}

/// Engine accepting lifecycle commands; channel and injection commands are
/// counted and accepted or rejected per `accept`.
fn counting_engine(counts: &SharedCounts, accept: bool) -> MockEngine {
    let mut engine = MockEngine::new();
    engine.expect_initialize().returning(|_| Ok(()));
    engine.expect_enable_video().returning(|| Ok(()));
    engine.expect_disable_video().returning(|| Ok(()));
    engine.expect_set_channel_profile().returning(|_| Ok(()));
    engine.expect_set_client_role().returning(|_| Ok(()));
    engine.expect_start_preview().returning(|| Ok(()));
    engine.expect_stop_preview().returning(|| Ok(()));
    engine.expect_setup_local_video().returning(|_| Ok(()));
    engine.expect_release().return_const(());

    let c = Arc::clone(counts);
    engine.expect_join_channel().returning(move |_, _, _, _| {
        c.lock().unwrap().join += 1;
        outcome(accept)
    });
    let c = Arc::clone(counts);
    engine.expect_leave_channel().returning(move || {
        c.lock().unwrap().leave += 1;
        outcome(accept)
    });
    let c = Arc::clone(counts);
    engine.expect_add_inject_stream_url().returning(move |_, _| {
        c.lock().unwrap().inject += 1;
        outcome(accept)
    });
    let c = Arc::clone(counts);
    engine.expect_remove_inject_stream_url().returning(move |_| {
        c.lock().unwrap().remove += 1;
        outcome(accept)
    });
    let c = Arc::clone(counts);
    engine.expect_mute_remote_audio_stream().returning(move |_, _| {
        c.lock().unwrap().mute += 1;
        Ok(())
    });
    let c = Arc::clone(counts);
    engine.expect_mute_remote_video_stream().returning(move |_, _| {
        c.lock().unwrap().mute += 1;
        Ok(())
    });
    let c = Arc::clone(counts);
    engine.expect_setup_remote_video().returning(move |_| {
        c.lock().unwrap().detach += 1;
        Ok(())
    });
    engine
}

fn create_dialog(counts: &SharedCounts, accept: bool) -> DialogController<MockEngine> {
    let metrics = Arc::new(Metrics::new());
    let (poster, _queue) = event_channel(Arc::clone(&metrics));
    let settings = DialogSettings {
        app_id: "app".to_string(),
        ..DialogSettings::default()
    };
    let mut dialog = DialogController::new(settings, poster, metrics);
    dialog.initialize(counting_engine(counts, accept));
    dialog
}

#[derive(Debug, Clone)]
enum Step {
    ToggleJoin(String),
    ToggleInjection(String),
    Event(EngineEvent),
}

fn uid_strategy() -> impl Strategy<Value = Uid> {
    prop_oneof![Just(INJECTED), (1u32..5).prop_map(Uid)]
}

fn event_strategy() -> impl Strategy<Value = EngineEvent> {
    prop_oneof![
        Just(EngineEvent::JoinChannelSuccess {
            uid: Uid(7),
            elapsed_ms: 0
        }),
        Just(EngineEvent::LeaveChannel),
        uid_strategy().prop_map(|uid| EngineEvent::UserJoined { uid, elapsed_ms: 0 }),
        (uid_strategy(), 0i32..3).prop_map(|(uid, code)| EngineEvent::UserOffline {
            uid,
            reason: UserOfflineReason::from_code(code)
        }),
        (-1i32..12).prop_map(|status| EngineEvent::StreamInjectedStatus {
            uid: INJECTED,
            status
        }),
    ]
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        prop_oneof![Just(String::new()), Just("demo".to_string())].prop_map(Step::ToggleJoin),
        prop_oneof![
            Just(String::new()),
            Just("rtmp://example.com/live/a".to_string())
        ]
        .prop_map(Step::ToggleInjection),
        event_strategy().prop_map(Step::Event),
        // Bias towards the events that move the machine forward
        Just(Step::Event(EngineEvent::JoinChannelSuccess {
            uid: Uid(7),
            elapsed_ms: 0
        })),
        (0i32..11).prop_map(|status| Step::Event(EngineEvent::StreamInjectedStatus {
            uid: INJECTED,
            status
        })),
    ]
}

fn run_step(dialog: &mut DialogController<MockEngine>, step: &Step) -> Vec<StateChange> {
    match step {
        Step::ToggleJoin(channel) => dialog.toggle_join(channel),
        Step::ToggleInjection(url) => dialog.toggle_injection(url),
        Step::Event(event) => dialog.handle_event(*event),
    }
}

fn check_step(
    dialog: &DialogController<MockEngine>,
    step: &Step,
    before: (SessionState, InjectionState, Counts),
    after: Counts,
    changes: &[StateChange],
) -> Result<(), TestCaseError> {
    let (session, injection, counts) = before;

    let controls = dialog.controls();
    prop_assert_eq!(
        controls,
        ControlState::derive(dialog.session(), dialog.injection())
    );
    if controls.inject_enabled {
        prop_assert_eq!(dialog.session(), SessionState::InChannel);
        prop_assert!(!dialog.injection().is_in_flight());
    }
    if matches!(
        dialog.injection(),
        InjectionState::Injected | InjectionState::RemoveRequested
    ) {
        prop_assert!(dialog.state().inject_url.is_some());
    }

    match step {
        Step::ToggleJoin(channel) => {
            let allowed = match session {
                SessionState::Initialized => !channel.is_empty(),
                SessionState::InChannel => true,
                _ => false,
            };
            if !allowed {
                prop_assert_eq!(after, counts);
                prop_assert_eq!(dialog.session(), session);
            }
            if session == SessionState::Initialized && channel.is_empty() {
                let prompt_only = matches!(changes, [StateChange::PromptRequested { .. }]);
                prop_assert!(prompt_only);
            }
        }
        Step::ToggleInjection(_) => {
            let issued = (after.inject + after.remove) - (counts.inject + counts.remove);
            prop_assert!(issued <= 1);
            if session != SessionState::InChannel || injection.is_in_flight() {
                prop_assert_eq!(issued, 0);
                prop_assert!(changes.is_empty());
            }
            if issued == 1 && dialog.injection().is_in_flight() {
                prop_assert!(!dialog.controls().inject_enabled);
            }
        }
        Step::Event(EngineEvent::UserOffline { uid, .. }) if *uid == INJECTED => {
            prop_assert_eq!(after.detach, counts.detach + 1);
        }
        Step::Event(EngineEvent::UserJoined { uid, .. }) => {
            let expected = if *uid == INJECTED && session == SessionState::InChannel {
                2
            } else {
                0
            };
            prop_assert_eq!(after.mute, counts.mute + expected);
        }
        Step::Event(EngineEvent::StreamInjectedStatus { status, .. }) => {
            if session == SessionState::InChannel {
                prop_assert!(!dialog.injection().is_in_flight());
                prop_assert!(dialog.controls().inject_enabled);
            }
            let broken = *status == InjectStreamStatus::Broken.code();
            if !injection.is_in_flight() && !broken {
                prop_assert_eq!(dialog.injection(), injection);
            }
        }
        Step::Event(EngineEvent::JoinChannelSuccess { .. }) => {
            if session != SessionState::JoiningChannel {
                prop_assert_eq!(dialog.session(), session);
            }
        }
        Step::Event(_) => {}
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_state_machine_invariants(
        steps in prop::collection::vec(step_strategy(), 1..60),
        accept in any::<bool>(),
    ) {
        let counts: SharedCounts = Arc::default();
        let mut dialog = create_dialog(&counts, accept);
        prop_assert_eq!(dialog.session(), SessionState::Initialized);

        for step in &steps {
            let before = (dialog.session(), dialog.injection(), *counts.lock().unwrap());
            let changes = run_step(&mut dialog, step);
            let after = *counts.lock().unwrap();
            check_step(&dialog, step, before, after, &changes)?;
        }

        dialog.shutdown();
        prop_assert_eq!(dialog.session(), SessionState::Uninitialized);
    }

    #[test]
    fn prop_join_sequence_enables_injection_once(
        channel in "[A-Za-z0-9_]{1,64}",
        local in 1u32..100_000,
    ) {
        let counts: SharedCounts = Arc::default();
        let mut dialog = create_dialog(&counts, true);

        let mut changes = dialog.toggle_join(&channel);
        changes.extend(dialog.handle_event(EngineEvent::JoinChannelSuccess {
            uid: Uid(local),
            elapsed_ms: 1,
        }));

        prop_assert_eq!(dialog.session(), SessionState::InChannel);
        prop_assert_eq!(dialog.state().channel.as_deref(), Some(channel.as_str()));
        let enabled = changes
            .iter()
            .filter(|change| matches!(change, StateChange::ControlsChanged(c) if c.inject_enabled))
            .count();
        prop_assert_eq!(enabled, 1);
        let join_success = format!(":join success, uid={}", local);
        prop_assert!(dialog.log().contains(&join_success));
    }
}
