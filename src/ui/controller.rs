// GUI Controller - Bridges the Slint window with the dialog controller
//
// The DialogController lives on the Slint thread behind Rc<RefCell<..>>.
// Button callbacks and engine events (delivered by the EventLoopBridge as
// engine-event invocations) both borrow it, collect the StateChanges it
// returns, release the borrow and then apply the changes to the window.

use crate::engine::{RtcEngine, ViewHandle};
use crate::events::{EngineEvent, EventPoster, EventQueue};
use crate::metrics::Metrics;
use crate::models::AppConfig;
use crate::services::{DialogController, DialogSettings};
use crate::state::{ControlState, StateChange};
use crate::ui::bridge::EventLoopBridge;
use anyhow::{Context, Result};
use slint::{ModelRc, StandardListViewItem, VecModel};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

// Include the generated Slint code
slint::include_modules!();

/// Surface the local preview is bound to.
pub const LOCAL_VIEW: ViewHandle = ViewHandle(1);

type SharedDialog<E> = Rc<RefCell<DialogController<E>>>;

/// Flatten an engine event into the Slint-side message.
pub fn to_message(event: &EngineEvent) -> EngineMessage {
    let (kind, payload_a, payload_b) = event.to_parts();
    EngineMessage {
        kind,
        payload_a,
        payload_b,
    }
}

/// Rebuild the engine event from a Slint-side message.
pub fn from_message(message: &EngineMessage) -> Option<EngineEvent> {
    EngineEvent::from_parts(message.kind, message.payload_a, message.payload_b)
}

fn deliver_engine_event(ui: &MainWindow, event: EngineEvent) {
    ui.invoke_engine_event(to_message(&event));
}

/// GUI Controller that wires the Slint window to the dialog controller
///
/// # Example
/// ```ignore
/// let (poster, queue) = event_channel(metrics.clone());
/// let engine = SimulatedEngine::new(runtime.handle().clone(), config.simulation.clone(), reserved);
/// let controller = GuiController::new(&config, engine, poster, queue, metrics)?;
/// controller.run()?;  // Blocks until window is closed
/// ```
pub struct GuiController<E: RtcEngine + 'static> {
    /// The Slint UI window
    ui: MainWindow,

    /// Pumps engine events onto the Slint event loop
    bridge: EventLoopBridge,

    dialog: SharedDialog<E>,
}

impl<E: RtcEngine + 'static> GuiController<E> {
    /// Create the window, initialize `engine` and start the local preview.
    pub fn new(
        config: &AppConfig,
        engine: E,
        poster: EventPoster,
        queue: EventQueue,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;

        ui.set_window_title(config.ui.window_title.as_str().into());
        ui.set_channel_name(config.ui.default_channel.as_str().into());
        ui.set_inject_url(config.injection.default_url.as_str().into());

        let log_model: Rc<VecModel<StandardListViewItem>> = Rc::new(VecModel::default());
        ui.set_log_entries(ModelRc::from(Rc::clone(&log_model)));

        let dialog: SharedDialog<E> = Rc::new(RefCell::new(DialogController::new(
            DialogSettings::from(config),
            poster,
            metrics,
        )));

        Self::setup_callbacks(&ui, &dialog, &log_model);
        let bridge = EventLoopBridge::new(&ui, queue, deliver_engine_event);

        let changes = {
            let mut dialog = dialog.borrow_mut();
            let mut changes = vec![StateChange::ControlsChanged(dialog.controls())];
            changes.extend(dialog.initialize(engine));
            changes.extend(dialog.render_local_video(LOCAL_VIEW));
            changes
        };
        apply_changes(&ui, &log_model, &changes);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            bridge,
            dialog,
        })
    }

    /// Run the GUI (blocks until window is closed), then tear the engine down.
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        if !self.bridge.is_running() {
            tracing::error!("Engine event pump is not running, engine callbacks will not reach the window");
        }
        let result = self.ui.run();

        tracing::info!("Window closed, releasing engine");
        self.dialog.borrow_mut().shutdown();
        result
    }

    /// Set up Slint UI callbacks
    fn setup_callbacks(
        ui: &MainWindow,
        dialog: &SharedDialog<E>,
        log_model: &Rc<VecModel<StandardListViewItem>>,
    ) {
        let ui_weak = ui.as_weak();
        let dialog_clone = Rc::clone(dialog);
        let log = Rc::clone(log_model);
        ui.on_join_clicked(move |channel| {
            tracing::debug!("Join button clicked");
            let changes = dialog_clone.borrow_mut().toggle_join(channel.as_str());
            if let Some(ui) = ui_weak.upgrade() {
                apply_changes(&ui, &log, &changes);
            }
        });

        let ui_weak = ui.as_weak();
        let dialog_clone = Rc::clone(dialog);
        let log = Rc::clone(log_model);
        ui.on_inject_clicked(move |url| {
            tracing::debug!("Inject button clicked");
            let changes = dialog_clone.borrow_mut().toggle_injection(url.as_str());
            if let Some(ui) = ui_weak.upgrade() {
                apply_changes(&ui, &log, &changes);
            }
        });

        let ui_weak = ui.as_weak();
        let dialog_clone = Rc::clone(dialog);
        let log = Rc::clone(log_model);
        ui.on_log_selected(move |index| {
            // -1 means no selection
            let index = usize::try_from(index).unwrap_or(usize::MAX);
            let changes = dialog_clone.borrow_mut().select_log_entry(index);
            if let Some(ui) = ui_weak.upgrade() {
                apply_changes(&ui, &log, &changes);
            }
        });

        let ui_weak = ui.as_weak();
        ui.on_prompt_dismissed(move || {
            tracing::debug!("Prompt dismissed");
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_show_prompt(false);
            }
        });

        let ui_weak = ui.as_weak();
        let dialog_clone = Rc::clone(dialog);
        let log = Rc::clone(log_model);
        ui.on_engine_event(move |message| {
            let Some(event) = from_message(&message) else {
                tracing::warn!("Undecodable engine message: {:?}", message);
                return;
            };
            let changes = dialog_clone.borrow_mut().handle_event(event);
            if let Some(ui) = ui_weak.upgrade() {
                apply_changes(&ui, &log, &changes);
            }
        });
    }
}

/// Push state changes into the window properties.
fn apply_changes(
    ui: &MainWindow,
    log_model: &VecModel<StandardListViewItem>,
    changes: &[StateChange],
) {
    for change in changes {
        tracing::trace!("Applying {:?}", change);

        match change {
            StateChange::SessionChanged { to, .. } => {
                ui.set_status_text(to.label().into());
            }
            StateChange::InjectionChanged { .. } => {}
            StateChange::ControlsChanged(controls) => apply_controls(ui, controls),
            StateChange::ParticipantsChanged { count } => {
                ui.set_participant_count(i32::try_from(*count).unwrap_or(i32::MAX));
            }
            StateChange::LogAppended { message, .. } => {
                log_model.push(StandardListViewItem::from(message.as_str()));
            }
            StateChange::DetailChanged { text } => {
                ui.set_detail_text(text.as_str().into());
            }
            StateChange::PromptRequested { message } => {
                ui.set_prompt_message(message.as_str().into());
                ui.set_show_prompt(true);
            }
        }
    }
}

fn apply_controls(ui: &MainWindow, controls: &ControlState) {
    ui.set_join_enabled(controls.join_enabled);
    ui.set_join_label(controls.join_label.into());
    ui.set_channel_input_enabled(controls.channel_input_enabled);
    ui.set_inject_enabled(controls.inject_enabled);
    ui.set_inject_url_enabled(controls.inject_url_enabled);
    ui.set_inject_label(controls.inject_label.into());
}
