// UI module - Slint window and event loop bridge
//
// This module contains:
// - EventLoopBridge: Pumps engine events from the event queue onto the Slint event loop
// - GuiController: Owns the window and the dialog controller, applies state changes

pub mod bridge;
pub mod controller;

pub use bridge::{EventLoopBridge, pump_events};
pub use controller::{GuiController, LOCAL_VIEW};
