//! Services module - the dialog's business logic, free of any UI toolkit.
//!
//! - [`DialogController`]: turns operator actions into engine commands and
//!   engine events into [`crate::state::StateChange`]s.
//! - [`validation`]: preconditions on operator input (channel name, inject URL).
//!
//! Nothing here touches Slint, so the whole flow is testable against a mock
//! or simulated engine.

pub mod dialog;
pub mod validation;

pub use dialog::{DialogController, DialogSettings};
pub use validation::{InputError, validate_channel_name, validate_inject_url};
