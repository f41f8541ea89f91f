use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant identifier inside a channel.
///
/// `Uid(0)` asks the engine to assign an identifier on join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(pub u32);

impl Uid {
    /// Let the engine pick the local identifier.
    pub const AUTO: Uid = Uid(0);

    /// Identifier the injection service uses for an injected stream.
    pub const DEFAULT_INJECTED_STREAM: Uid = Uid(666);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Uid {
    fn from(value: u32) -> Self {
        Uid(value)
    }
}

/// Lifecycle of the dialog's engine session.
///
/// ```text
/// Uninitialized -> Initialized -> JoiningChannel -> InChannel -> LeavingChannel -> Initialized
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initialized,
    JoiningChannel,
    InChannel,
    LeavingChannel,
}

impl SessionState {
    /// A join or leave command has been accepted and its confirmation is pending.
    pub fn is_transitioning(self) -> bool {
        matches!(self, SessionState::JoiningChannel | SessionState::LeavingChannel)
    }

    /// The engine considers us part of a channel (or on the way in).
    pub fn is_joined_or_joining(self) -> bool {
        matches!(
            self,
            SessionState::JoiningChannel | SessionState::InChannel | SessionState::LeavingChannel
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Uninitialized => "Engine not initialized",
            SessionState::Initialized => "Ready",
            SessionState::JoiningChannel => "Joining channel...",
            SessionState::InChannel => "In channel",
            SessionState::LeavingChannel => "Leaving channel...",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether an external stream URL is currently injected into the channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InjectionState {
    #[default]
    NotInjected,
    InjectRequested,
    Injected,
    RemoveRequested,
}

impl InjectionState {
    /// An add or remove command is waiting for its status callback.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            InjectionState::InjectRequested | InjectionState::RemoveRequested
        )
    }

    /// The stream is (or is being) part of the channel, so the toggle removes it.
    pub fn toggles_to_remove(self) -> bool {
        matches!(
            self,
            InjectionState::Injected | InjectionState::RemoveRequested
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_transitioning_states() {
        assert!(SessionState::JoiningChannel.is_transitioning());
        assert!(SessionState::LeavingChannel.is_transitioning());
        assert!(!SessionState::InChannel.is_transitioning());
        assert!(!SessionState::Initialized.is_transitioning());
    }

    #[test]
    fn test_joined_or_joining() {
        assert!(!SessionState::Uninitialized.is_joined_or_joining());
        assert!(!SessionState::Initialized.is_joined_or_joining());
        assert!(SessionState::JoiningChannel.is_joined_or_joining());
        assert!(SessionState::InChannel.is_joined_or_joining());
    }

    #[test]
    fn test_injection_in_flight() {
        assert!(InjectionState::InjectRequested.is_in_flight());
        assert!(InjectionState::RemoveRequested.is_in_flight());
        assert!(!InjectionState::Injected.is_in_flight());
        assert!(!InjectionState::NotInjected.is_in_flight());
    }

    #[test]
    fn test_uid_display() {
        assert_eq!(Uid::DEFAULT_INJECTED_STREAM.to_string(), "666");
        assert_eq!(Uid::from(42).get(), 42);
    }
}
