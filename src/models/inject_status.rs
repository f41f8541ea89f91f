use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Status reported by the engine after an add/remove stream URL command.
///
/// The discriminants are the engine's wire codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectStreamStatus {
    StartSuccess = 0,
    StartAlreadyExists = 1,
    StartUnauthorized = 2,
    StartTimedOut = 3,
    StartFailed = 4,
    StopSuccess = 5,
    StopNotFound = 6,
    StopUnauthorized = 7,
    StopTimedOut = 8,
    StopFailed = 9,
    Broken = 10,
}

/// A status code outside the known range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown inject stream status code {0}")]
pub struct UnknownInjectStatus(pub i32);

/// What an inject status means for the injected stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InjectOutcome {
    /// The stream is part of the channel.
    Present,
    /// The stream is not part of the channel.
    Absent,
}

impl InjectStreamStatus {
    pub const ALL: [InjectStreamStatus; 11] = [
        InjectStreamStatus::StartSuccess,
        InjectStreamStatus::StartAlreadyExists,
        InjectStreamStatus::StartUnauthorized,
        InjectStreamStatus::StartTimedOut,
        InjectStreamStatus::StartFailed,
        InjectStreamStatus::StopSuccess,
        InjectStreamStatus::StopNotFound,
        InjectStreamStatus::StopUnauthorized,
        InjectStreamStatus::StopTimedOut,
        InjectStreamStatus::StopFailed,
        InjectStreamStatus::Broken,
    ];

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Operator-facing description, logged together with the code.
    pub fn description(self) -> &'static str {
        match self {
            InjectStreamStatus::StartSuccess => "Inject stream start success",
            InjectStreamStatus::StartAlreadyExists => "Inject stream already exists",
            InjectStreamStatus::StartUnauthorized => "Inject stream start unauthorized",
            InjectStreamStatus::StartTimedOut => "Inject stream start timed out",
            InjectStreamStatus::StartFailed => "Inject stream start failed",
            InjectStreamStatus::StopSuccess => "Inject stream stop success",
            InjectStreamStatus::StopNotFound => "Inject stream not found",
            InjectStreamStatus::StopUnauthorized => "Inject stream stop unauthorized",
            InjectStreamStatus::StopTimedOut => "Inject stream stop timed out",
            InjectStreamStatus::StopFailed => "Inject stream stop failed",
            InjectStreamStatus::Broken => "Inject stream broken",
        }
    }

    pub fn is_failure(self) -> bool {
        !matches!(
            self,
            InjectStreamStatus::StartSuccess
                | InjectStreamStatus::StartAlreadyExists
                | InjectStreamStatus::StopSuccess
                | InjectStreamStatus::StopNotFound
        )
    }

    /// Failures an operator can reasonably retry unchanged.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            InjectStreamStatus::StartTimedOut
                | InjectStreamStatus::StopTimedOut
                | InjectStreamStatus::Broken
        )
    }

    /// Whether the stream is in the channel after this status.
    pub fn outcome(self) -> InjectOutcome {
        match self {
            InjectStreamStatus::StartSuccess | InjectStreamStatus::StartAlreadyExists => {
                InjectOutcome::Present
            }
            InjectStreamStatus::StartUnauthorized
            | InjectStreamStatus::StartTimedOut
            | InjectStreamStatus::StartFailed => InjectOutcome::Absent,
            InjectStreamStatus::StopSuccess | InjectStreamStatus::StopNotFound => {
                InjectOutcome::Absent
            }
            InjectStreamStatus::StopUnauthorized
            | InjectStreamStatus::StopTimedOut
            | InjectStreamStatus::StopFailed => InjectOutcome::Present,
            InjectStreamStatus::Broken => InjectOutcome::Absent,
        }
    }
}

impl TryFrom<i32> for InjectStreamStatus {
    type Error = UnknownInjectStatus;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        InjectStreamStatus::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(UnknownInjectStatus(code))
    }
}

impl fmt::Display for InjectStreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, err: {}.", self.description(), self.code())
    }
}
