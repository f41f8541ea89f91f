use crate::engine::{ChannelProfile, ClientRole, InjectStreamConfig};
use crate::models::{InjectStreamStatus, Uid};
use serde::{Deserialize, Serialize};

/// Application configuration from `streaminject.yaml`
///
/// Every section falls back to its defaults when missing, so a partial file
/// is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineSettings,
    pub injection: InjectionSettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
    pub simulation: SimulationSettings,
}

/// Engine credentials and broadcast role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Application id issued by the RTC provider. Initialization fails while empty.
    pub app_id: String,

    /// Channel token; empty for projects without token authentication.
    pub app_token: String,

    pub channel_profile: ChannelProfile,
    pub client_role: ClientRole,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_token: String::new(),
            channel_profile: ChannelProfile::LiveBroadcasting,
            client_role: ClientRole::Broadcaster,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionSettings {
    /// Participant id the injected stream shows up under.
    pub reserved_uid: Uid,

    /// Pre-filled injection URL.
    pub default_url: String,

    /// Transcoding parameters handed to the engine with every add command.
    pub stream: InjectStreamConfig,
}

impl Default for InjectionSettings {
    fn default() -> Self {
        Self {
            reserved_uid: Uid::DEFAULT_INJECTED_STREAM,
            default_url: String::new(),
            stream: InjectStreamConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub window_title: String,
    pub default_channel: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            window_title: "RTMP Stream Injection".to_string(),
            default_channel: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub debug_mode: bool,
    pub console_output: bool,
    pub log_dir: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            debug_mode: false,
            console_output: true,
            log_dir: default_log_dir(),
        }
    }
}

fn default_log_dir() -> String {
    "logs".to_string()
}

/// Latencies and scripted outcomes of the simulated engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub join_delay_ms: u64,
    pub leave_delay_ms: u64,
    pub inject_delay_ms: u64,

    /// Uid assigned on join when the caller asks for [`Uid::AUTO`].
    pub local_uid: Uid,

    /// Status reported for every add command instead of success.
    pub forced_start_status: Option<InjectStreamStatus>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            join_delay_ms: 300,
            leave_delay_ms: 100,
            inject_delay_ms: 800,
            local_uid: Uid(10_001),
            forced_start_status: None,
        }
    }
}

impl AppConfig {
    /// Token passed to `join_channel`, `None` when unset.
    pub fn token(&self) -> Option<&str> {
        let token = self.engine.app_token.trim();
        (!token.is_empty()).then_some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let settings = EngineSettings::default();
        assert!(settings.app_id.is_empty());
        assert_eq!(settings.channel_profile, ChannelProfile::LiveBroadcasting);
        assert_eq!(settings.client_role, ClientRole::Broadcaster);
    }

    #[test]
    fn test_reserved_uid_default() {
        let config = AppConfig::default();
        assert_eq!(config.injection.reserved_uid, Uid(666));
    }

    #[test]
    fn test_token_blank_is_none() {
        let mut config = AppConfig::default();
        assert_eq!(config.token(), None);

        config.engine.app_token = "  abc ".to_string();
        assert_eq!(config.token(), Some("abc"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AppConfig =
            serde_yaml_ng::from_str("engine:\n  app_id: demo\n").unwrap();
        assert_eq!(config.engine.app_id, "demo");
        assert_eq!(config.injection.reserved_uid, Uid(666));
        assert_eq!(config.logging.log_dir, "logs");
    }
}
