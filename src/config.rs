//! Session-Konfiguration
//!
//! Application-ID, optionaler Access-Token und die beiden Channel-Namen.
//! Wird beim Prozessstart einmal geladen und danach nicht mehr verändert.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Application id must not be empty")]
    EmptyAppId,

    #[error("Channel name must not be empty")]
    EmptyChannelName,

    #[error("Primary and secondary channel must be distinct: {0}")]
    DuplicateChannelName(String),
}

// ============================================================================
// SESSION CONFIG
// ============================================================================

/// Feste Konfiguration einer Session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub app_id: String,
    /// Token bleibt None für App-IDs ohne Zertifikat
    pub token: Option<String>,
    pub primary_channel: String,
    pub secondary_channel: String,
}

impl SessionConfig {
    /// Liest die Konfiguration aus Umgebungsvariablen, mit den
    /// Demo-Defaults als Fallback
    pub fn from_env() -> Self {
        Self {
            app_id: std::env::var("DUOCALL_APP_ID")
                .unwrap_or_else(|_| "ENTER YOUR APP ID".to_string()),
            token: std::env::var("DUOCALL_TOKEN").ok(),
            primary_channel: std::env::var("DUOCALL_PRIMARY_CHANNEL")
                .unwrap_or_else(|_| "channel-1".to_string()),
            secondary_channel: std::env::var("DUOCALL_SECONDARY_CHANNEL")
                .unwrap_or_else(|_| "channel-2".to_string()),
        }
    }

    /// Prüft die Invarianten: App-ID nicht leer, Channel-Namen nicht leer
    /// und paarweise verschieden
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.trim().is_empty() {
            return Err(ConfigError::EmptyAppId);
        }
        if self.primary_channel.is_empty() || self.secondary_channel.is_empty() {
            return Err(ConfigError::EmptyChannelName);
        }
        if self.primary_channel == self.secondary_channel {
            return Err(ConfigError::DuplicateChannelName(
                self.primary_channel.clone(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_config() -> SessionConfig {
        SessionConfig {
            app_id: "demo-app".to_string(),
            token: None,
            primary_channel: "channel-1".to_string(),
            secondary_channel: "channel-2".to_string(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert_eq!(demo_config().validate(), Ok(()));
    }

    #[test]
    fn empty_app_id_is_rejected() {
        let mut config = demo_config();
        config.app_id = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptyAppId));
    }

    #[test]
    fn empty_channel_name_is_rejected() {
        let mut config = demo_config();
        config.secondary_channel = String::new();
        assert_eq!(config.validate(), Err(ConfigError::EmptyChannelName));
    }

    #[test]
    fn identical_channel_names_are_rejected() {
        let mut config = demo_config();
        config.secondary_channel = config.primary_channel.clone();
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateChannelName("channel-1".to_string()))
        );
    }
}
