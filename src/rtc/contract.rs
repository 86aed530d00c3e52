//! Capability Contract für die externe RTC Engine
//!
//! Die eigentliche Engine (Transport, Codecs, Rendering) ist ein externer
//! Kollaborateur. Dieses Modul definiert nur die Schnittstelle, die der
//! Session Controller konsumiert:
//! - Factory für Engine- und Channel-Handles
//! - Join/Leave/Destroy pro Handle
//! - Event-Subscription über Broadcast-Channels

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use super::events::{RtcEvent, Uid};

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone)]
pub enum RtcError {
    #[error("Failed to create engine handle: {0}")]
    EngineCreation(String),

    #[error("Failed to create channel handle: {0}")]
    ChannelCreation(String),

    #[error("Join request rejected: {0}")]
    JoinRejected(String),

    #[error("Leave request rejected: {0}")]
    LeaveRejected(String),

    #[error("Handle already released")]
    Released,
}

// ============================================================================
// CHANNEL MEDIA OPTIONS
// ============================================================================

/// Subscription-Optionen für den Beitritt über ein Channel-Handle
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelMediaOptions {
    pub auto_subscribe_audio: bool,
    pub auto_subscribe_video: bool,
}

impl Default for ChannelMediaOptions {
    fn default() -> Self {
        Self {
            auto_subscribe_audio: true,
            auto_subscribe_video: true,
        }
    }
}

// ============================================================================
// HANDLE TRAITS
// ============================================================================

/// Engine-Handle: trägt den Primary-Channel und die Video-Aktivierung
#[async_trait]
pub trait RtcEngineHandle: Send + Sync {
    /// Gibt einen Event-Receiver zurück
    fn subscribe(&self) -> broadcast::Receiver<RtcEvent>;

    /// Aktiviert Video Capture und Rendering
    async fn enable_video(&self) -> Result<(), RtcError>;

    /// Tritt einem Channel auf Engine-Ebene bei.
    ///
    /// `uid` 0 bedeutet: die Engine vergibt die ID selbst. Erfolg wird
    /// asynchron über `JoinChannelSuccess` gemeldet, nie als Rückgabewert.
    async fn join_channel(
        &self,
        token: Option<&str>,
        channel: &str,
        optional_info: Option<&str>,
        uid: Uid,
    ) -> Result<(), RtcError>;

    /// Verlässt den Engine-Channel
    async fn leave_channel(&self) -> Result<(), RtcError>;

    /// Gibt die nativen Ressourcen des Handles frei
    async fn destroy(&self) -> Result<(), RtcError>;
}

/// Explizites Channel-Handle (Secondary-Channel)
#[async_trait]
pub trait RtcChannelHandle: Send + Sync {
    /// Name des Channels, für den das Handle erstellt wurde
    fn channel_name(&self) -> &str;

    /// Gibt einen Event-Receiver zurück
    fn subscribe(&self) -> broadcast::Receiver<RtcEvent>;

    /// Tritt dem Channel bei, mit eigenen Subscription-Optionen
    async fn join_channel(
        &self,
        token: Option<&str>,
        optional_info: Option<&str>,
        uid: Uid,
        options: ChannelMediaOptions,
    ) -> Result<(), RtcError>;

    /// Verlässt den Channel
    async fn leave_channel(&self) -> Result<(), RtcError>;

    /// Gibt die nativen Ressourcen des Handles frei
    async fn destroy(&self) -> Result<(), RtcError>;
}

// ============================================================================
// SERVICE TRAIT
// ============================================================================

/// Einstiegspunkt der externen Engine (Factory für beide Handle-Arten)
#[async_trait]
pub trait RtcService: Send + Sync {
    /// Erstellt das Engine-Handle für die gegebene Application-ID
    async fn create_engine(&self, app_id: &str) -> Result<Arc<dyn RtcEngineHandle>, RtcError>;

    /// Erstellt ein explizites Channel-Handle
    async fn create_channel(&self, name: &str) -> Result<Arc<dyn RtcChannelHandle>, RtcError>;
}
