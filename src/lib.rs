//! Duocall - Dual-Channel Video Call Demo
//!
//! Eine Demo-Applikation, die eine externe RTC Engine steuert:
//! - Zwei gleichzeitige Channels (Engine-Handle + explizites Channel-Handle)
//! - Roster der Remote-Teilnehmer pro Channel
//! - Start/End-Call-Steuerung und abgeleitete Video-Surface-Liste
//!
//! Transport, Codecs und Rendering liegen vollständig bei der externen
//! Engine; diese Crate konsumiert sie über den Contract in [`rtc`] und
//! liefert eine simulierte Implementierung für Demo und Tests mit.

pub mod config;
pub mod permissions;
pub mod rtc;
pub mod session;
pub mod view;

pub use config::{ConfigError, SessionConfig};
pub use permissions::{GrantedByPlatform, MediaPermissions, PermissionError};
pub use rtc::{
    ChannelMediaOptions, RtcChannelHandle, RtcEngineHandle, RtcError, RtcEvent, RtcService,
    SimulatedRtc, Uid,
};
pub use session::{
    ChannelRole, ChannelSnapshot, SessionController, SessionError, SessionEvent, SessionPhase,
    SessionSnapshot,
};
pub use view::{surfaces, VideoSurface};
