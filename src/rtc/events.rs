//! Event Types für die Engine-Handles
//!
//! Beide Handle-Arten (Engine und expliziter Channel) liefern dieselben
//! vier Event-Arten über einen Broadcast-Channel.

// ============================================================================
// PARTICIPANT ID
// ============================================================================

/// Teilnehmer-ID, wie sie die Engine vergibt
pub type Uid = u32;

// ============================================================================
// ENGINE EVENTS
// ============================================================================

/// Events die von einem Engine- oder Channel-Handle ausgelöst werden
#[derive(Debug, Clone)]
pub enum RtcEvent {
    /// Fehler von der Engine
    Error { code: i32, message: String },

    /// Remote-Teilnehmer ist dem Channel beigetreten
    UserJoined { uid: Uid, elapsed_ms: u64 },

    /// Remote-Teilnehmer hat den Channel verlassen
    /// (reason ist ein roher Engine-Code: 0 = quit, 1 = dropped)
    UserOffline { uid: Uid, reason: i32 },

    /// Lokaler Beitritt wurde von der Engine bestätigt
    JoinChannelSuccess {
        channel: String,
        uid: Uid,
        elapsed_ms: u64,
    },
}
