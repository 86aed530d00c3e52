//! Simulierte RTC Engine
//!
//! In-Process-Implementierung des Engine-Contracts für die Demo und die
//! Tests. Es gibt keinen Transport und keine Medien - nur Join/Leave-
//! Buchführung und Event-Zustellung über Broadcast-Channels.
//!
//! Im Auto-Confirm-Modus (Default) bestätigt die Simulation jeden Join
//! sofort mit `JoinChannelSuccess`; im manuellen Modus bestätigen Tests
//! selbst über `confirm_join`.

use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

use super::contract::{
    ChannelMediaOptions, RtcChannelHandle, RtcEngineHandle, RtcError, RtcService,
};
use super::events::{RtcEvent, Uid};
use async_trait::async_trait;

// ============================================================================
// SHARED HANDLE CORE
// ============================================================================

/// Gemeinsamer Kern beider Handle-Arten: Event-Sender, Join-Zustand,
/// Released-Flag und Zeitbasis für elapsed_ms.
struct HandleCore {
    auto_confirm: bool,
    created_at: Instant,
    event_tx: broadcast::Sender<RtcEvent>,
    state: Mutex<JoinState>,
    released: AtomicBool,
}

#[derive(Debug, Default)]
struct JoinState {
    joined_channel: Option<String>,
    local_uid: Option<Uid>,
}

impl HandleCore {
    fn new(auto_confirm: bool) -> Self {
        let (event_tx, _) = broadcast::channel(100);

        Self {
            auto_confirm,
            created_at: Instant::now(),
            event_tx,
            state: Mutex::new(JoinState::default()),
            released: AtomicBool::new(false),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.created_at.elapsed().as_millis() as u64
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Registriert einen Join. `uid` 0 wird durch eine zufällige,
    /// Engine-vergebene ID ersetzt.
    fn register_join(&self, channel: &str, uid: Uid) -> Result<(), RtcError> {
        if self.is_released() {
            return Err(RtcError::Released);
        }

        let assigned = if uid == 0 {
            rand::thread_rng().gen_range(1..=0x7fff_ffff)
        } else {
            uid
        };

        {
            let mut state = self.state.lock();
            state.joined_channel = Some(channel.to_string());
            state.local_uid = Some(assigned);
        }

        if self.auto_confirm {
            self.confirm_join();
        }

        Ok(())
    }

    /// Bestätigt den zuletzt registrierten Join mit `JoinChannelSuccess`
    fn confirm_join(&self) {
        let (channel, uid) = {
            let state = self.state.lock();
            match (&state.joined_channel, state.local_uid) {
                (Some(channel), Some(uid)) => (channel.clone(), uid),
                _ => {
                    tracing::warn!("confirm_join without a pending join");
                    return;
                }
            }
        };

        let _ = self.event_tx.send(RtcEvent::JoinChannelSuccess {
            channel,
            uid,
            elapsed_ms: self.elapsed_ms(),
        });
    }

    fn register_leave(&self) -> Result<(), RtcError> {
        if self.is_released() {
            return Err(RtcError::Released);
        }

        let mut state = self.state.lock();
        state.joined_channel = None;
        state.local_uid = None;
        Ok(())
    }

    /// Release ist idempotent: ein bereits freigegebenes Handle meldet
    /// keinen Fehler, nur ein Debug-Log.
    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            tracing::debug!("handle already released");
        }
    }

    fn emit_user_joined(&self, uid: Uid) {
        let _ = self.event_tx.send(RtcEvent::UserJoined {
            uid,
            elapsed_ms: self.elapsed_ms(),
        });
    }

    fn emit_user_offline(&self, uid: Uid, reason: i32) {
        let _ = self.event_tx.send(RtcEvent::UserOffline { uid, reason });
    }

    fn emit_error(&self, code: i32, message: impl Into<String>) {
        let _ = self.event_tx.send(RtcEvent::Error {
            code,
            message: message.into(),
        });
    }
}

// ============================================================================
// ENGINE HANDLE
// ============================================================================

/// Simuliertes Engine-Handle (trägt den Primary-Channel)
pub struct SimulatedEngineHandle {
    app_id: String,
    video_enabled: AtomicBool,
    core: HandleCore,
}

impl SimulatedEngineHandle {
    fn new(app_id: String, auto_confirm: bool) -> Self {
        Self {
            app_id,
            video_enabled: AtomicBool::new(false),
            core: HandleCore::new(auto_confirm),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.core.is_released()
    }

    /// Bestätigt den lokalen Join (nur im manuellen Modus nötig)
    pub fn confirm_join(&self) {
        self.core.confirm_join();
    }

    /// Simuliert einen Remote-Teilnehmer, der beitritt
    pub fn emit_user_joined(&self, uid: Uid) {
        self.core.emit_user_joined(uid);
    }

    /// Simuliert einen Remote-Teilnehmer, der offline geht
    pub fn emit_user_offline(&self, uid: Uid, reason: i32) {
        self.core.emit_user_offline(uid, reason);
    }

    /// Simuliert einen Engine-Fehler
    pub fn emit_error(&self, code: i32, message: impl Into<String>) {
        self.core.emit_error(code, message);
    }
}

#[async_trait]
impl RtcEngineHandle for SimulatedEngineHandle {
    fn subscribe(&self) -> broadcast::Receiver<RtcEvent> {
        self.core.event_tx.subscribe()
    }

    async fn enable_video(&self) -> Result<(), RtcError> {
        if self.core.is_released() {
            return Err(RtcError::Released);
        }
        self.video_enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn join_channel(
        &self,
        _token: Option<&str>,
        channel: &str,
        _optional_info: Option<&str>,
        uid: Uid,
    ) -> Result<(), RtcError> {
        tracing::debug!("simulated engine join: {}", channel);
        self.core.register_join(channel, uid)
    }

    async fn leave_channel(&self) -> Result<(), RtcError> {
        self.core.register_leave()
    }

    async fn destroy(&self) -> Result<(), RtcError> {
        self.core.release();
        Ok(())
    }
}

impl std::fmt::Debug for SimulatedEngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedEngineHandle")
            .field("app_id", &self.app_id)
            .field("released", &self.is_released())
            .finish()
    }
}

// ============================================================================
// CHANNEL HANDLE
// ============================================================================

/// Simuliertes explizites Channel-Handle (Secondary-Channel)
pub struct SimulatedChannelHandle {
    name: String,
    core: HandleCore,
}

impl SimulatedChannelHandle {
    fn new(name: String, auto_confirm: bool) -> Self {
        Self {
            name,
            core: HandleCore::new(auto_confirm),
        }
    }

    pub fn is_released(&self) -> bool {
        self.core.is_released()
    }

    /// Bestätigt den lokalen Join (nur im manuellen Modus nötig)
    pub fn confirm_join(&self) {
        self.core.confirm_join();
    }

    /// Simuliert einen Remote-Teilnehmer, der beitritt
    pub fn emit_user_joined(&self, uid: Uid) {
        self.core.emit_user_joined(uid);
    }

    /// Simuliert einen Remote-Teilnehmer, der offline geht
    pub fn emit_user_offline(&self, uid: Uid, reason: i32) {
        self.core.emit_user_offline(uid, reason);
    }

    /// Simuliert einen Engine-Fehler
    pub fn emit_error(&self, code: i32, message: impl Into<String>) {
        self.core.emit_error(code, message);
    }
}

#[async_trait]
impl RtcChannelHandle for SimulatedChannelHandle {
    fn channel_name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self) -> broadcast::Receiver<RtcEvent> {
        self.core.event_tx.subscribe()
    }

    async fn join_channel(
        &self,
        _token: Option<&str>,
        _optional_info: Option<&str>,
        uid: Uid,
        options: ChannelMediaOptions,
    ) -> Result<(), RtcError> {
        tracing::debug!(
            "simulated channel join: {} (audio: {}, video: {})",
            self.name,
            options.auto_subscribe_audio,
            options.auto_subscribe_video
        );
        self.core.register_join(&self.name, uid)
    }

    async fn leave_channel(&self) -> Result<(), RtcError> {
        self.core.register_leave()
    }

    async fn destroy(&self) -> Result<(), RtcError> {
        self.core.release();
        Ok(())
    }
}

impl std::fmt::Debug for SimulatedChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedChannelHandle")
            .field("name", &self.name)
            .field("released", &self.is_released())
            .finish()
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// Simulierter Engine-Einstiegspunkt
///
/// Behält Referenzen auf alle erstellten Handles, damit Demo und Tests
/// die konkreten Typen erreichen und Events einspeisen können.
pub struct SimulatedRtc {
    auto_confirm: bool,
    engine: Mutex<Option<Arc<SimulatedEngineHandle>>>,
    channels: Mutex<Vec<Arc<SimulatedChannelHandle>>>,
}

impl SimulatedRtc {
    /// Simulation mit sofortiger Join-Bestätigung
    pub fn new() -> Self {
        Self {
            auto_confirm: true,
            engine: Mutex::new(None),
            channels: Mutex::new(Vec::new()),
        }
    }

    /// Simulation ohne automatische Join-Bestätigung (für Tests)
    pub fn manual() -> Self {
        Self {
            auto_confirm: false,
            ..Self::new()
        }
    }

    /// Gibt das zuletzt erstellte Engine-Handle zurück
    pub fn engine_handle(&self) -> Option<Arc<SimulatedEngineHandle>> {
        self.engine.lock().clone()
    }

    /// Gibt das Channel-Handle mit dem gegebenen Namen zurück
    pub fn channel_handle(&self, name: &str) -> Option<Arc<SimulatedChannelHandle>> {
        self.channels
            .lock()
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }
}

impl Default for SimulatedRtc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RtcService for SimulatedRtc {
    async fn create_engine(&self, app_id: &str) -> Result<Arc<dyn RtcEngineHandle>, RtcError> {
        if app_id.is_empty() {
            return Err(RtcError::EngineCreation("empty app id".to_string()));
        }

        let mut slot = self.engine.lock();

        // Doppelte Engine-Handles sind ein Ressourcen-Leck im echten SDK
        if let Some(existing) = slot.as_ref() {
            if !existing.is_released() {
                return Err(RtcError::EngineCreation(
                    "engine handle already exists".to_string(),
                ));
            }
        }

        let handle = Arc::new(SimulatedEngineHandle::new(
            app_id.to_string(),
            self.auto_confirm,
        ));
        *slot = Some(Arc::clone(&handle));

        Ok(handle)
    }

    async fn create_channel(&self, name: &str) -> Result<Arc<dyn RtcChannelHandle>, RtcError> {
        if name.is_empty() {
            return Err(RtcError::ChannelCreation("empty channel name".to_string()));
        }

        let mut channels = self.channels.lock();

        if channels.iter().any(|c| c.name == name && !c.is_released()) {
            return Err(RtcError::ChannelCreation(format!(
                "channel handle for '{}' already exists",
                name
            )));
        }

        let handle = Arc::new(SimulatedChannelHandle::new(
            name.to_string(),
            self.auto_confirm,
        ));
        channels.push(Arc::clone(&handle));

        Ok(handle)
    }
}

// ============================================================================
// TESTS
// ============================================================================
