//! Session Controller
//!
//! Das Kernstück der Anwendung: besitzt das Engine-Handle (Primary-Channel)
//! und das explizite Channel-Handle (Secondary-Channel), steuert den
//! Lebenszyklus initialize → join → leave → teardown und führt pro Channel
//! das Roster der Remote-Teilnehmer nach.
//!
//! Events eines Handles werden von genau einem Listener-Task in
//! Zustell-Reihenfolge angewendet; jede wirksame Änderung wird als
//! `SessionEvent::StateChanged` an die UI-Projektion gemeldet.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::roster::Roster;
use crate::config::{ConfigError, SessionConfig};
use crate::permissions::MediaPermissions;
use crate::rtc::{
    ChannelMediaOptions, RtcChannelHandle, RtcEngineHandle, RtcError, RtcEvent, RtcService, Uid,
};

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session is not initialized")]
    NotInitialized,

    #[error("Session is already initialized")]
    AlreadyInitialized,

    #[error("Session has been released")]
    Released,

    #[error("Invalid session configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Rtc(#[from] RtcError),
}

// ============================================================================
// SESSION STATE
// ============================================================================

/// Rolle eines Channels innerhalb der Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    /// Engine-Handle, Channel A
    Primary,
    /// Explizites Channel-Handle, Channel B
    Secondary,
}

impl std::fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelRole::Primary => write!(f, "primary"),
            ChannelRole::Secondary => write!(f, "secondary"),
        }
    }
}

/// Lebensphase der Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Uninitialized,
    Initialized,
    Released,
}

/// Zustand eines Channels zum Zeitpunkt der Abfrage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    pub name: String,
    /// Von der Engine bestätigter lokaler Beitritt (pro Channel, nicht
    /// pro Session - die Bestätigungen beider Handles sind unabhängig)
    pub joined: bool,
    pub local_uid: Option<Uid>,
    pub roster: Roster,
}

/// Gesamtzustand der Session für die UI-Projektion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub primary: ChannelSnapshot,
    pub secondary: ChannelSnapshot,
}

/// Events die der Controller an die UI-Projektion meldet
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    EngineError {
        channel: ChannelRole,
        code: i32,
        message: String,
    },
}

// ============================================================================
// INTERNAL STATE
// ============================================================================

#[derive(Debug, Default)]
struct ChannelState {
    joined: bool,
    local_uid: Option<Uid>,
    roster: Roster,
}

impl ChannelState {
    fn reset(&mut self) {
        self.joined = false;
        self.local_uid = None;
        self.roster.clear();
    }
}

struct Inner {
    phase: SessionPhase,
    engine: Option<Arc<dyn RtcEngineHandle>>,
    channel: Option<Arc<dyn RtcChannelHandle>>,
    primary: ChannelState,
    secondary: ChannelState,
    listeners: Vec<JoinHandle<()>>,
}

// ============================================================================
// SESSION CONTROLLER
// ============================================================================

/// Steuert eine Session mit zwei gleichzeitigen Channels
pub struct SessionController {
    config: SessionConfig,
    service: Arc<dyn RtcService>,
    permissions: Arc<dyn MediaPermissions>,
    inner: Arc<Mutex<Inner>>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Erstellt einen Controller; Engine und Permission-Layer werden
    /// injiziert, es gibt keinen globalen Singleton-Zustand
    pub fn new(
        config: SessionConfig,
        service: Arc<dyn RtcService>,
        permissions: Arc<dyn MediaPermissions>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);

        Self {
            config,
            service,
            permissions,
            inner: Arc::new(Mutex::new(Inner {
                phase: SessionPhase::Uninitialized,
                engine: None,
                channel: None,
                primary: ChannelState::default(),
                secondary: ChannelState::default(),
                listeners: Vec::new(),
            })),
            event_tx,
        }
    }

    /// Gibt einen Event-Receiver zurück
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().phase
    }

    /// Gibt den aktuellen Gesamtzustand zurück
    pub fn snapshot(&self) -> SessionSnapshot {
        Self::snapshot_locked(&self.inner.lock(), &self.config)
    }

    /// Initialisiert die Session: Berechtigungen anfragen, beide Handles
    /// von der Engine beziehen, Video aktivieren, Event-Listener starten.
    ///
    /// Darf pro Session genau einmal aufgerufen werden; ein zweiter Aufruf
    /// ist ein fataler Initialisierungsfehler (doppelte Handles).
    pub async fn initialize(&self) -> Result<(), SessionError> {
        {
            let inner = self.inner.lock();
            match inner.phase {
                SessionPhase::Uninitialized => {}
                SessionPhase::Initialized => return Err(SessionError::AlreadyInitialized),
                SessionPhase::Released => return Err(SessionError::Released),
            }
        }

        self.config.validate()?;

        // Ablehnung ist nicht fatal; der Fehler zeigt sich später in der
        // Media-Schicht der Engine
        if let Err(e) = self.permissions.ensure_camera_and_mic().await {
            tracing::warn!("Media permission not granted: {}", e);
        }

        let engine = self.service.create_engine(&self.config.app_id).await?;
        let channel = self
            .service
            .create_channel(&self.config.secondary_channel)
            .await?;

        engine.enable_video().await?;

        let primary_listener = self.spawn_listener(ChannelRole::Primary, engine.subscribe());
        let secondary_listener = self.spawn_listener(ChannelRole::Secondary, channel.subscribe());

        {
            let mut inner = self.inner.lock();
            inner.engine = Some(engine);
            inner.channel = Some(channel);
            inner.listeners.push(primary_listener);
            inner.listeners.push(secondary_listener);
            inner.phase = SessionPhase::Initialized;
        }

        tracing::info!(
            "Session initialized (channels: {}, {})",
            self.config.primary_channel,
            self.config.secondary_channel
        );
        self.publish_state();
        Ok(())
    }

    /// Startet den Anruf: beide Join-Requests werden unabhängig voneinander
    /// abgesetzt. Erfolg wird ausschließlich asynchron über
    /// `JoinChannelSuccess` sichtbar; ein abgelehnter Request wird nur
    /// geloggt und ändert den Zustand nicht.
    pub async fn join(&self) -> Result<(), SessionError> {
        let (engine, channel) = self.handles()?;

        let token = self.config.token.as_deref();

        let (primary, secondary) = tokio::join!(
            engine.join_channel(token, &self.config.primary_channel, None, 0),
            channel.join_channel(token, None, 0, ChannelMediaOptions::default()),
        );

        if let Err(e) = primary {
            tracing::error!("Join request for primary channel failed: {}", e);
        }
        if let Err(e) = secondary {
            tracing::error!("Join request for secondary channel failed: {}", e);
        }

        Ok(())
    }

    /// Beendet den Anruf: beide Handles verlassen ihre Channels, danach
    /// werden Roster und Join-Flags bedingungslos zurückgesetzt
    /// (optimistischer Reset, ohne auf Bestätigung zu warten)
    pub async fn leave(&self) -> Result<(), SessionError> {
        let (engine, channel) = self.handles()?;

        let (primary, secondary) = tokio::join!(engine.leave_channel(), channel.leave_channel());

        if let Err(e) = primary {
            tracing::error!("Leave request for primary channel failed: {}", e);
        }
        if let Err(e) = secondary {
            tracing::error!("Leave request for secondary channel failed: {}", e);
        }

        {
            let mut inner = self.inner.lock();
            inner.primary.reset();
            inner.secondary.reset();
        }

        tracing::info!("Left both channels");
        self.publish_state();
        Ok(())
    }

    /// Gibt beide Handles frei: zuerst das Channel-Handle, dann die Engine.
    /// Jede Freigabe ist best-effort und unabhängig. Ein zweiter Aufruf
    /// ist ein gutartiger No-Op.
    pub async fn teardown(&self) -> Result<(), SessionError> {
        let (engine, channel, listeners) = {
            let mut inner = self.inner.lock();
            match inner.phase {
                SessionPhase::Uninitialized => return Err(SessionError::NotInitialized),
                SessionPhase::Released => {
                    tracing::debug!("teardown on already released session");
                    return Ok(());
                }
                SessionPhase::Initialized => {}
            }
            inner.phase = SessionPhase::Released;
            inner.primary.reset();
            inner.secondary.reset();
            (
                inner.engine.take(),
                inner.channel.take(),
                std::mem::take(&mut inner.listeners),
            )
        };

        if let Some(channel) = channel {
            if let Err(e) = channel.destroy().await {
                tracing::error!("Failed to release channel handle: {}", e);
            }
        }
        if let Some(engine) = engine {
            if let Err(e) = engine.destroy().await {
                tracing::error!("Failed to release engine handle: {}", e);
            }
        }

        for listener in listeners {
            listener.abort();
        }

        tracing::info!("Session released");
        self.publish_state();
        Ok(())
    }

    // ========================================================================
    // PRIVATE METHODS
    // ========================================================================

    /// Gibt beide Handles zurück oder den passenden Zustandsfehler.
    /// Ersetzt das stille No-Op-Verhalten auf fehlenden Handles durch
    /// typisierte Fehler.
    fn handles(
        &self,
    ) -> Result<(Arc<dyn RtcEngineHandle>, Arc<dyn RtcChannelHandle>), SessionError> {
        let inner = self.inner.lock();
        match inner.phase {
            SessionPhase::Uninitialized => Err(SessionError::NotInitialized),
            SessionPhase::Released => Err(SessionError::Released),
            SessionPhase::Initialized => match (inner.engine.clone(), inner.channel.clone()) {
                (Some(engine), Some(channel)) => Ok((engine, channel)),
                _ => Err(SessionError::NotInitialized),
            },
        }
    }

    fn spawn_listener(
        &self,
        role: ChannelRole,
        mut rx: broadcast::Receiver<RtcEvent>,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let event_tx = self.event_tx.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                Self::apply_engine_event(&inner, &event_tx, &config, role, event);
            }
        })
    }

    /// Wendet ein Engine-Event auf den Channel-Zustand an. Läuft als
    /// geschlossener kritischer Abschnitt, Handler verzahnen sich nie.
    fn apply_engine_event(
        inner: &Arc<Mutex<Inner>>,
        event_tx: &broadcast::Sender<SessionEvent>,
        config: &SessionConfig,
        role: ChannelRole,
        event: RtcEvent,
    ) {
        match event {
            RtcEvent::UserJoined { uid, elapsed_ms } => {
                tracing::info!("{} channel: user {} joined ({} ms)", role, uid, elapsed_ms);
                let changed = {
                    let mut inner = inner.lock();
                    Self::channel_state_mut(&mut inner, role).roster.insert(uid)
                };
                if changed {
                    Self::publish_state_from(inner, event_tx, config);
                }
            }

            RtcEvent::UserOffline { uid, reason } => {
                // reason wird nur geloggt, nicht modelliert
                tracing::info!("{} channel: user {} offline (reason {})", role, uid, reason);
                let changed = {
                    let mut inner = inner.lock();
                    Self::channel_state_mut(&mut inner, role).roster.remove(uid)
                };
                if changed {
                    Self::publish_state_from(inner, event_tx, config);
                }
            }

            RtcEvent::JoinChannelSuccess {
                channel,
                uid,
                elapsed_ms,
            } => {
                tracing::info!(
                    "{} channel: joined {} as uid {} ({} ms)",
                    role,
                    channel,
                    uid,
                    elapsed_ms
                );
                {
                    let mut inner = inner.lock();
                    let state = Self::channel_state_mut(&mut inner, role);
                    state.joined = true;
                    state.local_uid = Some(uid);
                }
                Self::publish_state_from(inner, event_tx, config);
            }

            RtcEvent::Error { code, message } => {
                // Nie automatisch erneut versuchen, nie Zustand mutieren
                tracing::error!("{} channel: engine error {}: {}", role, code, message);
                let _ = event_tx.send(SessionEvent::EngineError {
                    channel: role,
                    code,
                    message,
                });
            }
        }
    }

    fn channel_state_mut(inner: &mut Inner, role: ChannelRole) -> &mut ChannelState {
        match role {
            ChannelRole::Primary => &mut inner.primary,
            ChannelRole::Secondary => &mut inner.secondary,
        }
    }

    fn snapshot_locked(inner: &Inner, config: &SessionConfig) -> SessionSnapshot {
        SessionSnapshot {
            phase: inner.phase,
            primary: ChannelSnapshot {
                name: config.primary_channel.clone(),
                joined: inner.primary.joined,
                local_uid: inner.primary.local_uid,
                roster: inner.primary.roster.clone(),
            },
            secondary: ChannelSnapshot {
                name: config.secondary_channel.clone(),
                joined: inner.secondary.joined,
                local_uid: inner.secondary.local_uid,
                roster: inner.secondary.roster.clone(),
            },
        }
    }

    fn publish_state(&self) {
        Self::publish_state_from(&self.inner, &self.event_tx, &self.config);
    }

    fn publish_state_from(
        inner: &Arc<Mutex<Inner>>,
        event_tx: &broadcast::Sender<SessionEvent>,
        config: &SessionConfig,
    ) {
        let snapshot = Self::snapshot_locked(&inner.lock(), config);
        let _ = event_tx.send(SessionEvent::StateChanged(snapshot));
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::GrantedByPlatform;
    use crate::rtc::SimulatedRtc;
    use std::time::Duration;

    fn test_config() -> SessionConfig {
        SessionConfig {
            app_id: "test-app".to_string(),
            token: None,
            primary_channel: "channel-1".to_string(),
            secondary_channel: "channel-2".to_string(),
        }
    }

    fn controller_with(sim: &Arc<SimulatedRtc>) -> SessionController {
        SessionController::new(
            test_config(),
            Arc::clone(sim) as Arc<dyn crate::rtc::RtcService>,
            Arc::new(GrantedByPlatform),
        )
    }

    /// Pollt den Snapshot, bis die Bedingung hält (Listener-Tasks laufen
    /// nebenläufig zur Test-Task)
    async fn wait_for(
        controller: &SessionController,
        what: &str,
        condition: impl Fn(&SessionSnapshot) -> bool,
    ) {
        for _ in 0..200 {
            if condition(&controller.snapshot()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("timed out waiting for {}: {:?}", what, controller.snapshot());
    }

    #[tokio::test]
    async fn operations_before_initialize_are_typed_errors() {
        let sim = Arc::new(SimulatedRtc::new());
        let controller = controller_with(&sim);

        assert!(matches!(
            controller.join().await,
            Err(SessionError::NotInitialized)
        ));
        assert!(matches!(
            controller.leave().await,
            Err(SessionError::NotInitialized)
        ));
        assert!(matches!(
            controller.teardown().await,
            Err(SessionError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn initialize_twice_is_an_error() {
        let sim = Arc::new(SimulatedRtc::new());
        let controller = controller_with(&sim);

        controller.initialize().await.unwrap();
        assert!(matches!(
            controller.initialize().await,
            Err(SessionError::AlreadyInitialized)
        ));
    }

    #[tokio::test]
    async fn invalid_config_fails_initialization() {
        let sim = Arc::new(SimulatedRtc::new());
        let mut config = test_config();
        config.secondary_channel = config.primary_channel.clone();
        let controller = SessionController::new(
            config,
            Arc::clone(&sim) as Arc<dyn crate::rtc::RtcService>,
            Arc::new(GrantedByPlatform),
        );

        assert!(matches!(
            controller.initialize().await,
            Err(SessionError::Config(_))
        ));
    }

    #[tokio::test]
    async fn joined_flags_flip_only_on_confirmation_per_channel() {
        let sim = Arc::new(SimulatedRtc::manual());
        let controller = controller_with(&sim);
        controller.initialize().await.unwrap();

        controller.join().await.unwrap();

        // join() selbst setzt kein Flag
        tokio::time::sleep(Duration::from_millis(20)).await;
        let snapshot = controller.snapshot();
        assert!(!snapshot.primary.joined);
        assert!(!snapshot.secondary.joined);

        // Bestätigung des Secondary-Handles setzt nur das Secondary-Flag
        sim.channel_handle("channel-2").unwrap().confirm_join();
        wait_for(&controller, "secondary join", |s| s.secondary.joined).await;
        assert!(!controller.snapshot().primary.joined);

        sim.engine_handle().unwrap().confirm_join();
        wait_for(&controller, "primary join", |s| s.primary.joined).await;
    }

    #[tokio::test]
    async fn roster_applies_membership_events_idempotently() {
        let sim = Arc::new(SimulatedRtc::new());
        let controller = controller_with(&sim);
        controller.initialize().await.unwrap();
        controller.join().await.unwrap();

        let engine = sim.engine_handle().unwrap();

        engine.emit_user_joined(42);
        engine.emit_user_joined(42);
        wait_for(&controller, "user 42", |s| !s.primary.roster.is_empty()).await;
        assert_eq!(controller.snapshot().primary.roster.uids(), &[42]);

        engine.emit_user_offline(42, 0);
        wait_for(&controller, "user 42 offline", |s| {
            s.primary.roster.is_empty()
        })
        .await;

        // Offline für einen unbekannten Teilnehmer bleibt ein No-Op
        engine.emit_user_offline(99, 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(controller.snapshot().primary.roster.is_empty());
    }

    #[tokio::test]
    async fn channels_keep_separate_rosters() {
        let sim = Arc::new(SimulatedRtc::new());
        let controller = controller_with(&sim);
        controller.initialize().await.unwrap();
        controller.join().await.unwrap();

        sim.engine_handle().unwrap().emit_user_joined(1);
        sim.channel_handle("channel-2").unwrap().emit_user_joined(2);

        wait_for(&controller, "both rosters", |s| {
            !s.primary.roster.is_empty() && !s.secondary.roster.is_empty()
        })
        .await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.primary.roster.uids(), &[1]);
        assert_eq!(snapshot.secondary.roster.uids(), &[2]);
    }

    #[tokio::test]
    async fn leave_resets_rosters_and_flags_unconditionally() {
        let sim = Arc::new(SimulatedRtc::new());
        let controller = controller_with(&sim);
        controller.initialize().await.unwrap();
        controller.join().await.unwrap();

        sim.engine_handle().unwrap().emit_user_joined(1);
        sim.channel_handle("channel-2").unwrap().emit_user_joined(2);
        wait_for(&controller, "rosters populated", |s| {
            !s.primary.roster.is_empty() && !s.secondary.roster.is_empty()
        })
        .await;

        controller.leave().await.unwrap();

        let snapshot = controller.snapshot();
        assert!(snapshot.primary.roster.is_empty());
        assert!(snapshot.secondary.roster.is_empty());
        assert!(!snapshot.primary.joined);
        assert!(!snapshot.secondary.joined);
        assert_eq!(snapshot.primary.local_uid, None);
    }

    #[tokio::test]
    async fn join_then_immediate_leave_before_any_confirmation() {
        let sim = Arc::new(SimulatedRtc::manual());
        let controller = controller_with(&sim);
        controller.initialize().await.unwrap();

        controller.join().await.unwrap();
        controller.leave().await.unwrap();

        let snapshot = controller.snapshot();
        assert!(snapshot.primary.roster.is_empty());
        assert!(snapshot.secondary.roster.is_empty());
        assert!(!snapshot.primary.joined);
        assert!(!snapshot.secondary.joined);
    }

    #[tokio::test]
    async fn teardown_twice_is_benign() {
        let sim = Arc::new(SimulatedRtc::new());
        let controller = controller_with(&sim);
        controller.initialize().await.unwrap();

        controller.teardown().await.unwrap();
        controller.teardown().await.unwrap();

        assert_eq!(controller.phase(), SessionPhase::Released);
        assert!(sim.engine_handle().unwrap().is_released());
        assert!(sim.channel_handle("channel-2").unwrap().is_released());
    }

    #[tokio::test]
    async fn operations_after_teardown_are_typed_errors() {
        let sim = Arc::new(SimulatedRtc::new());
        let controller = controller_with(&sim);
        controller.initialize().await.unwrap();
        controller.teardown().await.unwrap();

        assert!(matches!(
            controller.join().await,
            Err(SessionError::Released)
        ));
        assert!(matches!(
            controller.initialize().await,
            Err(SessionError::Released)
        ));
    }

    #[tokio::test]
    async fn engine_errors_are_forwarded_and_do_not_mutate_state() {
        let sim = Arc::new(SimulatedRtc::new());
        let controller = controller_with(&sim);
        controller.initialize().await.unwrap();
        controller.join().await.unwrap();

        wait_for(&controller, "join confirmed", |s| {
            s.primary.joined && s.secondary.joined
        })
        .await;
        let before = controller.snapshot();

        let mut events = controller.subscribe();
        sim.engine_handle().unwrap().emit_error(17, "simulated failure");

        loop {
            match events.recv().await.unwrap() {
                SessionEvent::EngineError {
                    channel,
                    code,
                    message,
                } => {
                    assert_eq!(channel, ChannelRole::Primary);
                    assert_eq!(code, 17);
                    assert_eq!(message, "simulated failure");
                    break;
                }
                SessionEvent::StateChanged(_) => continue,
            }
        }

        assert_eq!(controller.snapshot(), before);
    }
}
