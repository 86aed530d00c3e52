//! End-to-End-Test des Call-Flows gegen die simulierte Engine:
//! initialize → start call → Remote-Teilnehmer → end call → teardown,
//! beobachtet ausschließlich über die öffentliche API.

use duocall::{
    surfaces, GrantedByPlatform, RtcService, SessionConfig, SessionController, SessionPhase,
    SessionSnapshot, SimulatedRtc, VideoSurface,
};
use std::sync::Arc;
use std::time::Duration;

fn demo_config() -> SessionConfig {
    SessionConfig {
        app_id: "demo-app".to_string(),
        token: None,
        primary_channel: "channel-1".to_string(),
        secondary_channel: "channel-2".to_string(),
    }
}

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
async fn full_call_flow() {
    let sim = Arc::new(SimulatedRtc::new());
    let controller = SessionController::new(
        demo_config(),
        Arc::clone(&sim) as Arc<dyn RtcService>,
        Arc::new(GrantedByPlatform),
    );

    controller.initialize().await.unwrap();
    assert_eq!(controller.phase(), SessionPhase::Initialized);
    assert!(surfaces(&controller.snapshot()).is_empty());

    // Anruf starten; beide Channels bestätigen asynchron
    controller.join().await.unwrap();
    wait_for(&controller, "both joins confirmed", |s| {
        s.primary.joined && s.secondary.joined
    })
    .await;

    // Remote-Teilnehmer treten bei
    sim.engine_handle().unwrap().emit_user_joined(101);
    sim.channel_handle("channel-2").unwrap().emit_user_joined(201);
    wait_for(&controller, "remote peers", |s| {
        s.primary.roster.len() == 1 && s.secondary.roster.len() == 1
    })
    .await;

    // Projektion: lokale Vorschau zuerst, dann die Remotes beider Channels
    let list = surfaces(&controller.snapshot());
    assert_eq!(
        list,
        vec![
            VideoSurface::Local {
                channel: "channel-1".to_string()
            },
            VideoSurface::Remote {
                channel: "channel-1".to_string(),
                uid: 101
            },
            VideoSurface::Remote {
                channel: "channel-2".to_string(),
                uid: 201
            },
        ]
    );

    // Anruf beenden: Roster leer, nichts mehr zu rendern
    controller.leave().await.unwrap();
    let snapshot = controller.snapshot();
    assert!(snapshot.primary.roster.is_empty());
    assert!(snapshot.secondary.roster.is_empty());
    assert!(surfaces(&snapshot).is_empty());

    // Ein zweiter Anruf in derselben Session funktioniert
    controller.join().await.unwrap();
    wait_for(&controller, "second call confirmed", |s| {
        s.primary.joined && s.secondary.joined
    })
    .await;

    controller.teardown().await.unwrap();
    assert_eq!(controller.phase(), SessionPhase::Released);
    assert!(sim.engine_handle().unwrap().is_released());
    assert!(sim.channel_handle("channel-2").unwrap().is_released());
}
