//! Duocall Demo-Runner
//!
//! Startet die Session gegen die simulierte Engine und stellt die
//! Start/End-Call-Steuerung als stdin-Kommandos bereit. Ein kleiner
//! Peer-Treiber spielt nach dem Start Remote-Teilnehmer ein, damit die
//! Surface-Projektion etwas zu zeigen hat.

use anyhow::Result;
use duocall::{
    surfaces, GrantedByPlatform, RtcService, SessionConfig, SessionController, SessionEvent,
    SimulatedRtc, Uid,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = SessionConfig::from_env();
    tracing::info!(
        "Starting duocall (channels: {}, {})",
        config.primary_channel,
        config.secondary_channel
    );

    let secondary_channel = config.secondary_channel.clone();
    let sim = Arc::new(SimulatedRtc::new());
    let controller = Arc::new(SessionController::new(
        config,
        Arc::clone(&sim) as Arc<dyn RtcService>,
        Arc::new(GrantedByPlatform),
    ));

    controller.initialize().await?;

    // View-Printer: rendert die Surface-Liste bei jeder Zustandsänderung
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::StateChanged(snapshot) => {
                    match serde_json::to_string(&surfaces(&snapshot)) {
                        Ok(json) => println!("surfaces: {}", json),
                        Err(e) => tracing::error!("Failed to serialize surfaces: {}", e),
                    }
                }
                SessionEvent::EngineError {
                    channel,
                    code,
                    message,
                } => {
                    println!("engine error on {} channel: {} ({})", channel, message, code);
                }
            }
        }
    });

    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "start" => {
                controller.join().await?;
                spawn_demo_peers(Arc::clone(&sim), secondary_channel.clone());
            }
            "end" => controller.leave().await?,
            "state" => println!("{}", serde_json::to_string_pretty(&controller.snapshot())?),
            "quit" => break,
            "" => {}
            other => {
                println!("unknown command: {}", other);
                print_help();
            }
        }
    }

    controller.teardown().await?;
    Ok(())
}

/// Logging wie gehabt: Default-Filter aus der Umgebung plus Debug für
/// die eigene Crate
fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("duocall=debug".parse()?),
        )
        .init();
    Ok(())
}

fn print_help() {
    println!("commands: start | end | state | quit");
}

fn rand_uid() -> Uid {
    rand::thread_rng().gen_range(1000..10000)
}

/// Simuliert Remote-Teilnehmer: zwei treten dem Primary-Channel bei,
/// einer dem Secondary-Channel (mit doppelter Zustellung), und der
/// Secondary-Gast geht nach kurzer Zeit wieder offline
fn spawn_demo_peers(sim: Arc<SimulatedRtc>, secondary_channel: String) {
    tokio::spawn(async move {
        let (Some(engine), Some(channel)) =
            (sim.engine_handle(), sim.channel_handle(&secondary_channel))
        else {
            return;
        };

        for _ in 0..2 {
            tokio::time::sleep(Duration::from_millis(400)).await;
            engine.emit_user_joined(rand_uid());
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        let guest = rand_uid();
        channel.emit_user_joined(guest);
        // Doppelte Zustellung bleibt folgenlos
        channel.emit_user_joined(guest);

        tokio::time::sleep(Duration::from_secs(2)).await;
        channel.emit_user_offline(guest, 0);
    });
}
