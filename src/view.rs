//! Video-Surface-Projektion
//!
//! Reine Projektion des Session-Zustands auf die Liste der zu rendernden
//! Video-Surfaces. Das eigentliche Rendern übernimmt die Engine; hier
//! entsteht nur die Beschreibung, was wo gezeigt wird.

use serde::Serialize;

use crate::rtc::Uid;
use crate::session::SessionSnapshot;

// ============================================================================
// VIDEO SURFACES
// ============================================================================

/// Eine zu rendernde Video-Surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VideoSurface {
    /// Lokale Kamera-Vorschau (nur auf dem Primary-Channel)
    Local { channel: String },

    /// Remote-Teilnehmer, eine Surface pro Roster-Eintrag
    Remote { channel: String, uid: Uid },
}

/// Leitet die Surface-Liste aus dem Session-Zustand ab.
///
/// Jeder Channel wird erst gezeigt, wenn sein eigener Beitritt bestätigt
/// ist; der Primary-Channel beginnt mit der lokalen Vorschau, danach folgt
/// pro Roster-Eintrag eine Remote-Surface in Beitritts-Reihenfolge.
pub fn surfaces(snapshot: &SessionSnapshot) -> Vec<VideoSurface> {
    let mut surfaces = Vec::new();

    if snapshot.primary.joined {
        surfaces.push(VideoSurface::Local {
            channel: snapshot.primary.name.clone(),
        });
        for &uid in snapshot.primary.roster.uids() {
            surfaces.push(VideoSurface::Remote {
                channel: snapshot.primary.name.clone(),
                uid,
            });
        }
    }

    if snapshot.secondary.joined {
        for &uid in snapshot.secondary.roster.uids() {
            surfaces.push(VideoSurface::Remote {
                channel: snapshot.secondary.name.clone(),
                uid,
            });
        }
    }

    surfaces
}

// ============================================================================
// TESTS
// ============================================================================
