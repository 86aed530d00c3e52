//! Teilnehmer-Roster
//!
//! Geordnete Menge der Remote-Teilnehmer eines Channels. Einfüge-
//! Reihenfolge bleibt erhalten, Duplikate sind ausgeschlossen. Mutiert
//! wird das Roster ausschließlich von den Membership-Event-Handlern.

use serde::Serialize;

use crate::rtc::Uid;

// ============================================================================
// ROSTER
// ============================================================================

/// Remote-Teilnehmer eines Channels, in Beitritts-Reihenfolge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Roster {
    uids: Vec<Uid>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fügt einen Teilnehmer hinzu. Gibt false zurück, wenn er bereits
    /// enthalten war (idempotent unter doppelter Zustellung).
    pub fn insert(&mut self, uid: Uid) -> bool {
        if self.uids.contains(&uid) {
            return false;
        }
        self.uids.push(uid);
        true
    }

    /// Entfernt einen Teilnehmer. Gibt false zurück, wenn er nicht
    /// enthalten war.
    pub fn remove(&mut self, uid: Uid) -> bool {
        let before = self.uids.len();
        self.uids.retain(|id| *id != uid);
        self.uids.len() != before
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.uids.contains(&uid)
    }

    pub fn clear(&mut self) {
        self.uids.clear();
    }

    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// Teilnehmer in Beitritts-Reihenfolge
    pub fn uids(&self) -> &[Uid] {
        &self.uids
    }
}

// ============================================================================
// TESTS
// ============================================================================
