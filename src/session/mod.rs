//! Session Module - Lebenszyklus und Roster-Buchführung
//!
//! Dieses Modul verwaltet:
//! - Den Lebenszyklus initialize → join → leave → teardown
//! - Ein Roster pro Channel, mutiert nur durch Membership-Events
//! - Die Session-Events für die UI-Projektion
//!

mod controller;
mod roster;

pub use controller::{
    ChannelRole, ChannelSnapshot, SessionController, SessionError, SessionEvent, SessionPhase,
    SessionSnapshot,
};
pub use roster::Roster;
