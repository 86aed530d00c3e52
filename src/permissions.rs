//! Media Permissions
//!
//! Plattform-Capability "Kamera- und Mikrofonzugriff sicherstellen".
//! Wird einmal beim Initialisieren angefragt; eine Ablehnung wird nur
//! geloggt, der Start läuft trotzdem weiter (der Fehler zeigt sich dann
//! später in der Media-Schicht der Engine).

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone)]
pub enum PermissionError {
    #[error("Permission denied: {0}")]
    Denied(String),
}

// ============================================================================
// PERMISSION TRAIT
// ============================================================================

/// Capability für Laufzeit-Berechtigungen der Media-Geräte
#[async_trait]
pub trait MediaPermissions: Send + Sync {
    /// Stellt sicher, dass Kamera- und Mikrofonzugriff gewährt sind
    async fn ensure_camera_and_mic(&self) -> Result<(), PermissionError>;
}

/// Desktop-Plattformen ohne explizite Laufzeit-Grants
pub struct GrantedByPlatform;

#[async_trait]
impl MediaPermissions for GrantedByPlatform {
    async fn ensure_camera_and_mic(&self) -> Result<(), PermissionError> {
        Ok(())
    }
}
