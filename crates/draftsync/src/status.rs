use serde::{Deserialize, Serialize};

/// Save lifecycle as seen by the consumer render surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

/// Snapshot published on every status change. Hosts subscribe via
/// [`crate::AutoSaveEngine::subscribe`] and render an indicator from it
/// ("Saving…", "Saved", or the error text).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: SaveStatus,
    /// Message from the most recent failed save; cleared when the next
    /// save dispatches.
    pub last_error: Option<String>,
}
