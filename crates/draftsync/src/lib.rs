//! draftsync — auto-save synchronization for form-backed editing surfaces.
//!
//! Watches a piece of user-editable state and persists it through a
//! caller-supplied save operation after the user stops changing it. The
//! engine owns the debounce timer, content-based change detection, the
//! baseline-capture rules that keep freshly loaded data from being
//! re-saved, and a single-flight dispatcher that coalesces edits arriving
//! while a save is in flight.
//!
//! The host layer (route handler, UI loop, whatever drives edits) calls
//! [`AutoSaveEngine::observe`] on every relevant change and renders the
//! status it gets back from [`AutoSaveEngine::subscribe`]. Persistence
//! itself stays behind the [`SaveTarget`] seam; the engine performs no
//! I/O of its own.

mod config;
mod engine;
mod errors;
mod fingerprint;
mod notify;
mod status;

pub use config::AutoSaveConfig;
pub use engine::{AutoSaveEngine, SaveFn, SaveTarget};
pub use errors::SaveError;
pub use notify::{SaveListener, TracingListener};
pub use status::{SaveStatus, StatusSnapshot};
