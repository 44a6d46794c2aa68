use tracing::{info, warn};

/// Transient user-facing feedback hook, fired at most once per settled
/// save. Hosts typically surface these as toast-style notifications next
/// to the persistent status indicator.
pub trait SaveListener: Send + Sync {
    fn on_saved(&self) {}
    fn on_save_failed(&self, _message: &str) {}
}

/// Default listener: routes feedback into the log stream.
pub struct TracingListener;

impl SaveListener for TracingListener {
    fn on_saved(&self) {
        info!("changes saved");
    }

    fn on_save_failed(&self, message: &str) {
        warn!("saving changes failed: {message}");
    }
}
