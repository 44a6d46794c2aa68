use std::time::Duration;

/// Timing knobs for the auto-save engine.
#[derive(Debug, Clone, Copy)]
pub struct AutoSaveConfig {
    /// Quiet period after the last edit before a save dispatches.
    pub debounce: Duration,
    /// How long the `saved` status stays visible before reverting to
    /// `idle`.
    pub saved_display: Duration,
}

impl AutoSaveConfig {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);
    pub const DEFAULT_SAVED_DISPLAY: Duration = Duration::from_millis(2000);

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_saved_display(mut self, saved_display: Duration) -> Self {
        self.saved_display = saved_display;
        self
    }
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce: Self::DEFAULT_DEBOUNCE,
            saved_display: Self::DEFAULT_SAVED_DISPLAY,
        }
    }
}
