//! Process-wide instrumentation switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared on/off switch consulted by every recorder callback.
///
/// Clones observe the same flag, so flipping it is seen by the next callback.
#[derive(Debug, Clone)]
pub struct InstrumentationToggle(Arc<AtomicBool>);

impl InstrumentationToggle {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }

    pub fn enable(&self) {
        self.set(true);
    }

    pub fn disable(&self) {
        self.set(false);
    }
}

impl Default for InstrumentationToggle {
    fn default() -> Self {
        Self::new(true)
    }
}
