//! In-memory output backend.
//!
//! Records the last level of every channel plus the full sequence of writes.
//! Selected with `gpio_backend = "dry-run"` to exercise a schedule on a
//! machine without a relay board.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Level, OutputPort};

#[derive(Default)]
pub struct DryRunOutput {
    levels: Mutex<HashMap<u8, Level>>,
    history: Mutex<Vec<(u8, Level)>>,
}

impl DryRunOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, channel: u8) -> Option<Level> {
        self.levels.lock().ok()?.get(&channel).copied()
    }

    /// Every write since creation, oldest first.
    pub fn history(&self) -> Vec<(u8, Level)> {
        self.history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Number of times `channel` was driven active.
    pub fn activations(&self, channel: u8) -> usize {
        self.history()
            .iter()
            .filter(|&&(c, level)| c == channel && level == Level::Active)
            .count()
    }
}

impl OutputPort for DryRunOutput {
    fn configure_output(&self, channel: u8) -> Result<()> {
        if let Ok(mut levels) = self.levels.lock() {
            levels.entry(channel).or_insert(Level::Inactive);
        }
        Ok(())
    }

    fn set_output(&self, channel: u8, level: Level) -> Result<()> {
        if let Ok(mut levels) = self.levels.lock() {
            levels.insert(channel, level);
        }
        if let Ok(mut history) = self.history.lock() {
            history.push((channel, level));
        }
        log_debug!("channel {channel} -> {level}");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "dry-run"
    }
}
