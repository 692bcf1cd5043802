//! Round history
//!
//! In-memory only, most recent first, capped at `history_size` entries.

use serde::{Deserialize, Serialize};

use crate::multipliers::MultiplierSlot;

/// Default number of rounds to keep
pub const DEFAULT_HISTORY_SIZE: usize = 10;

/// Landed slots, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundHistory {
    entries: Vec<MultiplierSlot>,
    capacity: usize,
}

impl Default for RoundHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl RoundHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend a landed slot, dropping the oldest entries past capacity
    pub fn record(&mut self, slot: MultiplierSlot) {
        self.entries.insert(0, slot);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> &[MultiplierSlot] {
        &self.entries
    }

    /// Most recent round, if any
    pub fn latest(&self) -> Option<&MultiplierSlot> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
