//! Plinko Drop - deterministic Plinko board engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (board geometry, ball physics, seeded RNG)
//! - `probability`: Slot probabilities and win-rate shaping
//! - `outcome`: Target slot selection
//! - `seed_search`: Test mode seed pools (deterministic replay)
//! - `game` / `round`: Per-board session and the async round orchestrator
//! - `platform`: Frame scheduling abstraction (native / browser)
//! - `settings`: Data-driven configuration

pub mod game;
pub mod history;
pub mod multipliers;
pub mod outcome;
pub mod platform;
pub mod probability;
pub mod round;
pub mod seed_search;
pub mod settings;
pub mod sim;

pub use game::{GameSnapshot, PlinkoSession, RoundOutcome};
pub use history::RoundHistory;
pub use multipliers::MultiplierSlot;
pub use platform::FrameClock;
#[cfg(not(target_arch = "wasm32"))]
pub use platform::SteppedClock;
pub use round::PlinkoGame;
pub use settings::{Difficulty, GameSettings, SettingsError, TestModeSettings};

/// Engine configuration constants
pub mod consts {
    /// Smallest row count with a multiplier table
    pub const TABLE_MIN_ROWS: u32 = 8;
    /// Largest row count with a multiplier table
    pub const TABLE_MAX_ROWS: u32 = 16;
    /// Row count the physics table is tuned for
    pub const PHYSICS_BASE_ROWS: f64 = 16.0;
    /// Upper bound for force-like physics scaling
    pub const MAX_FORCE_SCALE: f64 = 2.0;

    /// Bias search interval is [-WINRATE_BIAS_RANGE, WINRATE_BIAS_RANGE]
    pub const WINRATE_BIAS_RANGE: f64 = 8.0;
    /// Bisection iterations for the win-rate bias search
    pub const WINRATE_SEARCH_ITERATIONS: u32 = 30;

    /// Frame delta cap (seconds) so a stalled tab doesn't teleport the ball
    pub const MAX_FRAME_DELTA: f64 = 0.1;
    /// Variable-step cap (seconds) when no fixed delta is configured
    pub const MAX_VARIABLE_STEP: f64 = 1.0 / 30.0;
    /// Maximum fixed substeps per frame
    pub const MAX_SUBSTEPS: u32 = 120;

    /// Test mode attempts per desired seed
    pub const ATTEMPTS_PER_VARIATION: u64 = 25_000;
    /// Lower bound on the per-candidate step budget during seed search
    pub const SEARCH_MIN_STEPS: u32 = 700;
    /// Per-row step budget during seed search
    pub const SEARCH_STEPS_PER_ROW: u32 = 110;
    /// Minimum wall-clock slice (ms) before the search yields
    pub const SEARCH_MIN_YIELD_MS: f64 = 8.0;
}

/// Clamp to [0, 1]
#[inline]
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
