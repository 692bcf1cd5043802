//! Game settings and tuning dials
//!
//! Loaded from JSON (every field optional) or built from `Default`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::PhysicsParams;

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Multiplier table difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Low,
    #[default]
    Medium,
    High,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Low => "low",
            Difficulty::Medium => "medium",
            Difficulty::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Difficulty::Low),
            "medium" | "med" => Some(Difficulty::Medium),
            "high" => Some(Difficulty::High),
            _ => None,
        }
    }

    /// Parse, falling back to the default difficulty for unknown names
    pub fn normalize(s: &str) -> Self {
        Self::from_str(s).unwrap_or_else(|| {
            log::warn!("Unknown difficulty {s:?}, using medium");
            Self::default()
        })
    }
}

/// A dial interpolated linearly across a row-count range
///
/// `min_rows` may be larger than `max_rows` (the dial then shrinks as rows grow).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowInterp {
    pub min_rows: f64,
    pub max_rows: f64,
    pub at_min: f64,
    pub at_max: f64,
}

impl RowInterp {
    pub const fn new(min_rows: f64, max_rows: f64, at_min: f64, at_max: f64) -> Self {
        Self {
            min_rows,
            max_rows,
            at_min,
            at_max,
        }
    }

    /// Value at `rows`, clamped to the endpoints.
    ///
    /// `None` when the range is degenerate (equal bounds or non-finite dials).
    pub fn at(&self, rows: f64) -> Option<f64> {
        let finite = [self.min_rows, self.max_rows, self.at_min, self.at_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.min_rows == self.max_rows {
            return None;
        }
        let t = crate::clamp01((rows - self.min_rows) / (self.max_rows - self.min_rows));
        Some(crate::lerp(self.at_min, self.at_max, t))
    }
}

/// Board layout dials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    // === Play area ===
    pub left_padding: f64,
    pub right_padding: f64,
    /// Gap between the board and the side (history) panel
    pub side_panel_gap: f64,
    /// Side panel width cap (px)
    pub side_panel_max_width: f64,
    /// Side panel width as a fraction of the container
    pub side_panel_fraction: f64,

    // === Peg grid ===
    pub grid_start_y_scale: f64,
    pub grid_start_y_offset: f64,
    /// Fraction of height reserved below the grid for the box row
    pub bottom_reserve_scale: f64,
    pub grid_width_fill: f64,
    pub grid_height_fill: f64,
    pub peg_radius_scale: f64,
    pub ball_radius_scale: f64,
    pub base_width_scale: f64,
    /// First visible peg row
    pub peg_start_row: u32,
    /// Constant peg X offset added to the interpolated one
    pub peg_offset_x_base: f64,
    pub peg_offset_x: RowInterp,

    // === Box row ===
    pub box_gap: f64,
    pub box_height: f64,
    pub box_width_scale: f64,
    /// Minimum box width is `box_min_span * 2 / (box_count - 1)`
    pub box_min_span: f64,
    pub box_row_width_scale: RowInterp,
    /// Used when `box_row_width_scale` is degenerate
    pub box_row_width_scale_fallback: f64,
    pub box_offset_x: f64,
    pub box_offset_y: f64,
    pub entry_inset_scale: f64,
    pub entry_bottom_scale: f64,

    // === Spawn ===
    pub spawn_offset_x: f64,
    pub spawn_offset_y: f64,
    pub spawn_range_x: RowInterp,
    /// Shift spawn by `-peg_offset_x` when no box row anchors it
    pub spawn_compensate_peg_offset: bool,
    pub spawn_clamp_padding: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            left_padding: 0.0,
            right_padding: 0.0,
            side_panel_gap: 5.0,
            side_panel_max_width: 110.0,
            side_panel_fraction: 0.16,

            grid_start_y_scale: 0.055,
            grid_start_y_offset: 0.0,
            bottom_reserve_scale: 0.14,
            grid_width_fill: 0.9,
            grid_height_fill: 0.92,
            peg_radius_scale: 0.14,
            ball_radius_scale: 1.5,
            base_width_scale: 1.2,
            peg_start_row: 1,
            peg_offset_x_base: 0.0,
            peg_offset_x: RowInterp::new(8.0, 16.0, -38.0, -20.0),

            box_gap: 5.0,
            box_height: 40.0,
            box_width_scale: 1.5,
            box_min_span: 160.0,
            box_row_width_scale: RowInterp::new(8.0, 16.0, 1.0, 0.9),
            box_row_width_scale_fallback: 0.9,
            box_offset_x: 0.0,
            box_offset_y: 0.0,
            entry_inset_scale: 0.22,
            entry_bottom_scale: 0.92,

            spawn_offset_x: 0.0,
            spawn_offset_y: 0.0,
            spawn_range_x: RowInterp::new(16.0, 8.0, 120.0, 60.0),
            spawn_compensate_peg_offset: true,
            spawn_clamp_padding: 0.0,
        }
    }
}

/// Deterministic test mode (forced landings from pre-validated seeds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestModeSettings {
    pub enabled: bool,
    /// Edge offset: 0 = outermost slots, 1 = second from each edge
    pub forced_landing_index: i64,
    /// Fixed physics step (seconds) for seeded drops
    pub fixed_delta: f64,
    pub max_attempts: u64,
    pub max_steps: u32,
    pub seed_base: u32,
    pub variations_per_side: u32,
    /// Start searching as soon as the board is laid out
    pub auto_search: bool,
    pub search_yield_ms: f64,
}

impl Default for TestModeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            forced_landing_index: 1,
            fixed_delta: 1.0 / 60.0,
            max_attempts: 1_000_000,
            max_steps: 2000,
            seed_base: 0x1a2b_3c4d,
            variations_per_side: 4,
            auto_search: true,
            search_yield_ms: 8.0,
        }
    }
}

impl TestModeSettings {
    /// Desired seeds per side (at least one)
    pub fn desired_variations(&self) -> usize {
        self.variations_per_side.max(1) as usize
    }

    /// Fixed delta, defaulting to 60 Hz when unusable
    pub fn effective_fixed_delta(&self) -> f64 {
        if self.fixed_delta.is_finite() && self.fixed_delta > 0.0 {
            self.fixed_delta
        } else {
            1.0 / 60.0
        }
    }
}

/// Session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub rows: u32,
    pub min_rows: u32,
    pub max_rows: u32,
    pub difficulty: Difficulty,
    /// Rounds kept in history (most recent first)
    pub history_size: usize,
    /// Target win rate, 0-1 or 0-100 (auto-normalized)
    pub win_rate: Option<f64>,
    pub win_rate_min_multiplier: f64,
    pub container_width: f64,
    pub container_height: f64,
    /// Session RNG seed (random when absent)
    pub seed: Option<u64>,
    pub layout: LayoutSettings,
    /// Base physics table, tuned at `PHYSICS_BASE_ROWS`
    pub physics: PhysicsParams,
    pub test_mode: TestModeSettings,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            rows: 16,
            min_rows: crate::consts::TABLE_MIN_ROWS,
            max_rows: crate::consts::TABLE_MAX_ROWS,
            difficulty: Difficulty::Medium,
            history_size: 10,
            win_rate: None,
            win_rate_min_multiplier: 1.0,
            container_width: 800.0,
            container_height: 700.0,
            seed: None,
            layout: LayoutSettings::default(),
            physics: PhysicsParams::default(),
            test_mode: TestModeSettings::default(),
        }
    }
}

impl GameSettings {
    /// Parse settings from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Row bounds with `min <= max` enforced
    pub fn row_bounds(&self) -> (u32, u32) {
        let min = self.min_rows.max(1);
        (min, self.max_rows.max(min))
    }

    /// Clamp a requested row count into the configured bounds
    pub fn clamp_rows(&self, rows: i64) -> u32 {
        let (min, max) = self.row_bounds();
        rows.clamp(min as i64, max as i64) as u32
    }

    /// Win-rate threshold, defaulting to 1x when unusable
    pub fn effective_min_multiplier(&self) -> f64 {
        if self.win_rate_min_multiplier.is_finite() {
            self.win_rate_min_multiplier
        } else {
            1.0
        }
    }
}
