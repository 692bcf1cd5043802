//! Board geometry
//!
//! Derives the triangular peg field, the multiplier box row, the spawn area
//! and the landing band from the row count and container size. A layout is
//! immutable; any resize or row change builds a new one.

use glam::DVec2;
use serde::Serialize;

use crate::settings::LayoutSettings;

/// Box rows never shrink below this height (px)
const MIN_BOX_HEIGHT: f64 = 40.0;
/// Margin kept between the box row and the bottom edge (px)
const BOX_BOTTOM_MARGIN: f64 = 12.0;

/// A placed multiplier box (top-left corner)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotBox {
    /// Slot index into the multiplier table
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

/// Horizontal limits the ball may travel within
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayBounds {
    pub left: f64,
    pub right: f64,
}

/// Where and how widely balls spawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpawnArea {
    pub center_x: f64,
    /// Full width of the random spawn jitter
    pub range_x: f64,
    pub y: f64,
    /// Spawn clamp, also the wall bounds for the drop
    pub bounds: PlayBounds,
}

/// Complete board layout for one (rows, box count, container size) triple
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardLayout {
    pub rows: u32,
    pub box_count: usize,
    pub game_width: f64,
    pub game_height: f64,
    pub grid_start_y: f64,
    pub last_row_y: f64,
    pub peg_spacing: DVec2,
    pub peg_radius: f64,
    pub ball_radius: f64,
    pub peg_offset_x: f64,
    pub base_width: f64,
    pub base_left: f64,
    pub base_right: f64,
    pub apex_x: f64,
    /// Peg centers, row by row, left to right
    pub pegs: Vec<DVec2>,
    /// Placed boxes; boxes that would overflow the base are skipped
    pub boxes: Vec<SlotBox>,
    pub box_width: f64,
    pub box_height: f64,
    pub spawn: SpawnArea,
    pub score_zone_top: f64,
    pub score_zone_bottom: f64,
}

/// Peg X offset for a row count (keeps the skewed grid visually centered)
pub fn peg_offset_x_for_rows(rows: u32, layout: &LayoutSettings) -> f64 {
    let base = if layout.peg_offset_x_base.is_finite() {
        layout.peg_offset_x_base
    } else {
        0.0
    };
    base + layout.peg_offset_x.at(rows as f64).unwrap_or(0.0)
}

/// Peg center for `(row, col)`; row `r` spans `r + 2` pegs
pub fn peg_position(
    row: u32,
    col: u32,
    grid_width: f64,
    start_y: f64,
    spacing: DVec2,
    offset_x: f64,
) -> DVec2 {
    let row_width = row as f64 * spacing.x;
    let start_x = (grid_width - row_width) / 2.0;
    DVec2::new(
        start_x + col as f64 * spacing.x + offset_x,
        start_y + row as f64 * spacing.y,
    )
}

impl BoardLayout {
    pub fn compute(
        rows: u32,
        box_count: usize,
        container_width: f64,
        container_height: f64,
        layout: &LayoutSettings,
    ) -> Self {
        let container_width = if container_width.is_finite() {
            container_width.max(1.0)
        } else {
            1.0
        };
        let container_height = if container_height.is_finite() {
            container_height.max(1.0)
        } else {
            1.0
        };

        let side_panel =
            (container_width * layout.side_panel_fraction).min(layout.side_panel_max_width);
        let game_width = (container_width
            - side_panel
            - layout.side_panel_gap
            - layout.left_padding
            - layout.right_padding)
            .max(1.0);
        let game_height = container_height;
        let grid_width = game_width;

        let grid_start_y = game_height * layout.grid_start_y_scale + layout.grid_start_y_offset;
        let usable_height =
            game_height - grid_start_y - game_height * layout.bottom_reserve_scale;

        let slots_across = rows as f64 + 1.0;
        let peg_spacing = DVec2::new(
            game_width * layout.grid_width_fill / slots_across,
            usable_height * layout.grid_height_fill / slots_across,
        );
        let peg_radius = peg_spacing.x.min(peg_spacing.y) * layout.peg_radius_scale;
        let ball_radius = peg_radius * layout.ball_radius_scale;

        let last_row_y = grid_start_y + rows as f64 * peg_spacing.y;
        let base_width = rows as f64 * peg_spacing.x * layout.base_width_scale;
        let base_left = (grid_width - base_width) / 2.0;
        let base_right = base_left + base_width;
        let apex_x = grid_width / 2.0;
        let peg_offset_x = peg_offset_x_for_rows(rows, layout);

        let pegs = (layout.peg_start_row..=rows)
            .flat_map(|row| (0..row + 2).map(move |col| (row, col)))
            .map(|(row, col)| {
                peg_position(row, col, grid_width, grid_start_y, peg_spacing, peg_offset_x)
            })
            .collect();

        let mut board = Self {
            rows,
            box_count,
            game_width,
            game_height,
            grid_start_y,
            last_row_y,
            peg_spacing,
            peg_radius,
            ball_radius,
            peg_offset_x,
            base_width,
            base_left,
            base_right,
            apex_x,
            pegs,
            boxes: Vec::new(),
            box_width: 0.0,
            box_height: layout.box_height.max(MIN_BOX_HEIGHT),
            spawn: SpawnArea {
                center_x: apex_x,
                range_x: 0.0,
                y: 0.0,
                bounds: PlayBounds {
                    left: 0.0,
                    right: grid_width,
                },
            },
            score_zone_top: 0.0,
            score_zone_bottom: 0.0,
        };
        board.layout_boxes(layout);
        board.layout_spawn(layout);
        board.layout_score_zone(layout);
        board
    }

    fn layout_boxes(&mut self, layout: &LayoutSettings) {
        let n = self.box_count;
        if n == 0 {
            return;
        }
        let gap = layout.box_gap;
        let row_scale = layout
            .box_row_width_scale
            .at(self.rows as f64)
            .unwrap_or(layout.box_row_width_scale_fallback);
        let max_row_width = (self.base_width * row_scale).min(self.game_width);
        let fit_width = (max_row_width - n as f64 * gap) / n as f64;
        let min_width = if n > 1 {
            layout.box_min_span / (n - 1) as f64 * 2.0
        } else {
            0.0
        };
        let width = min_width.max((self.peg_spacing.x * layout.box_width_scale).min(fit_width));
        let height = self.box_height;
        self.box_width = width;

        let total_width = n as f64 * width + (n - 1) as f64 * gap;
        let start_x = self.base_left + (self.base_width - total_width) / 2.0 + layout.box_offset_x;
        let y = (self.game_height - height - BOX_BOTTOM_MARGIN)
            .min(self.last_row_y + self.peg_spacing.y * 0.65)
            + layout.box_offset_y;

        self.boxes = (0..n)
            .map(|index| SlotBox {
                index,
                x: start_x + index as f64 * (width + gap),
                y,
            })
            .filter(|b| b.x >= self.base_left - 1.0 && b.x + width <= self.base_right + 1.0)
            .collect();
        if self.boxes.len() < n {
            log::warn!(
                "Box row overflows the board: placed {}/{} boxes",
                self.boxes.len(),
                n
            );
        }
    }

    fn layout_spawn(&mut self, layout: &LayoutSettings) {
        let half_box = self.box_width / 2.0;
        let anchored = match (self.boxes.first(), self.boxes.last()) {
            (Some(first), Some(last)) if self.box_width > 0.0 && last.x > first.x => {
                Some((first.x + half_box, last.x + half_box))
            }
            _ => None,
        };
        let (left, right, center) = match anchored {
            Some((left, right)) => (left, right, (left + right) / 2.0),
            None => (
                self.ball_radius,
                self.game_width - self.ball_radius,
                self.apex_x,
            ),
        };

        let compensation = if anchored.is_none() && layout.spawn_compensate_peg_offset {
            -self.peg_offset_x
        } else {
            0.0
        };
        let range_x = match layout.spawn_range_x.at(self.rows as f64) {
            Some(range) => range.max(0.0),
            None => {
                let base_jitter = (self.peg_spacing.x * 0.35).min(self.box_width * 0.3);
                base_jitter.clamp(4.0, 24.0) * 2.0
            }
        };
        let pad = layout.spawn_clamp_padding.max(0.0);
        let start_peg_y =
            self.grid_start_y + layout.peg_start_row as f64 * self.peg_spacing.y;

        self.spawn = SpawnArea {
            center_x: center + layout.spawn_offset_x + compensation,
            range_x,
            y: start_peg_y - self.peg_spacing.y * 0.9 + layout.spawn_offset_y,
            bounds: PlayBounds {
                left: left - half_box - pad,
                right: right + half_box + pad,
            },
        };
    }

    fn layout_score_zone(&mut self, layout: &LayoutSettings) {
        let h = self.box_height;
        let box_top = self
            .boxes
            .first()
            .map(|b| b.y)
            .unwrap_or(self.last_row_y + self.peg_spacing.y);
        let entry_inset = (h * 0.45).min((self.ball_radius * 0.6).max(h * layout.entry_inset_scale));
        let entry_bottom = (entry_inset + self.ball_radius).max(h * layout.entry_bottom_scale);
        self.score_zone_top = box_top + entry_inset;
        self.score_zone_bottom = box_top + entry_bottom;
    }

    /// Horizontal center the center-bias force pulls toward
    pub fn center_x(&self) -> f64 {
        self.apex_x + self.peg_offset_x
    }

    /// Balls below this Y never landed
    pub fn out_of_bounds_y(&self) -> f64 {
        self.game_height + self.ball_radius * 3.0
    }

    /// Left/right edge of the triangle at height `y`
    pub fn triangle_bounds_at_y(&self, y: f64) -> (f64, f64) {
        let (y0, y1) = (self.grid_start_y, self.last_row_y);
        let t = if y1 == y0 {
            1.0
        } else {
            crate::clamp01((y - y0) / (y1 - y0))
        };
        let half = self.base_width * t / 2.0;
        (self.center_x() - half, self.center_x() + half)
    }

    /// Center X of slot `index`, if that box was placed
    pub fn slot_center_x(&self, index: usize) -> Option<f64> {
        self.boxes
            .iter()
            .find(|b| b.index == index)
            .map(|b| b.x + self.box_width / 2.0)
    }

    /// Slot whose box center is closest to `x`
    pub fn closest_slot_by_x(&self, x: f64) -> Option<usize> {
        let half = self.box_width / 2.0;
        self.boxes
            .iter()
            .map(|b| (b.index, (b.x + half - x).abs()))
            .fold(None, |best: Option<(usize, f64)>, (index, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((index, d)),
            })
            .map(|(index, _)| index)
    }

    /// Landing band check
    pub fn in_score_zone(&self, y: f64) -> bool {
        y >= self.score_zone_top && y <= self.score_zone_bottom
    }
}
