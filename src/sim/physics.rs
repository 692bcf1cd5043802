//! Ball physics tuning and per-substep integration
//!
//! The tuning table is authored for `PHYSICS_BASE_ROWS` rows and rescaled for
//! other boards: smaller boards get proportionally faster, stronger physics so
//! a drop takes a similar number of frames.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::collision::{resolve_peg_collision, resolve_wall_collision};
use super::geometry::{BoardLayout, PlayBounds};
use super::state::BallState;
use crate::clamp01;
use crate::consts::{MAX_FORCE_SCALE, PHYSICS_BASE_ROWS};

/// Physics dials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    /// Downward acceleration (px/s²)
    pub gravity: f64,
    /// Per-60Hz-frame velocity retention
    pub drag: f64,
    pub max_speed: f64,
    pub spawn_speed: f64,
    /// Spawn direction jitter around straight down (radians)
    pub spawn_angle_jitter: f64,
    pub min_speed: f64,
    /// Non-zero forces the ball to this exact speed every substep
    pub constant_speed: f64,
    /// Row count this table is tuned for (never scaled)
    pub base_rows: f64,

    // === Bounce response ===
    pub restitution: f64,
    pub wall_restitution: f64,
    pub tangential_damp: f64,
    /// Extra push-out past the contact surface (px)
    pub collision_slop: f64,
    /// Random horizontal nudge per peg hit (px/s, full width)
    pub impulse_jitter: f64,

    // === Steering ===
    /// Pull toward the selected slot; ~0.0002-0.003 subtle, >0.02 obvious
    pub aim_strength: f64,
    /// Push away from / toward the board center after a bounce, 0..1
    pub center_bias_strength: f64,
    pub center_bias_jitter: f64,
    /// Random rotation of the bounce velocity (radians)
    pub bounce_angle_jitter: f64,
    /// Chance a bounce may keep its horizontal direction
    pub keep_direction_chance: f64,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            gravity: 10_000.0,
            drag: 0.993,
            max_speed: 300.0,
            spawn_speed: 300.0,
            spawn_angle_jitter: 0.0,
            min_speed: 300.0,
            constant_speed: 300.0,
            base_rows: PHYSICS_BASE_ROWS,

            restitution: 0.18,
            wall_restitution: 0.14,
            tangential_damp: 0.85,
            collision_slop: 0.01,
            impulse_jitter: 8.0,

            aim_strength: 0.20105,
            center_bias_strength: 1.0,
            center_bias_jitter: 0.15,
            bounce_angle_jitter: 0.02,
            keep_direction_chance: 0.15,
        }
    }
}

impl PhysicsParams {
    /// Linear scale factor for a board with `rows` rows
    pub fn speed_scale_for_rows(&self, rows: u32) -> f64 {
        let base = if self.base_rows.is_finite() {
            self.base_rows.max(1.0)
        } else {
            PHYSICS_BASE_ROWS
        };
        base / (rows.max(1) as f64)
    }

    /// Rescale this (base) table for a board with `rows` rows.
    ///
    /// Steering/jitter dials use the scale capped to [0, 2]; ratio dials are
    /// clamped to [0, 1] after scaling.
    pub fn for_rows(&self, rows: u32) -> Self {
        let scale = self.speed_scale_for_rows(rows);
        let force = scale.clamp(0.0, MAX_FORCE_SCALE);
        Self {
            gravity: self.gravity * scale,
            drag: clamp01(self.drag * scale),
            max_speed: self.max_speed * scale,
            spawn_speed: self.spawn_speed * scale,
            spawn_angle_jitter: self.spawn_angle_jitter * scale,
            min_speed: self.min_speed * scale,
            constant_speed: self.constant_speed * scale,
            base_rows: self.base_rows,

            restitution: clamp01(self.restitution * scale),
            wall_restitution: clamp01(self.wall_restitution * scale),
            tangential_damp: clamp01(self.tangential_damp * scale),
            collision_slop: self.collision_slop * scale,
            impulse_jitter: self.impulse_jitter * scale,

            aim_strength: self.aim_strength * force,
            center_bias_strength: self.center_bias_strength * force,
            center_bias_jitter: self.center_bias_jitter * force,
            bounce_angle_jitter: self.bounce_angle_jitter * force,
            keep_direction_chance: clamp01(self.keep_direction_chance * force),
        }
    }

    /// Launch speed for a fresh ball
    pub fn launch_speed(&self) -> f64 {
        if self.constant_speed > 0.0 {
            self.constant_speed
        } else {
            self.spawn_speed.max(0.0)
        }
    }
}

/// Final speed pass: exact constant speed, or clamp into [min, max]
pub fn normalize_speed(ball: &mut BallState, phys: &PhysicsParams) {
    let max_speed = phys.max_speed;
    if phys.constant_speed > 0.0 {
        let target = if max_speed > 0.0 {
            phys.constant_speed.min(max_speed)
        } else {
            phys.constant_speed
        };
        if target > 0.0 {
            ball.set_speed(target);
        }
        return;
    }

    ball.clamp_speed(max_speed);
    let floor = match (phys.min_speed > 0.0, max_speed > 0.0) {
        (true, true) => phys.min_speed.min(max_speed),
        (true, false) => phys.min_speed,
        _ => 0.0,
    };
    if floor > 0.0 && ball.speed() < floor {
        ball.set_speed(floor);
    }
}

/// Advance the ball one substep. Returns true if any peg was hit.
pub fn step_ball_physics<R: RngCore + ?Sized>(
    ball: &mut BallState,
    board: &BoardLayout,
    phys: &PhysicsParams,
    target_x: Option<f64>,
    dt: f64,
    bounds: PlayBounds,
    rng: &mut R,
) -> bool {
    ball.vel.y += phys.gravity * dt;
    ball.vel *= phys.drag.powf(dt * 60.0);

    if let Some(target_x) = target_x {
        ball.vel.x += (target_x - ball.pos.x) * phys.aim_strength * dt * 60.0;
    }
    ball.clamp_speed(phys.max_speed);

    ball.pos += ball.vel * dt;

    resolve_wall_collision(ball, bounds, board.ball_radius, phys.wall_restitution);

    // Every peg, in list order; no re-check after a resolution
    let mut hit = false;
    for &peg in &board.pegs {
        if resolve_peg_collision(ball, peg, board, phys, rng) {
            hit = true;
        }
    }

    normalize_speed(ball, phys);
    hit
}
