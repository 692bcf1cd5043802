//! Ball state and drop lifecycle

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Lifecycle of a single drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropPhase {
    /// Ball placed above the grid, not yet stepped
    Spawned,
    /// Ball moving through the pegs
    Falling,
    /// Ball entered the landing band over slot `0`
    Landed(usize),
    /// Ball passed the bottom without entering the band (or no box to land in)
    OutOfBounds,
}

impl DropPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, DropPhase::Landed(_) | DropPhase::OutOfBounds)
    }

    /// Landed slot, if any
    pub fn landed_slot(&self) -> Option<usize> {
        match self {
            DropPhase::Landed(slot) => Some(*slot),
            _ => None,
        }
    }
}

/// Position and velocity of the ball (px, px/s)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BallState {
    pub pos: DVec2,
    pub vel: DVec2,
}

impl BallState {
    pub fn new(pos: DVec2, vel: DVec2) -> Self {
        Self { pos, vel }
    }

    pub fn speed(&self) -> f64 {
        self.vel.length()
    }

    /// Scale velocity down to `max_speed` if faster (no-op for non-positive limits)
    pub fn clamp_speed(&mut self, max_speed: f64) {
        if !max_speed.is_finite() || max_speed <= 0.0 {
            return;
        }
        let speed = self.speed();
        if speed > max_speed {
            self.vel *= max_speed / speed;
        }
    }

    /// Force speed to exactly `speed`; a resting ball is sent straight down
    pub fn set_speed(&mut self, speed: f64) {
        let current = self.speed();
        if current < 1e-4 {
            self.vel = DVec2::new(0.0, speed);
        } else {
            self.vel *= speed / current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_speed() {
        let mut ball = BallState::new(DVec2::ZERO, DVec2::new(300.0, 400.0));
        ball.clamp_speed(250.0);
        assert!((ball.speed() - 250.0).abs() < 1e-9);
        // Direction kept
        assert!((ball.vel.x / ball.vel.y - 0.75).abs() < 1e-12);

        ball.clamp_speed(0.0);
        assert!((ball.speed() - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_speed_from_rest_points_down() {
        let mut ball = BallState::default();
        ball.set_speed(300.0);
        assert_eq!(ball.vel, DVec2::new(0.0, 300.0));
    }

    #[test]
    fn test_phase_helpers() {
        assert!(!DropPhase::Falling.is_finished());
        assert!(DropPhase::OutOfBounds.is_finished());
        assert_eq!(DropPhase::Landed(3).landed_slot(), Some(3));
        assert_eq!(DropPhase::Spawned.landed_slot(), None);
    }
}
