//! Drop stepping
//!
//! A `DropSim` owns everything one ball needs: a snapshot of the layout and
//! physics it was spawned with, its own random stream, and the landing state.
//! Frame pacing (fixed substeps vs. one variable step) lives here so the
//! animated drop and the offline preview share a single stepping path.

use std::rc::Rc;

use glam::DVec2;
use rand::RngCore;

use super::geometry::{BoardLayout, PlayBounds};
use super::physics::{PhysicsParams, step_ball_physics};
use super::rng::unit;
use super::state::{BallState, DropPhase};
use crate::consts::{MAX_FRAME_DELTA, MAX_SUBSTEPS, MAX_VARIABLE_STEP};

/// Default preview step budget
pub const DEFAULT_PREVIEW_STEPS: u32 = 2000;
/// Default preview timestep (seconds)
pub const DEFAULT_PREVIEW_DELTA: f64 = 1.0 / 60.0;

/// Spawn a ball: first draw jitters X inside the spawn range, second draw
/// jitters the launch angle around straight down.
fn spawn_ball<R: RngCore + ?Sized>(
    layout: &BoardLayout,
    phys: &PhysicsParams,
    rng: &mut R,
) -> BallState {
    let spawn = &layout.spawn;
    let jitter_x = (unit(rng) - 0.5) * spawn.range_x;
    let x = (spawn.center_x + jitter_x)
        .min(spawn.bounds.right)
        .max(spawn.bounds.left);

    let angle = std::f64::consts::FRAC_PI_2 + (unit(rng) - 0.5) * phys.spawn_angle_jitter;
    let vel = DVec2::from_angle(angle) * phys.launch_speed();

    BallState::new(DVec2::new(x, spawn.y), vel)
}

/// One ball in flight
#[derive(Debug, Clone)]
pub struct DropSim<R: RngCore> {
    layout: Rc<BoardLayout>,
    phys: Rc<PhysicsParams>,
    rng: R,
    ball: BallState,
    target_x: Option<f64>,
    bounds: PlayBounds,
    /// Substep size, or None for one variable step per frame
    fixed_delta: Option<f64>,
    accumulator: f64,
    phase: DropPhase,
    steps: u32,
    /// Any peg hit during the last `advance`
    hit_last_frame: bool,
}

impl<R: RngCore> DropSim<R> {
    /// Spawn a ball aimed at `target_index` (no aim if that slot has no box)
    pub fn new(
        layout: Rc<BoardLayout>,
        phys: Rc<PhysicsParams>,
        target_index: Option<usize>,
        mut rng: R,
        fixed_delta: Option<f64>,
    ) -> Self {
        let ball = spawn_ball(&layout, &phys, &mut rng);
        let target_x = target_index.and_then(|i| layout.slot_center_x(i));
        let bounds = layout.spawn.bounds;
        let fixed_delta = fixed_delta.filter(|d| d.is_finite() && *d > 0.0);
        Self {
            layout,
            phys,
            rng,
            ball,
            target_x,
            bounds,
            fixed_delta,
            accumulator: 0.0,
            phase: DropPhase::Spawned,
            steps: 0,
            hit_last_frame: false,
        }
    }

    pub fn ball(&self) -> &BallState {
        &self.ball
    }

    pub fn phase(&self) -> DropPhase {
        self.phase
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn target_x(&self) -> Option<f64> {
        self.target_x
    }

    /// Physics substeps taken so far
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn hit_last_frame(&self) -> bool {
        self.hit_last_frame
    }

    /// One physics substep followed by the landing checks.
    ///
    /// Returns true if a peg was hit. No-op once the drop is finished.
    pub fn step(&mut self, dt: f64) -> bool {
        if self.phase.is_finished() {
            return false;
        }
        let hit = step_ball_physics(
            &mut self.ball,
            &self.layout,
            &self.phys,
            self.target_x,
            dt,
            self.bounds,
            &mut self.rng,
        );
        self.steps += 1;
        self.phase = self.landing_check();
        hit
    }

    fn landing_check(&self) -> DropPhase {
        let y = self.ball.pos.y;
        if self.layout.in_score_zone(y) {
            // Entering the band always ends the drop; no box means void
            return match self.layout.closest_slot_by_x(self.ball.pos.x) {
                Some(slot) => DropPhase::Landed(slot),
                None => DropPhase::OutOfBounds,
            };
        }
        if y > self.layout.out_of_bounds_y() {
            return DropPhase::OutOfBounds;
        }
        DropPhase::Falling
    }

    /// Advance by one rendered frame of `frame_delta` seconds
    pub fn advance(&mut self, frame_delta: f64) -> DropPhase {
        self.hit_last_frame = false;
        if self.phase.is_finished() {
            return self.phase;
        }
        let frame_delta = if frame_delta.is_finite() {
            frame_delta.clamp(0.0, MAX_FRAME_DELTA)
        } else {
            0.0
        };

        match self.fixed_delta {
            Some(step_size) => {
                self.accumulator =
                    (self.accumulator + frame_delta).min(step_size * MAX_SUBSTEPS as f64);
                let mut substeps = 0;
                while self.accumulator >= step_size
                    && substeps < MAX_SUBSTEPS
                    && !self.phase.is_finished()
                {
                    if self.step(step_size) {
                        self.hit_last_frame = true;
                    }
                    self.accumulator -= step_size;
                    substeps += 1;
                }
            }
            None => {
                let dt = frame_delta.min(MAX_VARIABLE_STEP);
                self.hit_last_frame = self.step(dt);
            }
        }
        self.phase
    }

    /// Run fixed steps until the drop finishes or `max_steps` is spent
    pub fn run_to_end(&mut self, dt: f64, max_steps: u32) -> DropPhase {
        for _ in 0..max_steps.max(1) {
            self.step(dt);
            if self.phase.is_finished() {
                break;
            }
        }
        self.phase
    }
}

/// Run an invisible drop and report the landed slot.
///
/// Uses `fixed_delta` (1/60 if absent or non-positive) for at most
/// `max_steps` steps (at least 1). None for a void or exhausted drop.
pub fn simulate_drop_preview<R: RngCore>(
    layout: Rc<BoardLayout>,
    phys: Rc<PhysicsParams>,
    target_index: Option<usize>,
    rng: R,
    fixed_delta: Option<f64>,
    max_steps: Option<u32>,
) -> Option<usize> {
    let dt = fixed_delta
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(DEFAULT_PREVIEW_DELTA);
    let mut sim = DropSim::new(layout, phys, target_index, rng, Some(dt));
    sim.run_to_end(dt, max_steps.unwrap_or(DEFAULT_PREVIEW_STEPS))
        .landed_slot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LayoutSettings;
    use crate::sim::rng::SeededRandom;

    fn setup(rows: u32) -> (Rc<BoardLayout>, Rc<PhysicsParams>) {
        let layout =
            BoardLayout::compute(rows, rows as usize + 1, 800.0, 700.0, &LayoutSettings::default());
        let phys = PhysicsParams::default().for_rows(rows);
        (Rc::new(layout), Rc::new(phys))
    }

    #[test]
    fn test_spawn_inside_bounds_and_moving_down() {
        let (layout, phys) = setup(8);
        for seed in 0..200 {
            let sim = DropSim::new(
                layout.clone(),
                phys.clone(),
                Some(3),
                SeededRandom::new(seed),
                Some(1.0 / 60.0),
            );
            let ball = sim.ball();
            assert!(ball.pos.x >= layout.spawn.bounds.left);
            assert!(ball.pos.x <= layout.spawn.bounds.right);
            assert_eq!(ball.pos.y, layout.spawn.y);
            assert!(ball.vel.y > 0.0);
            assert_eq!(sim.phase(), DropPhase::Spawned);
        }
    }

    #[test]
    fn test_missing_target_box_means_no_aim() {
        let (layout, phys) = setup(8);
        let sim = DropSim::new(layout, phys, Some(99), SeededRandom::new(1), None);
        assert_eq!(sim.target_x(), None);
    }

    #[test]
    fn test_preview_is_deterministic() {
        let (layout, phys) = setup(12);
        for seed in [1u32, 7, 42, 0xdead_beef] {
            let a = simulate_drop_preview(
                layout.clone(),
                phys.clone(),
                Some(6),
                SeededRandom::new(seed),
                None,
                None,
            );
            let b = simulate_drop_preview(
                layout.clone(),
                phys.clone(),
                Some(6),
                SeededRandom::new(seed),
                None,
                None,
            );
            assert_eq!(a, b);
            if let Some(slot) = a {
                assert!(slot < layout.box_count);
            }
        }
    }

    #[test]
    fn test_frame_pacing_matches_preview() {
        // Fixed-step frames replay exactly the preview's step sequence
        let (layout, phys) = setup(8);
        let dt = 1.0 / 60.0;
        for seed in [3u32, 99, 1234] {
            let preview = simulate_drop_preview(
                layout.clone(),
                phys.clone(),
                Some(2),
                SeededRandom::new(seed),
                Some(dt),
                Some(DEFAULT_PREVIEW_STEPS),
            );
            let mut sim = DropSim::new(
                layout.clone(),
                phys.clone(),
                Some(2),
                SeededRandom::new(seed),
                Some(dt),
            );
            // A frame of exactly one step leaves the accumulator at zero
            while !sim.phase().is_finished() && sim.steps() < DEFAULT_PREVIEW_STEPS {
                sim.advance(dt);
            }
            assert!(sim.steps() > 0);
            assert_eq!(sim.phase().landed_slot(), preview);
        }
    }

    #[test]
    fn test_advance_caps_frame_delta() {
        let (layout, phys) = setup(8);
        let mut sim = DropSim::new(layout, phys, None, SeededRandom::new(5), Some(1.0 / 60.0));
        // A 5 second stall is clamped to 0.1s of substeps
        sim.advance(5.0);
        assert!(sim.steps() <= 6);
        assert!(sim.steps() >= 5 || sim.phase().is_finished());
    }

    #[test]
    fn test_variable_step_is_one_substep_per_frame() {
        let (layout, phys) = setup(8);
        let mut sim = DropSim::new(layout, phys, None, SeededRandom::new(5), None);
        sim.advance(1.0 / 60.0);
        assert_eq!(sim.steps(), 1);
        sim.advance(0.5);
        assert_eq!(sim.steps(), 2);
    }

    #[test]
    fn test_finished_drop_stays_finished() {
        let (layout, phys) = setup(8);
        for seed in 0..20 {
            let mut sim = DropSim::new(
                layout.clone(),
                phys.clone(),
                Some(4),
                SeededRandom::new(seed),
                Some(1.0 / 60.0),
            );
            let phase = sim.run_to_end(1.0 / 60.0, 5000);
            if !phase.is_finished() {
                continue;
            }
            let steps = sim.steps();
            assert_eq!(sim.advance(0.1), phase);
            assert_eq!(sim.steps(), steps);
            assert!(!sim.hit_last_frame());
            return;
        }
        panic!("no drop finished");
    }
}
