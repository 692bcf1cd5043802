//! Deterministic simulation module
//!
//! Everything a single drop needs lives here. This module must be pure and
//! deterministic:
//! - Randomness only through an explicit generator argument
//! - Stable iteration order (pegs in layout order)
//! - No rendering, clock or platform dependencies

pub mod collision;
pub mod geometry;
pub mod physics;
pub mod rng;
pub mod state;
pub mod tick;

pub use collision::{CollisionResult, ball_peg_contact, resolve_peg_collision, resolve_wall_collision};
pub use geometry::{BoardLayout, PlayBounds, SlotBox, SpawnArea};
pub use physics::{PhysicsParams, normalize_speed, step_ball_physics};
pub use rng::{SeededRandom, make_test_seed, unit};
pub use state::{BallState, DropPhase};
pub use tick::{DropSim, simulate_drop_preview};
