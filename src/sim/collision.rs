//! Collision detection and response for ball vs. pegs and side walls
//!
//! Peg response is deliberately not a pure elastic bounce: restitution,
//! tangential damping, jitter, a direction-flip policy and a center bias shape
//! the path so it reads like a real Galton board.

use glam::DVec2;
use rand::RngCore;

use super::geometry::{BoardLayout, PlayBounds};
use super::physics::PhysicsParams;
use super::rng::unit;
use super::state::BallState;

/// Result of a contact check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether the shapes overlap
    pub hit: bool,
    /// Surface normal at contact (pointing from the obstacle toward the ball)
    pub normal: DVec2,
    /// Overlap depth (for position correction)
    pub penetration: f64,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: DVec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Circle-circle contact between the ball and a peg.
///
/// Concentric circles are a miss: there is no usable normal.
pub fn ball_peg_contact(
    ball_pos: DVec2,
    ball_radius: f64,
    peg: DVec2,
    peg_radius: f64,
) -> CollisionResult {
    let delta = ball_pos - peg;
    let reach = ball_radius + peg_radius;
    let d2 = delta.length_squared();
    if d2 <= 0.0 || d2 > reach * reach {
        return CollisionResult::miss();
    }

    let d = d2.sqrt();
    CollisionResult {
        hit: true,
        normal: delta / d,
        penetration: reach - d,
    }
}

/// Sign with 0 for 0 (unlike `f64::signum`)
#[inline]
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Keep the ball between the side walls.
///
/// Velocity is reflected (and damped) only while still moving into the wall.
/// Returns true if the ball touched a wall.
pub fn resolve_wall_collision(
    ball: &mut BallState,
    bounds: PlayBounds,
    ball_radius: f64,
    wall_restitution: f64,
) -> bool {
    let left = bounds.left + ball_radius;
    let right = bounds.right - ball_radius;

    if ball.pos.x < left {
        ball.pos.x = left;
        if ball.vel.x < 0.0 {
            ball.vel.x = -ball.vel.x * wall_restitution;
        }
        true
    } else if ball.pos.x > right {
        ball.pos.x = right;
        if ball.vel.x > 0.0 {
            ball.vel.x = -ball.vel.x * wall_restitution;
        }
        true
    } else {
        false
    }
}

/// Push the ball out of a peg and, if it was moving into it, bounce it.
///
/// Returns true when a bounce was applied.
pub fn resolve_peg_collision<R: RngCore + ?Sized>(
    ball: &mut BallState,
    peg: DVec2,
    board: &BoardLayout,
    phys: &PhysicsParams,
    rng: &mut R,
) -> bool {
    let contact = ball_peg_contact(ball.pos, board.ball_radius, peg, board.peg_radius);
    if !contact.hit {
        return false;
    }
    let n = contact.normal;
    ball.pos += n * (contact.penetration + phys.collision_slop);

    let v_dot_n = ball.vel.dot(n);
    if v_dot_n >= 0.0 {
        return false;
    }

    let incoming_vx = ball.vel.x;
    let t = n.perp();
    let v_dot_t = ball.vel.dot(t);

    // No impulse from below the peg center: that would inject energy upward
    let j = if ball.pos.y > peg.y {
        0.0
    } else {
        -(1.0 + phys.restitution) * v_dot_n
    };
    ball.vel += n * j;

    // Recompose with damped tangential component
    let v_n = ball.vel.dot(n);
    ball.vel = t * (v_dot_t * phys.tangential_damp) + n * v_n;

    ball.vel.x += (unit(rng) - 0.5) * phys.impulse_jitter;

    if phys.bounce_angle_jitter > 0.0 {
        let angle = (unit(rng) - 0.5) * phys.bounce_angle_jitter * 2.0;
        ball.vel = DVec2::from_angle(angle).rotate(ball.vel);
    }

    let keep_direction = unit(rng) < phys.keep_direction_chance;
    if !keep_direction {
        let mut incoming_sign = sign(incoming_vx);
        if incoming_sign == 0.0 {
            incoming_sign = if unit(rng) < 0.5 { -1.0 } else { 1.0 };
        }
        let outgoing_sign = sign(ball.vel.x);
        if outgoing_sign == 0.0 || outgoing_sign == incoming_sign {
            ball.vel.x = -ball.vel.x;
            if ball.vel.x.abs() < 1e-4 {
                let nudge = 1f64.max(incoming_vx.abs()).max(phys.impulse_jitter);
                ball.vel.x = -incoming_sign * nudge;
            }
        }
    }

    if phys.center_bias_strength > 0.0 && ball.vel.x.abs() > 1e-4 {
        let to_center = board.center_x() - ball.pos.x;
        let direction_to_center = sign(to_center);
        if direction_to_center != 0.0 {
            let max_distance = (board.game_width * 0.5).max(1.0);
            let distance_factor = (to_center.abs() / max_distance).min(1.0);
            if distance_factor > 0.0 {
                let jitter = 1.0 + (unit(rng) - 0.5) * phys.center_bias_jitter;
                let bias = phys.center_bias_strength * distance_factor * jitter;
                let toward_center = sign(ball.vel.x) == direction_to_center;
                ball.vel.x *= if toward_center { 1.0 + bias } else { 1.0 - bias };
            }
        }
    }

    ball.clamp_speed(phys.max_speed);
    true
}
