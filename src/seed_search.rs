//! Test mode seed pools
//!
//! Test mode forces drops into a mirrored pair of slots using only seeds that
//! were replayed offline and verified to land there. The search is a
//! resumable state machine: the owner advances it in short wall-clock slices
//! and yields to the frame scheduler in between, so it never blocks a frame.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use rand::Rng;

use crate::consts::{ATTEMPTS_PER_VARIATION, SEARCH_MIN_STEPS, SEARCH_MIN_YIELD_MS, SEARCH_STEPS_PER_ROW};
use crate::settings::TestModeSettings;
use crate::sim::{BoardLayout, PhysicsParams, SeededRandom, make_test_seed, simulate_drop_preview};

/// Mirrored slot pair for a forced landing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestTargets {
    pub left: usize,
    pub right: usize,
}

impl TestTargets {
    /// Map an edge offset onto a slot pair. None without any slots.
    pub fn resolve(forced_index: i64, box_count: usize) -> Option<Self> {
        if box_count == 0 {
            return None;
        }
        let last = box_count as i64 - 1;
        let left = forced_index.clamp(0, last) as usize;
        let right = box_count.saturating_sub(1 + left);
        Some(Self { left, right })
    }

    /// Whether the right side is a distinct slot (not the center)
    pub fn need_right(&self) -> bool {
        self.left != self.right
    }

    pub fn index(&self, side: Side) -> usize {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Pool identity; any change invalidates the pooled seeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub rows: u32,
    pub left: usize,
    pub right: usize,
    pub desired: usize,
}

impl PoolKey {
    pub fn new(rows: u32, targets: TestTargets, desired: usize) -> Self {
        Self {
            rows,
            left: targets.left,
            right: targets.right,
            desired,
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.rows, self.left, self.right, self.desired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// A seed chosen for the next drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPick {
    pub seed: u32,
    pub target_index: usize,
}

/// Verified seeds per side, in discovery order
#[derive(Debug, Clone, Default)]
pub struct TestModePools {
    left: Vec<u32>,
    right: Vec<u32>,
    left_set: HashSet<u32>,
    right_set: HashSet<u32>,
    last_seed: Option<u32>,
}

impl TestModePools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn pool(&self, side: Side) -> &[u32] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn contains(&self, side: Side, seed: u32) -> bool {
        match side {
            Side::Left => self.left_set.contains(&seed),
            Side::Right => self.right_set.contains(&seed),
        }
    }

    /// Add a verified seed; false if already pooled
    pub fn push(&mut self, side: Side, seed: u32) -> bool {
        let (pool, set) = match side {
            Side::Left => (&mut self.left, &mut self.left_set),
            Side::Right => (&mut self.right, &mut self.right_set),
        };
        if !set.insert(seed) {
            return false;
        }
        pool.push(seed);
        true
    }

    /// Every needed side holds at least `desired` seeds
    pub fn are_ready(&self, targets: &TestTargets, desired: usize) -> bool {
        let left_ready = self.left.len() >= desired;
        if !targets.need_right() {
            return left_ready;
        }
        left_ready && self.right.len() >= desired
    }

    /// At least one seed is usable for this pair
    pub fn has_any(&self, targets: &TestTargets) -> bool {
        if !self.left.is_empty() {
            return true;
        }
        targets.need_right() && !self.right.is_empty()
    }

    pub fn last_seed(&self) -> Option<u32> {
        self.last_seed
    }

    /// Pick a pooled seed, avoiding an immediate repeat when possible.
    ///
    /// With both sides stocked the side is a coin flip; with one side empty
    /// the other is used.
    pub fn pick_seed<R: Rng + ?Sized>(&mut self, targets: &TestTargets, rng: &mut R) -> Option<SeedPick> {
        let side = if targets.need_right() {
            match (self.left.is_empty(), self.right.is_empty()) {
                (false, false) => {
                    if rng.random::<f64>() < 0.5 {
                        Side::Left
                    } else {
                        Side::Right
                    }
                }
                (true, false) => Side::Right,
                (false, true) => Side::Left,
                (true, true) => return None,
            }
        } else if self.left.is_empty() {
            return None;
        } else {
            Side::Left
        };

        let pool = self.pool(side);
        let len = pool.len();
        let mut index = rng.random_range(0..len);
        if len > 1 && Some(pool[index]) == self.last_seed {
            index = (index + 1 + rng.random_range(0..len - 1)) % len;
        }
        let seed = pool[index];

        self.last_seed = Some(seed);
        Some(SeedPick {
            seed,
            target_index: targets.index(side),
        })
    }
}

/// Budgets for one pool search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub rows: u32,
    pub desired: usize,
    /// Attempts per side
    pub attempts_limit: u64,
    pub fixed_delta: f64,
    /// Step budget per candidate replay
    pub max_steps: u32,
    pub seed_base: u32,
    /// Wall-clock work per slice (ms)
    pub yield_ms: f64,
}

impl SearchParams {
    pub fn new(settings: &TestModeSettings, rows: u32) -> Self {
        let desired = settings.desired_variations();
        let attempts_limit = settings
            .max_attempts
            .max(1)
            .min(desired as u64 * ATTEMPTS_PER_VARIATION);
        let max_steps = settings
            .max_steps
            .max(1)
            .min(SEARCH_MIN_STEPS.max(rows * SEARCH_STEPS_PER_ROW));
        let yield_ms = if settings.search_yield_ms.is_finite() {
            settings.search_yield_ms.floor().max(SEARCH_MIN_YIELD_MS)
        } else {
            SEARCH_MIN_YIELD_MS
        };
        Self {
            rows,
            desired,
            attempts_limit,
            fixed_delta: settings.effective_fixed_delta(),
            max_steps,
            seed_base: settings.seed_base,
            yield_ms,
        }
    }
}

/// Where a search stands after a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Slice budget spent, more work remains
    Running,
    /// Both sides full or out of attempts
    Finished,
    /// Token no longer current
    Cancelled,
}

/// An in-flight pool search
#[derive(Debug, Clone)]
pub struct SeedSearch {
    key: PoolKey,
    targets: TestTargets,
    params: SearchParams,
    token: u64,
    layout: Rc<BoardLayout>,
    phys: Rc<PhysicsParams>,
    left_attempts: u64,
    right_attempts: u64,
}

impl SeedSearch {
    pub fn new(
        key: PoolKey,
        targets: TestTargets,
        params: SearchParams,
        token: u64,
        layout: Rc<BoardLayout>,
        phys: Rc<PhysicsParams>,
    ) -> Self {
        Self {
            key,
            targets,
            params,
            token,
            layout,
            phys,
            left_attempts: 0,
            right_attempts: 0,
        }
    }

    pub fn key(&self) -> PoolKey {
        self.key
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    /// Attempts spent on (left, right)
    pub fn attempts(&self) -> (u64, u64) {
        (self.left_attempts, self.right_attempts)
    }

    fn side_done(&self, side: Side, pools: &TestModePools) -> bool {
        match side {
            Side::Left => {
                pools.pool(Side::Left).len() >= self.params.desired
                    || self.left_attempts >= self.params.attempts_limit
            }
            Side::Right => {
                !self.targets.need_right()
                    || pools.pool(Side::Right).len() >= self.params.desired
                    || self.right_attempts >= self.params.attempts_limit
            }
        }
    }

    /// Replay candidate `attempt` for `side`; pool it if it lands on target
    fn try_add_seed(&self, side: Side, attempt: u64, pools: &mut TestModePools) -> bool {
        let target = self.targets.index(side);
        let seed = make_test_seed(self.params.seed_base, self.params.rows, target, attempt);
        if pools.contains(side, seed) {
            return false;
        }
        let landed = simulate_drop_preview(
            self.layout.clone(),
            self.phys.clone(),
            Some(target),
            SeededRandom::new(seed),
            Some(self.params.fixed_delta),
            Some(self.params.max_steps),
        );
        landed == Some(target) && pools.push(side, seed)
    }

    fn finish(&self, pools: &TestModePools) {
        let desired = self.params.desired;
        let left = pools.pool(Side::Left).len();
        if left < desired {
            log::warn!(
                "Test mode: only {}/{} variations for box {}",
                left,
                desired,
                self.targets.left
            );
        }
        let right = pools.pool(Side::Right).len();
        if self.targets.need_right() && right < desired {
            log::warn!(
                "Test mode: only {}/{} variations for box {}",
                right,
                desired,
                self.targets.right
            );
        }
        log::info!(
            "Test mode pools {}: left {} right {} after {}/{} attempts",
            self.key,
            left,
            right,
            self.left_attempts,
            self.right_attempts
        );
    }

    /// Run attempts (alternating sides) until the slice budget is spent.
    ///
    /// `current_token` is compared before every attempt; a mismatch cancels
    /// the search. `now_ms` is a monotonic wall clock.
    pub fn run_slice(
        &mut self,
        pools: &mut TestModePools,
        current_token: u64,
        now_ms: impl Fn() -> f64,
    ) -> SearchStatus {
        let slice_start = now_ms();
        loop {
            if self.token != current_token {
                return SearchStatus::Cancelled;
            }

            let left_done = self.side_done(Side::Left, pools);
            let right_done = self.side_done(Side::Right, pools);
            if left_done && right_done {
                self.finish(pools);
                return SearchStatus::Finished;
            }

            if !left_done {
                self.try_add_seed(Side::Left, self.left_attempts, pools);
                self.left_attempts += 1;
            }
            if !right_done {
                if self.token != current_token {
                    return SearchStatus::Cancelled;
                }
                self.try_add_seed(Side::Right, self.right_attempts, pools);
                self.right_attempts += 1;
            }

            if now_ms() - slice_start >= self.params.yield_ms {
                return SearchStatus::Running;
            }
        }
    }
}
