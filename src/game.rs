//! Per-board session state
//!
//! `PlinkoSession` owns everything one board needs: rows, difficulty,
//! multipliers, probabilities, the laid-out board, scaled physics, history,
//! the session RNG and the test mode pools. All operations here are
//! synchronous; the frame-driven round lives in `round`.
//!
//! Derived state (probabilities, layout, physics) is always rebuilt wholesale
//! and handed to drops as `Rc` snapshots, so a configuration change never
//! mutates anything a drop in flight is reading.

use std::rc::Rc;

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::history::RoundHistory;
use crate::multipliers::{MultiplierSlot, multipliers_for_rows, slot_values};
use crate::outcome::select_by_probability;
use crate::platform::entropy_seed;
use crate::probability::{
    build_win_rate_probabilities, generate_binomial_probabilities, normalize_win_rate, rtp_estimate,
    win_chance,
};
use crate::seed_search::{
    PoolKey, SearchParams, SearchStatus, SeedPick, SeedSearch, TestModePools, TestTargets,
};
use crate::settings::{Difficulty, GameSettings, TestModeSettings};
use crate::sim::{BoardLayout, DropPhase, DropSim, PhysicsParams, SeededRandom};

/// Read-only view of a session for hosts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub is_animating: bool,
    /// Most recent first
    pub history: Vec<MultiplierSlot>,
    pub rows: u32,
    pub difficulty: Difficulty,
    pub box_count: usize,
    pub multipliers: Vec<MultiplierSlot>,
    pub win_rate_target: Option<f64>,
    pub win_rate_min_multiplier: f64,
}

/// Result of one round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundOutcome {
    /// Slot the ball was steered toward
    pub target_index: usize,
    /// Slot the ball physically landed in (None for a void drop)
    pub landed_slot: Option<usize>,
    pub slot: Option<MultiplierSlot>,
    /// Seed of the drop's random stream
    pub seed: u32,
    /// Drop used a verified test mode seed
    pub seeded: bool,
    pub test_mode: bool,
    /// Physics substeps the drop took
    pub steps: u32,
}

impl RoundOutcome {
    /// Host-facing value: the landed multiplier, `0` in test mode, `-1` for a void drop
    pub fn reported_value(&self) -> f64 {
        match self.slot {
            Some(_) if self.test_mode => 0.0,
            Some(slot) => slot.value,
            None => -1.0,
        }
    }
}

/// Target chosen for the next round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundPlan {
    pub target_index: usize,
    /// Mirrored pair when test mode is active
    pub test_targets: Option<TestTargets>,
}

/// A drop ready to be stepped
#[derive(Debug)]
pub struct PreparedDrop {
    pub sim: DropSim<SeededRandom>,
    pub target_index: usize,
    pub seed: u32,
    pub seeded: bool,
}

/// All state for one board
#[derive(Debug)]
pub struct PlinkoSession {
    settings: GameSettings,
    rows: u32,
    difficulty: Difficulty,
    multipliers: Vec<MultiplierSlot>,
    base_probabilities: Vec<f64>,
    probabilities: Vec<f64>,
    win_rate_target: Option<f64>,
    win_rate_min_multiplier: f64,
    container_width: f64,
    container_height: f64,
    layout: Rc<BoardLayout>,
    phys: Rc<PhysicsParams>,
    history: RoundHistory,
    rng: Pcg32,
    active_drops: u32,

    // === Test mode ===
    pools: TestModePools,
    pool_key: Option<PoolKey>,
    search: Option<SeedSearch>,
    search_token: u64,
}

impl PlinkoSession {
    pub fn new(settings: GameSettings) -> Self {
        let rows = settings.clamp_rows(settings.rows as i64);
        let difficulty = settings.difficulty;
        let multipliers = multipliers_for_rows(rows, difficulty);
        let base_probabilities = generate_binomial_probabilities(rows);
        let win_rate_target = settings.win_rate.and_then(normalize_win_rate);
        let win_rate_min_multiplier = settings.effective_min_multiplier();
        let probabilities = build_win_rate_probabilities(
            &base_probabilities,
            &slot_values(&multipliers),
            win_rate_target,
            win_rate_min_multiplier,
        );
        let container_width = settings.container_width.max(1.0);
        let container_height = settings.container_height.max(1.0);
        let layout = BoardLayout::compute(
            rows,
            multipliers.len(),
            container_width,
            container_height,
            &settings.layout,
        );
        let phys = settings.physics.for_rows(rows);
        let seed = settings.seed.unwrap_or_else(entropy_seed);

        log::info!(
            "Plinko session: {} rows, {} difficulty, {} slots, seed {}",
            rows,
            difficulty.as_str(),
            multipliers.len(),
            seed
        );

        let mut session = Self {
            history: RoundHistory::new(settings.history_size),
            rows,
            difficulty,
            multipliers,
            base_probabilities,
            probabilities,
            win_rate_target,
            win_rate_min_multiplier,
            container_width,
            container_height,
            layout: Rc::new(layout),
            phys: Rc::new(phys),
            rng: Pcg32::seed_from_u64(seed),
            active_drops: 0,
            pools: TestModePools::new(),
            pool_key: None,
            search: None,
            search_token: 0,
            settings,
        };
        session.queue_test_mode_search();
        session
    }

    // === Queries ===

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn box_count(&self) -> usize {
        self.multipliers.len()
    }

    pub fn multipliers(&self) -> &[MultiplierSlot] {
        &self.multipliers
    }

    pub fn base_probabilities(&self) -> &[f64] {
        &self.base_probabilities
    }

    /// Target distribution the outcome selector draws from
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn win_rate_target(&self) -> Option<f64> {
        self.win_rate_target
    }

    pub fn win_rate_min_multiplier(&self) -> f64 {
        self.win_rate_min_multiplier
    }

    pub fn layout(&self) -> &Rc<BoardLayout> {
        &self.layout
    }

    pub fn physics(&self) -> &Rc<PhysicsParams> {
        &self.phys
    }

    pub fn history(&self) -> &RoundHistory {
        &self.history
    }

    pub fn is_animating(&self) -> bool {
        self.active_drops > 0
    }

    pub fn active_drops(&self) -> u32 {
        self.active_drops
    }

    pub fn container_size(&self) -> (f64, f64) {
        (self.container_width, self.container_height)
    }

    /// Expected multiplier under the current distribution
    pub fn rtp_estimate(&self) -> Option<f64> {
        rtp_estimate(&self.probabilities, &slot_values(&self.multipliers))
    }

    /// Probability of landing on a slot paying at least `min_multiplier`
    pub fn win_chance(&self, min_multiplier: f64) -> Option<f64> {
        win_chance(
            &self.probabilities,
            &slot_values(&self.multipliers),
            min_multiplier,
        )
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            is_animating: self.is_animating(),
            history: self.history.entries().to_vec(),
            rows: self.rows,
            difficulty: self.difficulty,
            box_count: self.box_count(),
            multipliers: self.multipliers.clone(),
            win_rate_target: self.win_rate_target,
            win_rate_min_multiplier: self.win_rate_min_multiplier,
        }
    }

    // === Configuration ===

    fn rebuild_probabilities(&mut self) {
        self.probabilities = build_win_rate_probabilities(
            &self.base_probabilities,
            &slot_values(&self.multipliers),
            self.win_rate_target,
            self.win_rate_min_multiplier,
        );
    }

    fn rebuild_layout(&mut self) {
        self.layout = Rc::new(BoardLayout::compute(
            self.rows,
            self.multipliers.len(),
            self.container_width,
            self.container_height,
            &self.settings.layout,
        ));
    }

    /// Change the row count (rounded, clamped to the configured range).
    ///
    /// Refused while a drop is animating. Returns true if anything changed.
    pub fn set_rows(&mut self, rows: f64) -> bool {
        if self.is_animating() {
            log::warn!("Ignoring row change while a drop is animating");
            return false;
        }
        if rows.is_nan() {
            log::warn!("Ignoring non-numeric row count");
            return false;
        }
        // Saturating cast: infinities land on the range ends
        let rows = self.settings.clamp_rows(rows.round() as i64);
        if rows == self.rows {
            return false;
        }

        self.rows = rows;
        self.multipliers = multipliers_for_rows(rows, self.difficulty);
        self.base_probabilities = generate_binomial_probabilities(rows);
        self.rebuild_probabilities();
        self.phys = Rc::new(self.settings.physics.for_rows(rows));
        self.invalidate_test_mode_pools();
        self.rebuild_layout();
        self.queue_test_mode_search();
        log::info!("Rows set to {}", rows);
        true
    }

    /// Switch multiplier tables. Refused while a drop is animating.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if self.is_animating() {
            log::warn!("Ignoring difficulty change while a drop is animating");
            return false;
        }
        if difficulty == self.difficulty {
            return false;
        }

        self.difficulty = difficulty;
        let multipliers = multipliers_for_rows(self.rows, difficulty);
        let box_count_changed = multipliers.len() != self.multipliers.len();
        self.multipliers = multipliers;
        self.rebuild_probabilities();
        self.invalidate_test_mode_pools();
        if box_count_changed {
            self.rebuild_layout();
        }
        self.queue_test_mode_search();
        log::info!("Difficulty set to {}", difficulty.as_str());
        true
    }

    /// Replace the base weights; ignored unless one weight per slot
    pub fn set_probabilities(&mut self, weights: &[f64]) -> bool {
        if weights.len() != self.box_count() {
            log::warn!(
                "Ignoring {} probabilities for a {}-slot board",
                weights.len(),
                self.box_count()
            );
            return false;
        }
        self.base_probabilities = weights.to_vec();
        self.rebuild_probabilities();
        true
    }

    /// Set (or clear) the target win rate.
    ///
    /// Values above 1 are read as percentages. A non-finite threshold means 1x.
    pub fn set_win_rate(&mut self, value: Option<f64>, min_multiplier: f64) {
        self.win_rate_target = value.and_then(normalize_win_rate);
        self.win_rate_min_multiplier = if min_multiplier.is_finite() {
            min_multiplier
        } else {
            1.0
        };
        self.rebuild_probabilities();
    }

    /// Relayout for a new container size; pooled seeds no longer replay
    pub fn set_container_size(&mut self, width: f64, height: f64) {
        let width = if width.is_finite() { width.max(1.0) } else { self.container_width };
        let height = if height.is_finite() { height.max(1.0) } else { self.container_height };
        if width == self.container_width && height == self.container_height {
            return;
        }
        self.container_width = width;
        self.container_height = height;
        self.rebuild_layout();
        self.invalidate_test_mode_pools();
        self.queue_test_mode_search();
    }

    // === Test mode ===

    pub fn test_mode(&self) -> &TestModeSettings {
        &self.settings.test_mode
    }

    /// Mirrored target pair, if test mode is on and the board has slots
    pub fn test_mode_targets(&self) -> Option<TestTargets> {
        let test_mode = &self.settings.test_mode;
        if !test_mode.enabled {
            return None;
        }
        TestTargets::resolve(test_mode.forced_landing_index, self.box_count())
    }

    /// Key the current pools must match
    pub fn test_mode_key(&self) -> Option<PoolKey> {
        let targets = self.test_mode_targets()?;
        Some(PoolKey::new(
            self.rows,
            targets,
            self.settings.test_mode.desired_variations(),
        ))
    }

    /// Key the stored pools were built for
    pub fn pool_key(&self) -> Option<PoolKey> {
        self.pool_key
    }

    pub fn pools(&self) -> &TestModePools {
        &self.pools
    }

    pub fn search_token(&self) -> u64 {
        self.search_token
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_some()
    }

    pub fn are_test_mode_pools_ready(&self) -> bool {
        match self.test_mode_targets() {
            Some(targets) => self
                .pools
                .are_ready(&targets, self.settings.test_mode.desired_variations()),
            None => false,
        }
    }

    pub fn has_any_test_mode_seed(&self, targets: &TestTargets) -> bool {
        self.pools.has_any(targets)
    }

    /// Drop all pooled seeds and cancel any search in flight
    pub fn invalidate_test_mode_pools(&mut self) {
        self.search_token += 1;
        self.pools.clear();
        self.pool_key = None;
        self.search = None;
    }

    /// Force the edge offset for test mode (ignored while test mode is off)
    pub fn set_test_mode_target(&mut self, index: i64) {
        if !self.settings.test_mode.enabled {
            return;
        }
        self.settings.test_mode.forced_landing_index = index;
        self.invalidate_test_mode_pools();
        self.queue_test_mode_search();
    }

    /// Start a search if test mode wants one automatically
    pub fn queue_test_mode_search(&mut self) {
        let test_mode = &self.settings.test_mode;
        if !test_mode.enabled || !test_mode.auto_search {
            return;
        }
        self.begin_test_mode_search();
    }

    /// Start (or keep) a pool search for the current key.
    ///
    /// Pools reset only when the key changed. Returns true while a search is
    /// in flight for the current key.
    pub fn begin_test_mode_search(&mut self) -> bool {
        let (Some(targets), Some(key)) = (self.test_mode_targets(), self.test_mode_key()) else {
            return false;
        };
        if self.pool_key != Some(key) {
            self.pools.clear();
            self.pool_key = Some(key);
        }
        if self.pools.are_ready(&targets, key.desired) {
            return false;
        }
        if self.search.as_ref().is_some_and(|s| s.key() == key) {
            return true;
        }

        self.search_token += 1;
        let params = SearchParams::new(&self.settings.test_mode, self.rows);
        log::info!("Test mode: searching seeds for {}", key);
        self.search = Some(SeedSearch::new(
            key,
            targets,
            params,
            self.search_token,
            self.layout.clone(),
            self.phys.clone(),
        ));
        true
    }

    /// Advance the pool search by one slice. None when no search is running.
    pub fn pump_search(&mut self, now_ms: impl Fn() -> f64) -> Option<SearchStatus> {
        let search = self.search.as_mut()?;
        let status = search.run_slice(&mut self.pools, self.search_token, now_ms);
        if status != SearchStatus::Running {
            self.search = None;
        }
        Some(status)
    }

    /// Take a pooled seed for the next drop
    pub fn pick_test_mode_seed(&mut self, targets: &TestTargets) -> Option<SeedPick> {
        self.pools.pick_seed(targets, &mut self.rng)
    }

    // === Rounds ===

    pub(crate) fn mark_drop_start(&mut self) {
        self.active_drops += 1;
    }

    pub(crate) fn mark_drop_end(&mut self) {
        self.active_drops = self.active_drops.saturating_sub(1);
    }

    /// Draw the nominal target for a round.
    ///
    /// Probabilities are rebuilt first if they no longer match the row count.
    pub fn prepare_round(&mut self) -> RoundPlan {
        if self.probabilities.len() != self.rows as usize + 1 {
            self.base_probabilities = generate_binomial_probabilities(self.rows);
            self.rebuild_probabilities();
        }
        let drawn = select_by_probability(&self.probabilities, &mut self.rng);
        RoundPlan {
            target_index: drawn.min(self.box_count().saturating_sub(1)),
            test_targets: self.test_mode_targets(),
        }
    }

    /// Spawn a drop toward `target_index`, or replay a picked test mode seed.
    ///
    /// Unseeded drops still get their own stream seeded from the session RNG,
    /// and step with the host's frame delta.
    pub fn spawn_drop(&mut self, target_index: usize, pick: Option<SeedPick>) -> PreparedDrop {
        let (target_index, seed, fixed_delta) = match pick {
            Some(pick) => (
                pick.target_index,
                pick.seed,
                Some(self.settings.test_mode.effective_fixed_delta()),
            ),
            None => (target_index, self.rng.next_u32(), None),
        };
        let sim = DropSim::new(
            self.layout.clone(),
            self.phys.clone(),
            Some(target_index),
            SeededRandom::new(seed),
            fixed_delta,
        );
        PreparedDrop {
            sim,
            target_index,
            seed,
            seeded: pick.is_some(),
        }
    }

    /// Settle a finished drop: record history and build the outcome
    pub fn record_round(&mut self, drop: &PreparedDrop) -> RoundOutcome {
        let phase = drop.sim.phase();
        let landed_slot = phase.landed_slot();
        let slot = landed_slot.and_then(|i| self.multipliers.get(i).copied());
        if let Some(slot) = slot {
            self.history.record(slot);
        }

        let outcome = RoundOutcome {
            target_index: drop.target_index,
            landed_slot: slot.and(landed_slot),
            slot,
            seed: drop.seed,
            seeded: drop.seeded,
            test_mode: self.settings.test_mode.enabled,
            steps: drop.sim.steps(),
        };
        match phase {
            DropPhase::Landed(index) => log::debug!(
                "Round: target {} landed {} (seed {}, {} steps)",
                outcome.target_index,
                index,
                outcome.seed,
                outcome.steps
            ),
            _ => log::debug!(
                "Round: target {} void (seed {}, {} steps)",
                outcome.target_index,
                outcome.seed,
                outcome.steps
            ),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_search::Side;

    fn session(rows: u32) -> PlinkoSession {
        PlinkoSession::new(GameSettings {
            rows,
            seed: Some(42),
            ..GameSettings::default()
        })
    }

    fn test_mode_session(rows: u32) -> PlinkoSession {
        PlinkoSession::new(GameSettings {
            rows,
            seed: Some(7),
            test_mode: TestModeSettings {
                enabled: true,
                max_attempts: 200,
                variations_per_side: 2,
                ..TestModeSettings::default()
            },
            ..GameSettings::default()
        })
    }

    #[test]
    fn test_new_session_derived_state() {
        let s = session(8);
        assert_eq!(s.rows(), 8);
        assert_eq!(s.box_count(), 9);
        assert_eq!(s.probabilities().len(), 9);
        assert_eq!(s.layout().boxes.len(), 9);
        assert_eq!(s.physics().constant_speed, 600.0);
        assert!(!s.is_animating());
        assert!(!s.is_searching());
    }

    #[test]
    fn test_new_clamps_configured_rows() {
        assert_eq!(session(200).rows(), 16);
        assert_eq!(session(0).rows(), 8);
    }

    #[test]
    fn test_set_rows_clamps() {
        let mut s = session(12);
        assert!(s.set_rows(200.0));
        assert_eq!(s.rows(), 16);
        assert!(s.set_rows(-5.0));
        assert_eq!(s.rows(), 8);
        assert!(s.set_rows(10.4));
        assert_eq!(s.rows(), 10);
        assert!(!s.set_rows(f64::NAN));
        assert!(s.set_rows(f64::INFINITY));
        assert_eq!(s.rows(), 16);
    }

    #[test]
    fn test_set_rows_idempotent() {
        let mut s = session(12);
        assert!(s.set_rows(8.0));
        let token = s.search_token();
        let layout = s.layout().clone();
        let phys = s.physics().clone();

        assert!(!s.set_rows(8.0));
        assert_eq!(s.search_token(), token);
        assert!(Rc::ptr_eq(s.layout(), &layout));
        assert!(Rc::ptr_eq(s.physics(), &phys));
    }

    #[test]
    fn test_set_rows_rebuilds_everything() {
        let mut s = session(16);
        let token = s.search_token();
        assert!(s.set_rows(8.0));
        assert_eq!(s.multipliers().len(), 9);
        assert_eq!(s.base_probabilities(), generate_binomial_probabilities(8).as_slice());
        assert_eq!(s.layout().rows, 8);
        assert_eq!(*s.physics().as_ref(), PhysicsParams::default().for_rows(8));
        assert!(s.search_token() > token);
    }

    #[test]
    fn test_changes_refused_while_animating() {
        let mut s = session(12);
        s.mark_drop_start();
        assert!(s.is_animating());
        assert!(!s.set_rows(8.0));
        assert!(!s.set_difficulty(Difficulty::High));
        assert_eq!(s.rows(), 12);
        assert_eq!(s.difficulty(), Difficulty::Medium);

        s.mark_drop_end();
        assert!(!s.is_animating());
        assert!(s.set_rows(8.0));
        // Unbalanced ends never underflow
        s.mark_drop_end();
        assert_eq!(s.active_drops(), 0);
    }

    #[test]
    fn test_set_difficulty() {
        let mut s = session(8);
        assert!(!s.set_difficulty(Difficulty::Medium));
        assert!(s.set_difficulty(Difficulty::normalize("HIGH")));
        assert_eq!(s.difficulty(), Difficulty::High);
        assert_eq!(s.multipliers()[0].value, 29.0);
        // Unknown names fall back to medium
        assert!(s.set_difficulty(Difficulty::normalize("extreme")));
        assert_eq!(s.difficulty(), Difficulty::Medium);
    }

    #[test]
    fn test_set_probabilities_requires_slot_count() {
        let mut s = session(8);
        assert!(!s.set_probabilities(&[1.0, 2.0]));
        let mut weights = vec![0.0; 9];
        weights[0] = 1.0;
        assert!(s.set_probabilities(&weights));
        assert_eq!(s.probabilities()[0], 1.0);
        assert_eq!(s.rtp_estimate(), Some(13.0));
    }

    #[test]
    fn test_set_win_rate() {
        let mut s = session(8);
        let base_chance = s.win_chance(1.0).unwrap();
        s.set_win_rate(Some(50.0), f64::NAN);
        assert_eq!(s.win_rate_target(), Some(0.5));
        assert_eq!(s.win_rate_min_multiplier(), 1.0);
        let chance = s.win_chance(1.0).unwrap();
        assert!((chance - 0.5).abs() < 0.02, "win chance {chance}");
        assert!(chance > base_chance);

        s.set_win_rate(None, 1.0);
        assert_eq!(s.win_rate_target(), None);
        assert!((s.win_chance(1.0).unwrap() - base_chance).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot() {
        let mut s = session(8);
        s.set_win_rate(Some(0.4), 2.0);
        let snap = s.snapshot();
        assert_eq!(snap.rows, 8);
        assert_eq!(snap.box_count, 9);
        assert_eq!(snap.multipliers.len(), 9);
        assert_eq!(snap.win_rate_target, Some(0.4));
        assert_eq!(snap.win_rate_min_multiplier, 2.0);
        assert!(snap.history.is_empty());
        assert!(!snap.is_animating);

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["difficulty"], "medium");
    }

    #[test]
    fn test_prepare_round_target_in_range() {
        let mut s = session(8);
        for _ in 0..500 {
            let plan = s.prepare_round();
            assert!(plan.target_index < 9);
            assert_eq!(plan.test_targets, None);
        }
    }

    #[test]
    fn test_record_round_history_and_reporting() {
        let mut s = session(8);
        let mut drop = s.spawn_drop(4, None);
        assert!(!drop.seeded);
        drop.sim.run_to_end(1.0 / 60.0, 5000);
        let outcome = s.record_round(&drop);
        match outcome.slot {
            Some(slot) => {
                assert_eq!(s.history().latest(), Some(&slot));
                assert_eq!(outcome.reported_value(), slot.value);
                assert!(outcome.landed_slot.is_some());
            }
            None => {
                assert!(s.history().is_empty());
                assert_eq!(outcome.reported_value(), -1.0);
            }
        }
        assert!(!outcome.test_mode);
    }

    #[test]
    fn test_reported_value_test_mode_is_zero() {
        let slot = MultiplierSlot {
            value: 13.0,
            color: 0,
        };
        let outcome = RoundOutcome {
            target_index: 1,
            landed_slot: Some(0),
            slot: Some(slot),
            seed: 1,
            seeded: true,
            test_mode: true,
            steps: 10,
        };
        assert_eq!(outcome.reported_value(), 0.0);
        let void = RoundOutcome {
            slot: None,
            landed_slot: None,
            ..outcome
        };
        assert_eq!(void.reported_value(), -1.0);
    }

    #[test]
    fn test_test_mode_queues_search_on_start() {
        let s = test_mode_session(8);
        assert!(s.is_searching());
        assert_eq!(s.test_mode_key().map(|k| k.to_string()), Some("8:1:7:2".to_string()));
        assert_eq!(s.pool_key(), s.test_mode_key());
    }

    #[test]
    fn test_no_auto_search_when_disabled() {
        let s = PlinkoSession::new(GameSettings {
            rows: 8,
            test_mode: TestModeSettings {
                enabled: true,
                auto_search: false,
                ..TestModeSettings::default()
            },
            ..GameSettings::default()
        });
        assert!(!s.is_searching());
    }

    #[test]
    fn test_pump_search_to_completion() {
        let mut s = test_mode_session(8);
        let mut slices = 0;
        while let Some(status) = s.pump_search(|| 0.0) {
            slices += 1;
            assert_ne!(status, SearchStatus::Cancelled);
        }
        assert_eq!(slices, 1);
        assert!(!s.is_searching());

        // Re-queueing the same key never clears what was found
        let left = s.pools().pool(Side::Left).to_vec();
        s.queue_test_mode_search();
        assert_eq!(s.pools().pool(Side::Left), left.as_slice());
    }

    #[test]
    fn test_row_change_invalidates_pools() {
        let mut s = test_mode_session(8);
        let token = s.search_token();
        assert!(s.set_rows(10.0));
        assert!(s.search_token() > token);
        assert_eq!(s.pool_key().map(|k| k.rows), Some(10));
        assert!(s.pools().pool(Side::Left).is_empty());
        assert!(s.is_searching());
    }

    #[test]
    fn test_set_test_mode_target() {
        let mut plain = session(8);
        plain.set_test_mode_target(3);
        assert_eq!(plain.test_mode().forced_landing_index, 1);

        let mut s = test_mode_session(8);
        s.set_test_mode_target(0);
        assert_eq!(s.test_mode_targets(), Some(TestTargets { left: 0, right: 8 }));
        assert_eq!(s.pool_key().map(|k| (k.left, k.right)), Some((0, 8)));
    }

    #[test]
    fn test_container_resize_relayouts() {
        let mut s = test_mode_session(8);
        let token = s.search_token();
        let before = s.layout().clone();
        s.set_container_size(400.0, 350.0);
        assert!(!Rc::ptr_eq(s.layout(), &before));
        assert_eq!(s.container_size(), (400.0, 350.0));
        assert!(s.search_token() > token);

        // Same size is a no-op
        let token = s.search_token();
        s.set_container_size(400.0, 350.0);
        assert_eq!(s.search_token(), token);
    }

    #[test]
    fn test_seeded_spawn_uses_pick() {
        let mut s = test_mode_session(8);
        let pick = SeedPick {
            seed: 1234,
            target_index: 7,
        };
        let drop = s.spawn_drop(0, Some(pick));
        assert!(drop.seeded);
        assert_eq!(drop.seed, 1234);
        assert_eq!(drop.target_index, 7);
    }
}
