//! Browser platform: animation-frame clock and the JS-facing board handle

use std::cell::Cell;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};

use super::FrameClock;
use crate::round::PlinkoGame;
use crate::settings::{Difficulty, GameSettings};

/// Frame clock driven by `requestAnimationFrame`
#[derive(Debug, Default)]
pub struct AnimationFrameClock {
    last_frame_ms: Cell<Option<f64>>,
}

impl AnimationFrameClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameClock for AnimationFrameClock {
    async fn next_frame(&self) -> f64 {
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let scheduled = web_sys::window()
                .map(|window| window.request_animation_frame(&resolve).is_ok())
                .unwrap_or(false);
            if !scheduled {
                let _ = resolve.call0(&JsValue::NULL);
            }
        });
        let timestamp = JsFuture::from(promise)
            .await
            .ok()
            .and_then(|value| value.as_f64())
            .unwrap_or_else(|| self.now_ms());

        match self.last_frame_ms.replace(Some(timestamp)) {
            Some(previous) => ((timestamp - previous) / 1000.0).max(0.0),
            None => 1.0 / 60.0,
        }
    }

    fn now_ms(&self) -> f64 {
        web_sys::window()
            .and_then(|window| window.performance())
            .map(|performance| performance.now())
            .unwrap_or_else(js_sys::Date::now)
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// One Plinko board, exposed to JavaScript
#[wasm_bindgen]
pub struct WebPlinko {
    game: PlinkoGame<AnimationFrameClock>,
}

#[wasm_bindgen]
impl WebPlinko {
    /// Build a board from optional settings JSON
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: Option<String>) -> Result<WebPlinko, JsValue> {
        let settings = match settings_json {
            Some(json) => GameSettings::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => GameSettings::default(),
        };
        let board = Self {
            game: PlinkoGame::new(settings, AnimationFrameClock::new()),
        };
        board.schedule_search();
        Ok(board)
    }

    /// Drive a queued pool search on animation frames in the background
    fn schedule_search(&self) {
        if !self.game.session().is_searching() || self.game.is_search_driven() {
            return;
        }
        let game = self.game.clone();
        spawn_local(async move { game.drive_test_mode_search().await });
    }

    /// Resolves to the landed multiplier, `0` in test mode or `-1` for a void drop
    #[wasm_bindgen(js_name = startRound)]
    pub fn start_round(&self) -> js_sys::Promise {
        let game = self.game.clone();
        let promise =
            future_to_promise(async move { Ok(JsValue::from_f64(game.start_round().await)) });
        self.schedule_search();
        promise
    }

    /// Resolves to the full round outcome as JSON
    #[wasm_bindgen(js_name = playRound)]
    pub fn play_round(&self) -> js_sys::Promise {
        let game = self.game.clone();
        self.schedule_search();
        future_to_promise(async move {
            let outcome = game.play_round().await;
            serde_json::to_string(&outcome)
                .map(|json| JsValue::from_str(&json))
                .map_err(|e| JsValue::from_str(&e.to_string()))
        })
    }

    /// Resolves to whether the test mode pools are full
    #[wasm_bindgen(js_name = fillTestModePools)]
    pub fn fill_test_mode_pools(&self) -> js_sys::Promise {
        let game = self.game.clone();
        future_to_promise(async move { Ok(JsValue::from_bool(game.fill_test_mode_pools().await)) })
    }

    #[wasm_bindgen(js_name = setRows)]
    pub fn set_rows(&self, rows: f64) -> bool {
        let changed = self.game.set_rows(rows);
        self.schedule_search();
        changed
    }

    #[wasm_bindgen(js_name = setDifficulty)]
    pub fn set_difficulty(&self, difficulty: &str) -> bool {
        let changed = self.game.set_difficulty(Difficulty::normalize(difficulty));
        self.schedule_search();
        changed
    }

    #[wasm_bindgen(js_name = setProbabilities)]
    pub fn set_probabilities(&self, weights: Vec<f64>) -> bool {
        self.game.set_probabilities(&weights)
    }

    #[wasm_bindgen(js_name = setWinRate)]
    pub fn set_win_rate(&self, value: Option<f64>, min_multiplier: Option<f64>) {
        self.game.set_win_rate(value, min_multiplier.unwrap_or(1.0));
    }

    #[wasm_bindgen(js_name = getRtpEstimate)]
    pub fn rtp_estimate(&self) -> Option<f64> {
        self.game.rtp_estimate()
    }

    #[wasm_bindgen(js_name = getWinChance)]
    pub fn win_chance(&self, min_multiplier: Option<f64>) -> Option<f64> {
        self.game.win_chance(min_multiplier.unwrap_or(1.0))
    }

    /// Session snapshot as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn state(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.game.state()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = setTestModeTarget)]
    pub fn set_test_mode_target(&self, index: f64) {
        if !index.is_finite() {
            log::warn!("Ignoring non-numeric test mode target");
            return;
        }
        self.game.set_test_mode_target(index.round() as i64);
        self.schedule_search();
    }

    /// Relayout after the host container changed size
    pub fn resize(&self, width: f64, height: f64) {
        self.game.set_container_size(width, height);
        self.schedule_search();
    }
}
