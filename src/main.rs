//! Plinko Drop entry point
//!
//! Native: plays rounds headlessly and prints a JSON summary.
//! Usage: `plinko-drop [settings.json] [rounds]`
//!
//! On wasm the library's `WebPlinko` handle is the entry point.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use plinko_drop::{GameSettings, PlinkoGame, SteppedClock};
    use serde::Serialize;

    const DEFAULT_ROUNDS: u64 = 1000;

    /// Landing statistics over a batch of rounds
    #[derive(Debug, Serialize)]
    struct Summary {
        rows: u32,
        difficulty: &'static str,
        test_mode: bool,
        rounds: u64,
        voids: u64,
        seeded: u64,
        slot_counts: Vec<u64>,
        landing_frequencies: Vec<f64>,
        base_probabilities: Vec<f64>,
        target_probabilities: Vec<f64>,
        /// Mean multiplier over landed rounds
        mean_multiplier: Option<f64>,
        rtp_estimate: Option<f64>,
    }

    fn parse_args() -> Result<(GameSettings, u64), String> {
        let mut settings = GameSettings::default();
        let mut rounds = DEFAULT_ROUNDS;
        for arg in std::env::args().skip(1) {
            if let Ok(n) = arg.parse::<u64>() {
                rounds = n;
            } else {
                settings = GameSettings::load(&arg).map_err(|e| format!("{arg}: {e}"))?;
            }
        }
        Ok((settings, rounds))
    }

    pub fn run() -> Result<(), String> {
        let (settings, rounds) = parse_args()?;
        let game = PlinkoGame::new(settings, SteppedClock::default());
        log::info!("Playing {} rounds", rounds);

        let box_count = game.session().box_count();
        let mut slot_counts = vec![0u64; box_count];
        let mut voids = 0;
        let mut seeded = 0;
        let mut total_multiplier = 0.0;

        for _ in 0..rounds {
            let outcome = pollster::block_on(game.play_round());
            if outcome.seeded {
                seeded += 1;
            }
            match (outcome.landed_slot, outcome.slot) {
                (Some(index), Some(slot)) => {
                    slot_counts[index] += 1;
                    total_multiplier += slot.value;
                }
                _ => voids += 1,
            }
        }

        let landed = rounds - voids;
        let session = game.session();
        let summary = Summary {
            rows: session.rows(),
            difficulty: session.difficulty().as_str(),
            test_mode: session.test_mode().enabled,
            rounds,
            voids,
            seeded,
            landing_frequencies: slot_counts
                .iter()
                .map(|&c| if landed > 0 { c as f64 / landed as f64 } else { 0.0 })
                .collect(),
            slot_counts,
            base_probabilities: session.base_probabilities().to_vec(),
            target_probabilities: session.probabilities().to_vec(),
            mean_multiplier: (landed > 0).then(|| total_multiplier / landed as f64),
            rtp_estimate: session.rtp_estimate(),
        };

        let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{json}");
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Plinko Drop (native) starting...");

    if let Err(e) = cli::run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is the library's start hook, this is just to satisfy the compiler
}
