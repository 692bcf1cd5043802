//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Frame scheduling (yield until the next frame)
//! - Monotonic time for search slicing
//! - Seed entropy when no seed is configured

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Host frame scheduler.
///
/// Drops and the seed search suspend on `next_frame` between units of work.
pub trait FrameClock {
    /// Wait for the next frame; resolves to the frame delta in seconds
    fn next_frame(&self) -> impl Future<Output = f64>;

    /// Monotonic wall clock in milliseconds
    fn now_ms(&self) -> f64;
}

/// Future that is pending exactly once, waking itself immediately
#[derive(Debug, Default)]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// Headless clock: every frame is exactly `frame_dt` seconds
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct SteppedClock {
    frame_dt: f64,
    start: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SteppedClock {
    pub fn new(frame_dt: f64) -> Self {
        Self {
            frame_dt,
            start: std::time::Instant::now(),
        }
    }

    pub fn frame_dt(&self) -> f64 {
        self.frame_dt
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for SteppedClock {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl FrameClock for SteppedClock {
    async fn next_frame(&self) -> f64 {
        YieldNow::default().await;
        self.frame_dt
    }

    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Seed for the session RNG when none is configured
#[cfg(not(target_arch = "wasm32"))]
pub fn entropy_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
pub fn entropy_seed() -> u64 {
    js_sys::Date::now() as u64
}
