//! Time sources: an epoch wall clock for cache timestamps and an
//! animation-frame scheduler for every fps measurement.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;

/// Epoch-millisecond wall clock.
pub trait WallClock {
    fn now_epoch_ms(&self) -> i64;
}

/// Uses the system clock (`Date.now()` under wasm via chrono's wasmbind).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for deterministic expiry checks.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<i64>,
}

impl ManualClock {
    pub fn at(now_ms: i64) -> Self {
        Self {
            now_ms: Cell::new(now_ms),
        }
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now_ms.set(self.now_ms.get() + delta);
    }

    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.set(now_ms);
    }
}

impl WallClock for ManualClock {
    fn now_epoch_ms(&self) -> i64 {
        self.now_ms.get()
    }
}

impl<T: WallClock + ?Sized> WallClock for Rc<T> {
    fn now_epoch_ms(&self) -> i64 {
        (**self).now_epoch_ms()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Animation-frame scheduling
// ────────────────────────────────────────────────────────────────────────────

/// The `requestAnimationFrame` primitive plus its monotonic time base.
///
/// Several callers may await `next_frame` at once; all of them resume on the
/// same frame, exactly like multiple rAF callbacks registered in one tick.
#[async_trait(?Send)]
pub trait FrameScheduler {
    /// Suspends until the next paint opportunity; returns its timestamp in ms.
    async fn next_frame(&self) -> f64;

    /// Monotonic milliseconds (`performance.now()`).
    fn now_ms(&self) -> f64;

    /// Plain timer sleep, independent of paint (`setTimeout`).
    async fn sleep_ms(&self, ms: f64);
}

#[async_trait(?Send)]
impl<T: FrameScheduler + ?Sized> FrameScheduler for Rc<T> {
    async fn next_frame(&self) -> f64 {
        (**self).next_frame().await
    }

    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }

    async fn sleep_ms(&self, ms: f64) {
        (**self).sleep_ms(ms).await
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::TokioFrameClock;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::cell::Cell;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::FrameScheduler;

    /// Vsync emulation on the tokio timer. Frames land on a fixed grid of
    /// `period` spaced ticks; a caller that arrives late waits for the next
    /// grid point, as a browser would. The period can be changed at runtime
    /// to emulate a page that starts dropping frames.
    #[derive(Debug)]
    pub struct TokioFrameClock {
        origin: Instant,
        last_frame: Cell<Instant>,
        period: Cell<Duration>,
        frames_delivered: Cell<u64>,
    }

    impl TokioFrameClock {
        pub fn new(refresh_hz: f64) -> Self {
            Self::with_period(Duration::from_secs_f64(1.0 / refresh_hz.max(1.0)))
        }

        pub fn with_period(period: Duration) -> Self {
            let origin = Instant::now();
            Self {
                origin,
                last_frame: Cell::new(origin),
                period: Cell::new(period.max(Duration::from_micros(100))),
                frames_delivered: Cell::new(0),
            }
        }

        pub fn set_refresh_hz(&self, refresh_hz: f64) {
            self.set_period(Duration::from_secs_f64(1.0 / refresh_hz.max(1.0)));
        }

        pub fn set_period(&self, period: Duration) {
            self.period.set(period.max(Duration::from_micros(100)));
        }

        /// Total frame wake-ups handed out, across all callers.
        pub fn frames_delivered(&self) -> u64 {
            self.frames_delivered.get()
        }

        fn next_deadline(&self, now: Instant) -> Instant {
            let period = self.period.get();
            let deadline = self.last_frame.get() + period;
            if deadline > now {
                return deadline;
            }
            let late = now.duration_since(deadline);
            let skipped = late.as_nanos() / period.as_nanos() + 1;
            deadline + period * u32::try_from(skipped).unwrap_or(u32::MAX)
        }
    }

    impl Default for TokioFrameClock {
        fn default() -> Self {
            Self::new(60.0)
        }
    }

    #[async_trait(?Send)]
    impl FrameScheduler for TokioFrameClock {
        async fn next_frame(&self) -> f64 {
            let deadline = self.next_deadline(Instant::now());
            tokio::time::sleep_until(deadline).await;
            if deadline > self.last_frame.get() {
                self.last_frame.set(deadline);
            }
            self.frames_delivered.set(self.frames_delivered.get() + 1);
            self.now_ms()
        }

        fn now_ms(&self) -> f64 {
            self.origin.elapsed().as_secs_f64() * 1000.0
        }

        async fn sleep_ms(&self, ms: f64) {
            tokio::time::sleep(Duration::from_secs_f64(ms.max(0.0) / 1000.0)).await;
        }
    }
}
