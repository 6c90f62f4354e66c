//! Frame counting over fixed wall-clock windows.

use tracing::warn;

use crate::clock::FrameScheduler;

/// How many windows `sample_real_fps` waits before giving up on frames.
const DEADLINE_WINDOWS: f64 = 2.0;

/// Counts animation-frame callbacks per window and reports fps.
///
/// A window opens at its anchor timestamp and closes on the first frame at or
/// past `window_ms`; that frame is counted and becomes the next anchor. A frame
/// arriving long after the window ends still closes it, so a page painting
/// less than once per window yields a low sample rather than none. Hidden-page
/// gaps are the caller's concern (see `PageSignals`).
#[derive(Debug, Clone)]
pub struct FrameCounter {
    window_ms: f64,
    anchor: Option<f64>,
    frames: u32,
}

impl FrameCounter {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            anchor: None,
            frames: 0,
        }
    }

    /// Opens a fresh window at `now`.
    pub fn anchor(&mut self, now: f64) {
        self.anchor = Some(now);
        self.frames = 0;
    }

    /// Drops the current window; the next frame becomes the anchor.
    pub fn reset(&mut self) {
        self.anchor = None;
        self.frames = 0;
    }

    /// Feeds one frame timestamp. Returns the window's fps when it closes.
    pub fn record(&mut self, timestamp: f64) -> Option<f64> {
        let Some(anchor) = self.anchor else {
            self.anchor(timestamp);
            return None;
        };

        self.frames += 1;
        let elapsed = timestamp - anchor;
        if elapsed < self.window_ms {
            return None;
        }
        let fps = f64::from(self.frames) * 1000.0 / elapsed;
        self.anchor(timestamp);
        Some(fps)
    }

    /// Closes the window at `now` without a closing frame. Zero when nothing
    /// was counted.
    pub fn close(&mut self, now: f64) -> f64 {
        let fps = match self.anchor {
            Some(anchor) if now > anchor => f64::from(self.frames) * 1000.0 / (now - anchor),
            _ => 0.0,
        };
        self.anchor(now);
        fps
    }
}

/// Counts frames over one window starting now. Reflects whatever else is
/// competing for the main thread, not just draw cost. Resolves within
/// `DEADLINE_WINDOWS` windows even if the host stops delivering frames.
pub async fn sample_real_fps(frames: &dyn FrameScheduler, window_ms: f64) -> f64 {
    let mut counter = FrameCounter::new(window_ms);
    counter.anchor(frames.now_ms());
    let mut deadline = frames.sleep_ms(window_ms * DEADLINE_WINDOWS);
    loop {
        tokio::select! {
            biased;
            () = &mut deadline => {
                let fps = counter.close(frames.now_ms());
                warn!(fps, "No frame closed the sampling window in time");
                return fps;
            }
            timestamp = frames.next_frame() => {
                if let Some(fps) = counter.record(timestamp) {
                    return fps;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::clock::TokioFrameClock;

    fn feed(counter: &mut FrameCounter, period_ms: f64, frames: u32, start: f64) -> Vec<f64> {
        (1..=frames)
            .filter_map(|i| counter.record(start + period_ms * f64::from(i)))
            .collect()
    }

    #[test]
    fn test_first_frame_only_anchors() {
        let mut counter = FrameCounter::new(1000.0);
        assert_eq!(counter.record(5.0), None);
    }

    #[test]
    fn test_steady_sixty_hz() {
        let mut counter = FrameCounter::new(1000.0);
        counter.anchor(0.0);
        let samples = feed(&mut counter, 1000.0 / 60.0, 185, 0.0);
        assert_eq!(samples.len(), 3);
        for fps in samples {
            assert!((fps - 60.0).abs() < 1.0, "fps {fps}");
        }
    }

    #[test]
    fn test_slow_frames_report_low_fps() {
        let mut counter = FrameCounter::new(1000.0);
        counter.anchor(0.0);
        let samples = feed(&mut counter, 50.0, 20, 0.0);
        assert_eq!(samples, vec![20.0]);
    }

    #[test]
    fn test_late_frame_closes_window_with_low_fps() {
        let mut counter = FrameCounter::new(1000.0);
        counter.anchor(0.0);
        assert_eq!(counter.record(500.0), None);
        assert_eq!(counter.record(2500.0), Some(0.8));
        let samples = feed(&mut counter, 100.0, 10, 2500.0);
        assert_eq!(samples, vec![10.0]);
    }

    #[test]
    fn test_sub_one_fps_frames_still_produce_windows() {
        let mut counter = FrameCounter::new(1000.0);
        counter.anchor(0.0);
        let samples = feed(&mut counter, 1200.0, 100, 0.0);
        assert_eq!(samples.len(), 100);
        for fps in samples {
            assert!((fps - 1000.0 / 1200.0).abs() < 1e-9, "fps {fps}");
        }
    }

    #[test]
    fn test_close_without_frames_is_zero() {
        let mut counter = FrameCounter::new(1000.0);
        assert_eq!(counter.close(100.0), 0.0);
        counter.anchor(0.0);
        counter.record(400.0);
        assert_eq!(counter.close(2000.0), 0.5);
    }

    #[test]
    fn test_reset_reanchors_on_next_frame() {
        let mut counter = FrameCounter::new(1000.0);
        counter.anchor(0.0);
        feed(&mut counter, 100.0, 5, 0.0);
        counter.reset();
        assert_eq!(counter.record(600.0), None);
        assert_eq!(feed(&mut counter, 100.0, 10, 600.0), vec![10.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_real_fps_on_tokio_clock() {
        let clock = TokioFrameClock::new(60.0);
        let fps = sample_real_fps(&clock, 1000.0).await;
        assert!((fps - 60.0).abs() < 1.5, "fps {fps}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_real_fps_slow_display() {
        let clock = TokioFrameClock::new(20.0);
        let fps = sample_real_fps(&clock, 1000.0).await;
        assert!((fps - 20.0).abs() < 1.0, "fps {fps}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_real_fps_below_one_fps_resolves() {
        let clock = TokioFrameClock::with_period(Duration::from_millis(1500));
        let fps = tokio::time::timeout(Duration::from_secs(10), sample_real_fps(&clock, 1000.0))
            .await
            .expect("sampler must resolve on a sub-1fps display");
        assert!((fps - 1000.0 / 1500.0).abs() < 0.01, "fps {fps}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sample_real_fps_deadline_without_frames() {
        let clock = TokioFrameClock::with_period(Duration::from_secs(3600));
        let fps = tokio::time::timeout(Duration::from_secs(10), sample_real_fps(&clock, 1000.0))
            .await
            .expect("deadline must fire");
        assert_eq!(fps, 0.0);
    }
}
