//! Single-thread scalar throughput proxy.

use std::hint::black_box;

use crate::clock::FrameScheduler;

/// Runs `iterations` square-root accumulations and returns the elapsed
/// milliseconds. Synchronous on purpose: the loop must run uninterrupted.
pub fn measure_cpu_ms(clock: &dyn FrameScheduler, iterations: u32) -> f64 {
    let start = clock.now_ms();
    let mut acc = 0.0_f64;
    for i in 0..iterations {
        acc += black_box(f64::from(i) + 0.5).sqrt();
    }
    black_box(acc);
    (clock.now_ms() - start).max(0.0)
}
