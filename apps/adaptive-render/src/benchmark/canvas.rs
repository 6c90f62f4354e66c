//! Synthetic off-DOM canvas draw-rate test.

use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::clock::FrameScheduler;
use crate::config::SyntheticConfig;
use crate::errors::BenchmarkError;

const POSITION_SEED: u64 = 0x5EED_CA1F;

/// The 2-D drawing surface the workload needs.
pub trait Canvas2d {
    fn fill_rect(&mut self, color: &str, x: f64, y: f64, width: f64, height: f64);
}

/// Allocates off-DOM canvases. Fails when the host has no usable 2-D canvas.
pub trait CanvasFactory {
    fn create_canvas(&self, width: u32, height: u32) -> Result<Box<dyn Canvas2d>, BenchmarkError>;
}

/// Counts draw calls; the native stand-in for a real canvas.
#[derive(Debug)]
pub struct MemoryCanvas {
    width: u32,
    height: u32,
    draws: Rc<Cell<u64>>,
}

impl MemoryCanvas {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Canvas2d for MemoryCanvas {
    fn fill_rect(&mut self, _color: &str, _x: f64, _y: f64, _width: f64, _height: f64) {
        self.draws.set(self.draws.get() + 1);
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCanvasFactory {
    unavailable: bool,
    created: Rc<Cell<u32>>,
    draws: Rc<Cell<u64>>,
}

impl MemoryCanvasFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host without canvas support.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn canvases_created(&self) -> u32 {
        self.created.get()
    }

    pub fn draw_calls(&self) -> u64 {
        self.draws.get()
    }
}

impl CanvasFactory for MemoryCanvasFactory {
    fn create_canvas(&self, width: u32, height: u32) -> Result<Box<dyn Canvas2d>, BenchmarkError> {
        if self.unavailable {
            return Err(BenchmarkError::CanvasUnavailable);
        }
        self.created.set(self.created.get() + 1);
        Ok(Box::new(MemoryCanvas {
            width,
            height,
            draws: Rc::clone(&self.draws),
        }))
    }
}

fn rect_color(frame: u32, index: u32) -> String {
    let red = (frame.wrapping_mul(7).wrapping_add(index.wrapping_mul(13))) % 255;
    format!("rgba({red}, 120, 200, 0.4)")
}

/// Draws `rects_per_frame` rects on every animation frame for the configured
/// duration and returns completed frames per second, capped at the ceiling.
pub async fn synthetic_fps(
    frames: &dyn FrameScheduler,
    canvas: &mut dyn Canvas2d,
    config: &SyntheticConfig,
) -> f64 {
    let mut rng = SmallRng::seed_from_u64(POSITION_SEED);
    let max_x = (f64::from(config.canvas_width) - config.rect_size).max(0.0);
    let max_y = (f64::from(config.canvas_height) - config.rect_size).max(0.0);

    let start = frames.now_ms();
    let mut completed: u32 = 0;
    loop {
        let timestamp = frames.next_frame().await;
        if timestamp - start >= config.duration_ms {
            break;
        }
        for i in 0..config.rects_per_frame {
            let x = rng.gen::<f64>() * max_x;
            let y = rng.gen::<f64>() * max_y;
            canvas.fill_rect(&rect_color(completed, i), x, y, config.rect_size, config.rect_size);
        }
        completed += 1;
    }

    let fps = f64::from(completed) * 1000.0 / config.duration_ms;
    fps.min(config.fps_ceiling)
}
