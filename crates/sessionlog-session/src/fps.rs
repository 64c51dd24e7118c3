//! Windowed FPS extremes.

use sessionlog_types::snapshot::{FpsData, Quat, Vec3};

/// Samples per averaging window.
pub const FPS_WINDOW: usize = 10;
/// Window averages at or below this are treated as stalls, not lows.
pub const FPS_NOISE_FLOOR: f32 = 1.0;

/// Where the viewer is when a window completes.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewpoint {
    pub position: Vec3,
    pub rotation: Quat,
    pub scene: String,
}

impl Viewpoint {
    fn record(&self, avg: f32) -> FpsData {
        FpsData {
            avg,
            position: self.position,
            rotation: self.rotation,
            scene: self.scene.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FpsTracker {
    buffer: Vec<f32>,
    highest_avg: f32,
    lowest_avg: f32,
    highest: Option<FpsData>,
    lowest: Option<FpsData>,
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self {
            buffer: Vec::with_capacity(FPS_WINDOW),
            highest_avg: 0.0,
            lowest_avg: f32::INFINITY,
            highest: None,
            lowest: None,
        }
    }
}

impl FpsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers one instantaneous reading. When the window fills, its mean is
    /// compared against the extremes and returned; the buffer is cleared either
    /// way. Without a viewpoint the completed window is discarded.
    pub fn sample(&mut self, fps: f32, viewpoint: Option<&Viewpoint>) -> Option<f32> {
        if !fps.is_finite() {
            return None;
        }
        self.buffer.push(fps);
        if self.buffer.len() < FPS_WINDOW {
            return None;
        }

        let avg = self.buffer.iter().sum::<f32>() / self.buffer.len() as f32;
        self.buffer.clear();

        if let Some(view) = viewpoint {
            if avg > self.highest_avg {
                self.highest_avg = avg;
                self.highest = Some(view.record(avg));
            }
            if avg > FPS_NOISE_FLOOR && avg < self.lowest_avg {
                self.lowest_avg = avg;
                self.lowest = Some(view.record(avg));
            }
        }
        Some(avg)
    }

    pub fn highest(&self) -> Option<&FpsData> {
        self.highest.as_ref()
    }

    pub fn lowest(&self) -> Option<&FpsData> {
        self.lowest.as_ref()
    }

    pub fn pending_samples(&self) -> usize {
        self.buffer.len()
    }
}
