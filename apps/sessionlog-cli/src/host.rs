//! Stand-ins for the host application's renderer and exit hook.

use std::sync::atomic::{AtomicU64, Ordering};

use sessionlog_delivery::{ExitHandle, FrameProbe, FrameSample};
use sessionlog_session::Viewpoint;
use sessionlog_types::snapshot::{Quat, Vec3};
use tokio::sync::mpsc::UnboundedSender;

/// Frame loop whose rate drifts between roughly 20 and 60 fps while the
/// viewer walks along the x axis.
#[derive(Debug, Default)]
pub struct SimulatedFrames {
    tick: AtomicU64,
}

impl FrameProbe for SimulatedFrames {
    fn sample(&self) -> Option<FrameSample> {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        let phase = (tick % 40) as f32;
        let fps = 40.0 + 20.0 * (phase / 40.0 * std::f32::consts::TAU).sin();
        let scene = if (tick / 60) % 2 == 0 { "Main" } else { "Arena" };
        Some(FrameSample {
            fps,
            viewpoint: Some(Viewpoint {
                position: Vec3 {
                    x: tick as f32 * 0.5,
                    y: 0.0,
                    z: 0.0,
                },
                rotation: Quat::IDENTITY,
                scene: scene.into(),
            }),
        })
    }
}

/// Forwards "quit again" requests to the command loop.
pub struct ChannelExit {
    tx: UnboundedSender<()>,
}

impl ChannelExit {
    pub fn new(tx: UnboundedSender<()>) -> Self {
        Self { tx }
    }
}

impl ExitHandle for ChannelExit {
    fn quit(&self) {
        let _ = self.tx.send(());
    }
}
