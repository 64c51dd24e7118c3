//! Long-lived session logger handle owned by the host process.

use std::{
    sync::{Arc, Mutex, PoisonError, Weak},
    time::Duration,
};

use sessionlog_network::SnapshotUploader;
use sessionlog_ops::{session_file_name, session_stamp, LocalStore};
use sessionlog_session::{serialize, ActionRegistry, SerializedSnapshot, SessionAggregator, Viewpoint};
use sessionlog_types::{
    config::{ModeConfig, RunMode, SessionLoggerConfig},
    diagnostics::{Diagnostic, Severity},
    Result,
};
use tokio::{
    sync::{mpsc::UnboundedReceiver, Notify},
    task::JoinHandle,
    time::{interval, interval_at, timeout, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    pipeline::{DeliveryOutcome, DeliveryPipeline},
    shutdown::{ExitDecision, ShutdownCoordinator},
    sweeper::sweep_unsent,
};

pub const FPS_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// One instantaneous frame-rate reading from the host renderer.
#[derive(Debug, Clone)]
pub struct FrameSample {
    pub fps: f32,
    pub viewpoint: Option<Viewpoint>,
}

pub trait FrameProbe: Send + Sync {
    /// `None` when the host has nothing to report this tick.
    fn sample(&self) -> Option<FrameSample>;
}

/// Host hook asking the process to attempt exiting again after a veto.
pub trait ExitHandle: Send + Sync {
    fn quit(&self);
}

/// External collaborators of a session.
pub struct SessionLoggerDeps {
    pub store: LocalStore,
    pub uploader: Option<Arc<dyn SnapshotUploader>>,
    pub frame_probe: Option<Arc<dyn FrameProbe>>,
    pub exit: Arc<dyn ExitHandle>,
    pub diagnostics: Option<UnboundedReceiver<Diagnostic>>,
}

struct Inner {
    session: Mutex<SessionAggregator>,
    pipeline: DeliveryPipeline,
    shutdown: Mutex<ShutdownCoordinator>,
    final_delivery: Notify,
    exit: Arc<dyn ExitHandle>,
    file_name: String,
    stamp: String,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Cloneable handle to the single session of this process.
#[derive(Clone)]
pub struct SessionLogger {
    inner: Arc<Inner>,
}

impl SessionLogger {
    /// Opens the session and spawns its background tasks. Must be called
    /// inside a Tokio runtime.
    pub fn start(config: &SessionLoggerConfig, run_mode: RunMode, deps: SessionLoggerDeps) -> Self {
        let mode = config.mode(run_mode);
        info!(
            "Session logger running in {} mode (save local: {}, send: {}, server: {})",
            run_mode,
            mode.save_local_json,
            mode.send_to_server,
            config.server.url().unwrap_or("<unset>")
        );

        let registry = ActionRegistry::from_names(&config.session.action_names);
        let session = SessionAggregator::initialize(config.app.clone(), registry);
        let started_at = session.started_at();

        let logger = Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                pipeline: DeliveryPipeline::new(mode, deps.store, deps.uploader),
                shutdown: Mutex::new(ShutdownCoordinator::new(config.shutdown.ceiling())),
                final_delivery: Notify::new(),
                exit: deps.exit,
                file_name: session_file_name(started_at),
                stamp: session_stamp(started_at),
                tasks: Mutex::new(Vec::new()),
            }),
        };

        if let Some(rx) = deps.diagnostics {
            logger.track(spawn_diagnostic_drain(Arc::downgrade(&logger.inner), rx));
        }
        if let Some(probe) = deps.frame_probe {
            logger.track(spawn_fps_sampler(Arc::downgrade(&logger.inner), probe));
        }
        if mode.send_to_server {
            let pipeline = logger.inner.pipeline.clone();
            let stamp = logger.inner.stamp.clone();
            logger.track(tokio::spawn(async move {
                sweep_unsent(&pipeline, &stamp).await;
            }));
        }
        if let Some(period) = config.session.periodic_save_interval() {
            info!("Periodic save every {:.1}s", period.as_secs_f32());
            logger.track(spawn_periodic_save(Arc::downgrade(&logger.inner), period));
        }

        logger
    }

    fn track(&self, handle: JoinHandle<()>) {
        lock(&self.inner.tasks).push(handle);
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut SessionAggregator) -> R) -> R {
        f(&mut lock(&self.inner.session))
    }

    pub fn mode(&self) -> ModeConfig {
        self.inner.pipeline.mode()
    }

    /// Local file name for this session's snapshots.
    pub fn file_name(&self) -> &str {
        &self.inner.file_name
    }

    pub fn record_event(&self, name: &str) {
        self.with_session(|s| s.record_event(name));
    }

    pub fn record_custom_event(&self, name: &str, value: &str, overwrite: bool) {
        self.with_session(|s| s.record_custom_event(name, value, overwrite));
    }

    pub fn record_log(&self, kind: &str, message: &str) {
        self.with_session(|s| s.record_log(kind, message));
    }

    pub fn capture_diagnostic(&self, severity: Severity, text: &str, trace: &str) {
        self.with_session(|s| s.capture_diagnostic(severity, text, trace));
    }

    /// Name of the declared action at `position`, for hosts that pick
    /// predefined events by index.
    pub fn action_at(&self, position: usize) -> Option<String> {
        self.with_session(|s| s.registry().name_at(position).map(str::to_owned))
    }

    pub fn snapshot(&self) -> Result<SerializedSnapshot> {
        self.with_session(|s| serialize(s))
    }

    /// Runs one delivery attempt to completion.
    pub async fn deliver_now(&self) -> DeliveryOutcome {
        if !self.mode().is_active() {
            return DeliveryOutcome::Disabled;
        }
        let json = match self.snapshot() {
            Ok(serialized) => serialized.json,
            Err(err) => {
                error!("Failed to serialize session snapshot: {err}");
                return DeliveryOutcome::EncodeFailed;
            }
        };
        self.inner
            .pipeline
            .deliver(json, &self.inner.file_name)
            .await
    }

    /// Fire-and-forget delivery.
    pub fn save_and_send(&self) {
        if !self.mode().is_active() {
            info!("Neither saving nor sending is enabled for this mode; skipping");
            return;
        }
        let logger = self.clone();
        tokio::spawn(async move {
            logger.deliver_now().await;
        });
    }

    /// Delivery reporting its result through `on_complete`.
    pub fn save_and_send_with_callback<F>(&self, on_complete: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let logger = self.clone();
        tokio::spawn(async move {
            let outcome = logger.deliver_now().await;
            on_complete(outcome.succeeded());
        });
    }

    /// The host's "about to exit" check. Returns whether exiting may proceed
    /// now. While a final delivery is pending the logger calls
    /// [`ExitHandle::quit`] once it completes or the ceiling passes.
    pub fn handle_exit_request(&self) -> bool {
        let decision = lock(&self.inner.shutdown).request_exit(Instant::now(), self.mode());
        match decision {
            ExitDecision::DeliverAndVeto => self.begin_final_delivery(),
            ExitDecision::SaveAndAllow => self.save_now(),
            ExitDecision::Allow | ExitDecision::Veto => {}
        }
        decision.allows_exit()
    }

    fn save_now(&self) {
        match self.snapshot() {
            Ok(serialized) => {
                self.inner
                    .pipeline
                    .save_local(&serialized.json, &self.inner.file_name);
            }
            Err(err) => error!("Failed to serialize session snapshot: {err}"),
        }
    }

    fn begin_final_delivery(&self) {
        let logger = self.clone();
        tokio::spawn(async move {
            let outcome = logger.deliver_now().await;
            info!(
                "Final session delivery finished: {}",
                if outcome.succeeded() { "success" } else { "failed" }
            );
            lock(&logger.inner.shutdown).mark_delivered();
            logger.inner.final_delivery.notify_one();
        });

        let inner = Arc::clone(&self.inner);
        let ceiling = lock(&inner.shutdown).ceiling();
        tokio::spawn(async move {
            info!("Waiting up to {:.1}s for the session log to be sent", ceiling.as_secs_f32());
            if timeout(ceiling, inner.final_delivery.notified()).await.is_err() {
                warn!(
                    "Session log sending timed out after {:.1}s; proceeding with exit",
                    ceiling.as_secs_f32()
                );
            }
            inner.exit.quit();
        });
    }

    /// Stops sampling, periodic saving and diagnostic capture. In-flight
    /// deliveries keep running.
    pub fn shutdown(&self) {
        let handles: Vec<_> = lock(&self.inner.tasks).drain(..).collect();
        debug!("Stopping {} session tasks", handles.len());
        for handle in handles {
            handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn spawn_fps_sampler(inner: Weak<Inner>, probe: Arc<dyn FrameProbe>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(FPS_SAMPLE_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else { break };
            if let Some(sample) = probe.sample() {
                lock(&inner.session).sample_fps(sample.fps, sample.viewpoint.as_ref());
            }
        }
    })
}

fn spawn_periodic_save(inner: Weak<Inner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else { break };
            debug!("Performing periodic save");
            SessionLogger { inner }.save_and_send();
        }
    })
}

fn spawn_diagnostic_drain(
    inner: Weak<Inner>,
    mut rx: UnboundedReceiver<Diagnostic>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(diagnostic) = rx.recv().await {
            let Some(inner) = inner.upgrade() else { break };
            lock(&inner.session).capture_diagnostic(
                diagnostic.severity,
                &diagnostic.message,
                &diagnostic.trace,
            );
        }
    })
}
