use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    config::TrackerConfig,
    engine::{FocusEngine, FocusSnapshot},
    metrics::{MetricsCollector, MetricsSnapshot},
    persistence::{PersistenceBridge, SnapshotStore, SyncBackend, SyncOutcome},
    sensing::{FrameLoopContext, LandmarkSource, SensingController},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

struct RunningTasks {
    cancel_token: CancellationToken,
    ticker: JoinHandle<()>,
    persistence: JoinHandle<()>,
}

/// Runs a tracking session: the frame loop, the timer tick and the
/// persistence schedule, all stopped together.
pub struct TrackingController<S, B> {
    engine: Arc<Mutex<FocusEngine>>,
    bridge: Arc<PersistenceBridge<S, B>>,
    clock: Arc<dyn Clock>,
    metrics: MetricsCollector,
    sensing: Arc<Mutex<SensingController>>,
    tasks: Arc<Mutex<Option<RunningTasks>>>,
    final_snapshot: Arc<Mutex<Option<FocusSnapshot>>>,
    source_finished: Arc<watch::Sender<bool>>,
    config: TrackerConfig,
}

impl<S, B> Clone for TrackingController<S, B> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            bridge: self.bridge.clone(),
            clock: self.clock.clone(),
            metrics: self.metrics.clone(),
            sensing: self.sensing.clone(),
            tasks: self.tasks.clone(),
            final_snapshot: self.final_snapshot.clone(),
            source_finished: self.source_finished.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: SnapshotStore, B: SyncBackend> TrackingController<S, B> {
    pub fn new(config: TrackerConfig, store: S, backend: B, clock: Arc<dyn Clock>) -> Result<Self> {
        let engine = FocusEngine::new(config.clone())?;
        let bridge = PersistenceBridge::new(store, backend, config.staleness_ms());
        let (source_finished, _) = watch::channel(false);

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            bridge: Arc::new(bridge),
            clock,
            metrics: MetricsCollector::new(),
            sensing: Arc::new(Mutex::new(SensingController::new())),
            tasks: Arc::new(Mutex::new(None)),
            final_snapshot: Arc::new(Mutex::new(None)),
            source_finished: Arc::new(source_finished),
            config,
        })
    }

    pub fn bridge(&self) -> &PersistenceBridge<S, B> {
        &self.bridge
    }

    pub async fn is_running(&self) -> bool {
        self.tasks.lock().await.is_some()
    }

    /// Starts tracking `module_id` from `source`.
    ///
    /// With `restore_if_available`, a fresh local snapshot for the module
    /// seeds the session totals.
    pub async fn start<L: LandmarkSource>(
        &self,
        module_id: &str,
        section_id: Option<String>,
        restore_if_available: bool,
        source: L,
    ) -> Result<FocusSnapshot> {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_some() {
            bail!("tracking already active");
        }

        let now = self.clock.now_ms();
        let restored = if restore_if_available {
            self.bridge.restore_from_local_store(module_id, now).await
        } else {
            None
        };

        let snapshot = {
            let mut engine = self.engine.lock().await;
            engine.start(module_id, section_id, restored.as_ref(), now)?;
            engine.snapshot()
        };

        self.metrics.reset().await;
        *self.final_snapshot.lock().await = None;
        self.source_finished.send_replace(false);

        let cancel_token = CancellationToken::new();
        let context = FrameLoopContext {
            engine: self.engine.clone(),
            clock: self.clock.clone(),
            metrics: self.metrics.clone(),
            cadence: Duration::from_millis(self.config.frame_cadence_ms),
            finished_tx: self.source_finished.clone(),
        };
        self.sensing
            .lock()
            .await
            .start_sensing(source, context, cancel_token.clone())?;

        let ticker = tokio::spawn(timer_tick_loop(
            self.engine.clone(),
            self.clock.clone(),
            Duration::from_millis(self.config.timer_tick_ms),
            cancel_token.clone(),
        ));
        let persistence = tokio::spawn(persistence_loop(
            self.engine.clone(),
            self.bridge.clone(),
            self.clock.clone(),
            self.metrics.clone(),
            PersistenceSchedule::from_config(&self.config),
            cancel_token.clone(),
        ));

        *tasks = Some(RunningTasks {
            cancel_token,
            ticker,
            persistence,
        });
        Ok(snapshot)
    }

    /// Current totals, ticked to the clock's present.
    pub async fn get_snapshot(&self) -> FocusSnapshot {
        let mut engine = self.engine.lock().await;
        engine.tick(self.clock.now_ms());
        engine.snapshot()
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        self.metrics.get_snapshot().await
    }

    /// Resolves once the landmark source has run dry.
    pub async fn wait_for_source(&self) {
        let mut finished = self.source_finished.subscribe();
        let _ = finished.wait_for(|done| *done).await;
    }

    /// Stops every loop, closes the session out and pushes the final totals.
    ///
    /// Safe to call repeatedly: once stopped, the final snapshot is returned
    /// again without side effects. A `start()` issued meanwhile waits until
    /// the close-out is done.
    pub async fn stop(&self) -> Result<FocusSnapshot> {
        // held until close-out finishes so a concurrent start waits for it
        let mut running = self.tasks.lock().await;
        let Some(tasks) = running.take() else {
            if let Some(snapshot) = self.final_snapshot.lock().await.clone() {
                return Ok(snapshot);
            }
            return Ok(self.engine.lock().await.snapshot());
        };

        tasks.cancel_token.cancel();
        let sensing_result = self.sensing.lock().await.stop_sensing().await;
        let ticker_result = tasks.ticker.await.context("timer tick task failed to join");
        let persistence_result = tasks
            .persistence
            .await
            .context("persistence task failed to join");

        let now = self.clock.now_ms();
        let (snapshot, payload) = {
            let mut engine = self.engine.lock().await;
            let snapshot = engine.stop(now);
            (snapshot, engine.sync_payload(now))
        };

        if let Some(module_id) = snapshot.module_id.as_deref() {
            self.bridge.clear_local_store(module_id).await;
        }

        if let Some(payload) = payload {
            let timeout = Duration::from_secs(self.config.backend.timeout_secs);
            let outcome = match time::timeout(timeout, self.bridge.sync_to_backend(&payload)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    log_warn!("final backend sync timed out after {}s", timeout.as_secs());
                    SyncOutcome::Failed
                }
            };
            self.metrics.record_sync(outcome).await;
        }

        *self.final_snapshot.lock().await = Some(snapshot.clone());
        drop(running);

        for result in [sensing_result, ticker_result, persistence_result] {
            if let Err(err) = result {
                log_error!("tracking task ended abnormally: {err:#}");
                return Err(err.context("tracking stopped with a failed worker"));
            }
        }
        Ok(snapshot)
    }
}

async fn timer_tick_loop(
    engine: Arc<Mutex<FocusEngine>>,
    clock: Arc<dyn Clock>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                engine.lock().await.tick(clock.now_ms());
            }
            _ = cancel_token.cancelled() => break,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PersistenceSchedule {
    local_snapshot: Duration,
    backend_sync: Duration,
}

impl PersistenceSchedule {
    fn from_config(config: &TrackerConfig) -> Self {
        Self {
            local_snapshot: Duration::from_millis(config.local_snapshot_interval_ms),
            backend_sync: Duration::from_millis(config.backend_sync_interval_ms),
        }
    }
}

async fn persistence_loop<S: SnapshotStore, B: SyncBackend>(
    engine: Arc<Mutex<FocusEngine>>,
    bridge: Arc<PersistenceBridge<S, B>>,
    clock: Arc<dyn Clock>,
    metrics: MetricsCollector,
    schedule: PersistenceSchedule,
    cancel_token: CancellationToken,
) {
    // first firing one full period after start
    let start = Instant::now();
    let mut local_ticker = time::interval_at(start + schedule.local_snapshot, schedule.local_snapshot);
    local_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sync_ticker = time::interval_at(start + schedule.backend_sync, schedule.backend_sync);
    sync_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = local_ticker.tick() => {
                let snapshot = engine.lock().await.session_snapshot(clock.now_ms());
                if let Some(snapshot) = snapshot {
                    let written = bridge.snapshot_to_local_store(&snapshot).await;
                    metrics.record_local_snapshot(written).await;
                }
            }
            _ = sync_ticker.tick() => {
                let payload = engine.lock().await.sync_payload(clock.now_ms());
                if let Some(payload) = payload {
                    let outcome = bridge.sync_to_backend(&payload).await;
                    log_debug!("periodic backend sync: {outcome:?}");
                    metrics.record_sync(outcome).await;
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("persistence loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        landmarks::fixtures::FrameSpec,
        persistence::{
            bridge::test_support::{BrokenStore, RecordingBackend},
            snapshot_key, MemoryStore, SessionSnapshot,
        },
        sensing::{ChannelSource, ReplaySource},
        timer::TimerStatus,
    };

    const START_MS: i64 = 1_700_000_000_000;

    fn test_config() -> TrackerConfig {
        let mut config = TrackerConfig::default();
        config.frame_cadence_ms = 10;
        config.timer_tick_ms = 10;
        config.local_snapshot_interval_ms = 50;
        config.backend_sync_interval_ms = 200;
        config.backend.timeout_secs = 1;
        config
    }

    fn controller(
        store: MemoryStore,
        backend: RecordingBackend,
    ) -> (TrackingController<MemoryStore, RecordingBackend>, ManualClock) {
        let clock = ManualClock::new(START_MS);
        let controller = TrackingController::new(test_config(), store, backend, Arc::new(clock.clone())).unwrap();
        (controller, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_focus_and_syncs_on_stop() {
        let store = MemoryStore::new();
        let backend = RecordingBackend::default();
        let (controller, clock) = controller(store.clone(), backend.clone());

        let (frames, source) = ChannelSource::channel();
        controller.start("7", Some("intro".into()), false, source).await.unwrap();
        for _ in 0..5 {
            frames.send_landmarks(FrameSpec::default().build()).unwrap();
        }
        time::sleep(Duration::from_millis(100)).await;
        assert!(controller.get_snapshot().await.focused);

        clock.advance(10_000);
        let live = controller.get_snapshot().await;
        assert_eq!(live.focused_time_sec, 10.0);
        assert_eq!(live.unfocused_time_sec, 0.0);

        let final_snapshot = controller.stop().await.unwrap();
        assert_eq!(final_snapshot.status, TimerStatus::Stopped);
        assert_eq!(final_snapshot.session_time_sec, 10.0);
        assert_eq!(final_snapshot.focus_percentage, 100.0);
        assert!(!controller.is_running().await);

        let payloads = backend.payloads.lock().await;
        let last = payloads.last().unwrap();
        assert_eq!(last.module_id, "7");
        assert_eq!(last.section_id.as_deref(), Some("intro"));
        assert_eq!(last.focused_time_sec, 10.0);
        assert!(store.read(&snapshot_key("7")).await.unwrap().is_none());

        let metrics = controller.metrics().await;
        assert_eq!(metrics.frames_processed, 5);
        assert_eq!(metrics.transitions, 1);
        assert!(metrics.skipped_cycles > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected_and_stop_is_idempotent() {
        let backend = RecordingBackend::default();
        let (controller, clock) = controller(MemoryStore::new(), backend.clone());

        let (_frames, source) = ChannelSource::channel();
        controller.start("1", None, false, source).await.unwrap();
        let (_other, second) = ChannelSource::channel();
        let err = controller.start("1", None, false, second).await.unwrap_err();
        assert!(err.to_string().contains("tracking already active"));

        clock.advance(3_000);
        let first = controller.stop().await.unwrap();
        clock.advance(3_000);
        let second = controller.stop().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.unfocused_time_sec, 3.0);
        assert_eq!(backend.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_during_stop_waits_for_close_out() {
        let store = MemoryStore::new();
        let backend = RecordingBackend::default();
        let (controller, clock) = controller(store.clone(), backend.clone());

        let (_frames, source) = ChannelSource::channel();
        controller.start("3", None, false, source).await.unwrap();
        clock.advance(4_000);

        let other = controller.clone();
        let (_next_frames, next_source) = ChannelSource::channel();
        let (stopped, restarted) = tokio::join!(
            controller.stop(),
            other.start("4", None, false, next_source)
        );

        assert_eq!(stopped.unwrap().unfocused_time_sec, 4.0);
        let restarted = restarted.unwrap();
        assert_eq!(restarted.module_id.as_deref(), Some("4"));
        assert_eq!(restarted.session_time_sec, 0.0);
        assert!(controller.is_running().await);

        // the old session's final sync lands before the new session's reset
        assert_eq!(backend.attempts(), 1);
        assert_eq!(controller.metrics().await.backend_syncs, 0);

        clock.advance(1_000);
        let last = controller.stop().await.unwrap();
        assert_eq!(last.module_id.as_deref(), Some("4"));
        assert_eq!(last.session_time_sec, 1.0);
        assert_eq!(controller.metrics().await.backend_syncs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restores_a_fresh_local_snapshot() {
        let store = MemoryStore::new();
        let stored = SessionSnapshot {
            module_id: "22".into(),
            session_time_sec: 120.0,
            focused_time_sec: 80.0,
            unfocused_time_sec: 40.0,
            saved_at_ts: START_MS - 60_000,
        };
        store
            .write(&snapshot_key("22"), serde_json::to_string(&stored).unwrap())
            .await
            .unwrap();

        let (controller, clock) = controller(store, RecordingBackend::default());
        let (_frames, source) = ChannelSource::channel();
        let started = controller.start("22", None, true, source).await.unwrap();
        assert_eq!(started.session_time_sec, 120.0);
        assert_eq!(started.focused_time_sec, 80.0);

        clock.advance(5_000);
        let live = controller.get_snapshot().await;
        assert_eq!(live.session_time_sec, 125.0);
        assert_eq!(live.unfocused_time_sec, 45.0);
        controller.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn writes_local_snapshots_periodically() {
        let store = MemoryStore::new();
        let (controller, clock) = controller(store.clone(), RecordingBackend::default());
        let (_frames, source) = ChannelSource::channel();
        controller.start("9", None, false, source).await.unwrap();

        clock.advance(2_000);
        time::sleep(Duration::from_millis(60)).await;

        let raw = store.read(&snapshot_key("9")).await.unwrap().unwrap();
        let saved: SessionSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.session_time_sec, 2.0);
        assert_eq!(saved.saved_at_ts, START_MS + 2_000);
        controller.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failures_do_not_interrupt_tracking() {
        let backend = RecordingBackend::failing();
        let (controller, clock) = controller(MemoryStore::new(), backend.clone());
        let (frames, source) = ChannelSource::channel();
        controller.start("4", None, false, source).await.unwrap();

        time::sleep(Duration::from_millis(450)).await;
        frames.send_no_face().unwrap();
        time::sleep(Duration::from_millis(20)).await;
        clock.advance(1_000);

        let metrics = controller.metrics().await;
        assert_eq!(metrics.backend_sync_failures, 2);
        assert_eq!(metrics.no_face_frames, 1);
        assert!(controller.is_running().await);

        controller.stop().await.unwrap();
        assert_eq!(controller.metrics().await.backend_sync_failures, 3);
        assert_eq!(backend.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn broken_local_store_is_counted_not_fatal() {
        let clock = ManualClock::new(START_MS);
        let controller =
            TrackingController::new(test_config(), BrokenStore, RecordingBackend::default(), Arc::new(clock)).unwrap();
        let (_frames, source) = ChannelSource::channel();
        controller.start("5", None, true, source).await.unwrap();

        time::sleep(Duration::from_millis(120)).await;
        assert_eq!(controller.metrics().await.local_snapshot_failures, 2);
        controller.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn replay_runs_to_the_end_of_the_recording() {
        let (controller, _clock) = controller(MemoryStore::new(), RecordingBackend::default());
        let frame = serde_json::to_string(&FrameSpec::default().build()).unwrap();
        let mut recording = String::new();
        for _ in 0..6 {
            recording.push_str(&format!("{{\"landmarks\": {frame}}}\n"));
        }
        recording.push_str("{\"landmarks\": null}\n");
        let source = ReplaySource::from_reader(recording.as_bytes()).unwrap();

        controller.start("8", None, false, source).await.unwrap();
        controller.wait_for_source().await;

        let metrics = controller.metrics().await;
        assert_eq!(metrics.frames_processed, 7);
        assert_eq!(metrics.no_face_frames, 1);
        assert_eq!(controller.stop().await.unwrap().frames_processed, 7);
    }
}
