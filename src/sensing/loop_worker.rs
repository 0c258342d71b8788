use std::sync::Arc;

use tokio::{
    sync::{watch, Mutex},
    time::{Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{clock::Clock, engine::FocusEngine, metrics::MetricsCollector};

use super::source::{Detection, LandmarkSource};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Everything the frame loop touches besides its source.
pub struct FrameLoopContext {
    pub engine: Arc<Mutex<FocusEngine>>,
    pub clock: Arc<dyn Clock>,
    pub metrics: MetricsCollector,
    pub cadence: Duration,
    /// Flipped to true once the source reports [`Detection::Finished`]
    pub finished_tx: Arc<watch::Sender<bool>>,
}

/// Polls `source` once per cadence tick and feeds the engine.
pub async fn frame_loop<S: LandmarkSource>(
    mut source: S,
    context: FrameLoopContext,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(context.cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !process_cycle(&mut source, &context).await {
                    log_info!("landmark source finished; frame loop idle until stop");
                    context.finished_tx.send_replace(true);
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("frame loop shutting down");
                break;
            }
        }
    }
}

/// Returns false once the source is exhausted.
async fn process_cycle<S: LandmarkSource>(source: &mut S, context: &FrameLoopContext) -> bool {
    let frame = match source.next_detection().await {
        Ok(Detection::Landmarks(frame)) => Some(frame),
        Ok(Detection::NoFace) => None,
        Ok(Detection::Pending) => {
            context.metrics.record_skipped_cycle().await;
            return true;
        }
        Ok(Detection::Finished) => return false,
        Err(err) => {
            log_warn!("landmark source failed, skipping cycle: {err:#}");
            context.metrics.record_skipped_cycle().await;
            return true;
        }
    };

    let outcome = {
        let mut engine = context.engine.lock().await;
        engine.process_landmark_frame(frame.as_ref(), context.clock.now_ms())
    };

    match outcome {
        Some(outcome) => context.metrics.record_frame(&outcome).await,
        None => log_debug!("frame arrived while no session is running"),
    }
    true
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use anyhow::{anyhow, Result};

    use super::*;
    use crate::{
        clock::ManualClock,
        config::TrackerConfig,
        landmarks::{fixtures::FrameSpec, LandmarkFrame},
    };

    /// Fails on every other poll, otherwise reports a centred face.
    struct FlakySource {
        polls: usize,
        frame: LandmarkFrame,
    }

    impl LandmarkSource for FlakySource {
        fn next_detection(&mut self) -> impl Future<Output = Result<Detection>> + Send {
            self.polls += 1;
            let result = if self.polls % 2 == 0 {
                Err(anyhow!("camera busy"))
            } else if self.polls > 6 {
                Ok(Detection::Finished)
            } else {
                Ok(Detection::Landmarks(self.frame.clone()))
            };
            async move { result }
        }
    }

    fn context(engine: Arc<Mutex<FocusEngine>>) -> (FrameLoopContext, watch::Receiver<bool>, MetricsCollector) {
        let (finished_tx, finished_rx) = watch::channel(false);
        let metrics = MetricsCollector::new();
        (
            FrameLoopContext {
                engine,
                clock: Arc::new(ManualClock::new(0)),
                metrics: metrics.clone(),
                cadence: Duration::from_millis(5),
                finished_tx: Arc::new(finished_tx),
            },
            finished_rx,
            metrics,
        )
    }

    #[tokio::test]
    async fn source_errors_skip_the_cycle_and_exhaustion_ends_the_loop() {
        let mut engine = FocusEngine::new(TrackerConfig::default()).unwrap();
        engine.start("1", None, None, 0).unwrap();
        let engine = Arc::new(Mutex::new(engine));

        let (context, mut finished_rx, metrics) = context(engine.clone());
        let source = FlakySource {
            polls: 0,
            frame: FrameSpec::default().build(),
        };

        frame_loop(source, context, CancellationToken::new()).await;

        finished_rx.changed().await.unwrap();
        assert!(*finished_rx.borrow());

        let snapshot = metrics.get_snapshot().await;
        assert_eq!(snapshot.frames_processed, 3);
        assert_eq!(snapshot.skipped_cycles, 3);
        assert_eq!(engine.lock().await.snapshot().frames_processed, 3);
    }

    #[tokio::test]
    async fn cancellation_stops_an_idle_loop() {
        let engine = Arc::new(Mutex::new(FocusEngine::new(TrackerConfig::default()).unwrap()));
        let (context, _finished_rx, metrics) = context(engine);
        let (_sender, source) = crate::sensing::ChannelSource::channel();
        let token = CancellationToken::new();

        let handle = tokio::spawn(frame_loop(source, context, token.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        handle.await.unwrap();

        let snapshot = metrics.get_snapshot().await;
        assert_eq!(snapshot.frames_processed, 0);
        assert!(snapshot.skipped_cycles > 0);
    }
}
