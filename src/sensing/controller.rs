use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    loop_worker::{frame_loop, FrameLoopContext},
    source::LandmarkSource,
};

/// Owns the spawned frame loop between start and stop.
#[derive(Default)]
pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SensingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawns the frame loop. `cancel_token` is shared with the other tracking loops.
    pub fn start_sensing<S: LandmarkSource>(
        &mut self,
        source: S,
        context: FrameLoopContext,
        cancel_token: CancellationToken,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sensing already active");
        }

        let handle = tokio::spawn(frame_loop(source, context, cancel_token.clone()));
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop_sensing(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle.await.context("frame loop task failed to join")
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::sync::{watch, Mutex};

    use super::*;
    use crate::{
        clock::ManualClock, config::TrackerConfig, engine::FocusEngine, metrics::MetricsCollector,
        sensing::ChannelSource,
    };

    fn context() -> FrameLoopContext {
        let engine = FocusEngine::new(TrackerConfig::default()).unwrap();
        let (finished_tx, _) = watch::channel(false);
        FrameLoopContext {
            engine: Arc::new(Mutex::new(engine)),
            clock: Arc::new(ManualClock::new(0)),
            metrics: MetricsCollector::new(),
            cadence: Duration::from_millis(5),
            finished_tx: Arc::new(finished_tx),
        }
    }

    #[tokio::test]
    async fn second_start_is_rejected_until_stopped() {
        let mut controller = SensingController::new();
        let (_tx, source) = ChannelSource::channel();
        controller
            .start_sensing(source, context(), CancellationToken::new())
            .unwrap();
        assert!(controller.is_active());

        let (_tx2, other) = ChannelSource::channel();
        let err = controller
            .start_sensing(other, context(), CancellationToken::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "sensing already active");

        controller.stop_sensing().await.unwrap();
        assert!(!controller.is_active());
        controller.stop_sensing().await.unwrap();
    }
}
