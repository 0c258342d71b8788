//! Landmark sources feeding the frame loop.

use std::{
    collections::VecDeque,
    fs::File,
    future::Future,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::landmarks::LandmarkFrame;

/// Result of polling a source once per cadence tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Landmarks(LandmarkFrame),
    NoFace,
    /// Nothing ready this cycle; the engine skips it.
    Pending,
    /// The source will never produce another frame.
    Finished,
}

pub trait LandmarkSource: Send + 'static {
    fn next_detection(&mut self) -> impl Future<Output = Result<Detection>> + Send;
}

/// Producer half of a [`ChannelSource`].
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<Option<LandmarkFrame>>,
}

impl FrameSender {
    pub fn send_landmarks(&self, frame: LandmarkFrame) -> Result<()> {
        self.send(Some(frame))
    }

    pub fn send_no_face(&self) -> Result<()> {
        self.send(None)
    }

    fn send(&self, detection: Option<LandmarkFrame>) -> Result<()> {
        self.tx
            .send(detection)
            .map_err(|_| anyhow!("frame loop is no longer receiving"))
    }
}

/// Detector results pushed from elsewhere, consumed one per tick in order.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Option<LandmarkFrame>>,
}

impl ChannelSource {
    pub fn channel() -> (FrameSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FrameSender { tx }, Self { rx })
    }
}

impl LandmarkSource for ChannelSource {
    async fn next_detection(&mut self) -> Result<Detection> {
        Ok(match self.rx.try_recv() {
            Ok(Some(frame)) => Detection::Landmarks(frame),
            Ok(None) => Detection::NoFace,
            Err(TryRecvError::Empty) => Detection::Pending,
            Err(TryRecvError::Disconnected) => Detection::Finished,
        })
    }
}

#[derive(Deserialize)]
struct RecordedDetection {
    landmarks: Option<LandmarkFrame>,
}

/// A recording of detector output, one JSON object per line:
/// `{"landmarks": [[x, y], ...]}` or `{"landmarks": null}` for no face.
#[derive(Debug, Default)]
pub struct ReplaySource {
    detections: VecDeque<Option<LandmarkFrame>>,
}

impl ReplaySource {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open recording {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse recording {}", path.display()))
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut detections = VecDeque::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let recorded: RecordedDetection = serde_json::from_str(&line)
                .with_context(|| format!("invalid detection on line {}", index + 1))?;
            detections.push_back(recorded.landmarks);
        }
        Ok(Self { detections })
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

impl LandmarkSource for ReplaySource {
    async fn next_detection(&mut self) -> Result<Detection> {
        Ok(match self.detections.pop_front() {
            Some(Some(frame)) => Detection::Landmarks(frame),
            Some(None) => Detection::NoFace,
            None => Detection::Finished,
        })
    }
}
