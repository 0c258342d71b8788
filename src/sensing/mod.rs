//! Frame driver: pulls detector results at a fixed cadence and feeds the engine.

pub mod controller;
pub mod loop_worker;
pub mod source;

pub use controller::SensingController;
pub use loop_worker::FrameLoopContext;
pub use source::{ChannelSource, Detection, FrameSender, LandmarkSource, ReplaySource};
