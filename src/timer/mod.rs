//! Session timing: the pure focused/unfocused accumulator and the async
//! controller that owns a tracking session end to end.

pub mod controller;
pub mod state;

pub use controller::TrackingController;
pub use state::{SessionTimer, TimerStatus};
