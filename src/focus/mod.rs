pub mod classifier;
pub mod history;
pub mod state;

pub use classifier::{FocusClassifier, FocusVerdict};
pub use history::GazeHistory;
pub use state::{FocusState, FocusStatus};
