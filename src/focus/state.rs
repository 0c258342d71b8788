use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FocusStatus {
    Focused,
    #[default]
    Unfocused,
}

impl FocusStatus {
    pub fn is_focused(self) -> bool {
        self == FocusStatus::Focused
    }
}

/// Classifier state. Only [`FocusClassifier`](super::FocusClassifier) mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusState {
    pub status: FocusStatus,
    pub consecutive_focused_frames: u32,
    pub consecutive_unfocused_frames: u32,
    pub consecutive_closed_eye_frames: u32,
    /// Unbroken run of no-face frames; a subset of the unfocused run
    pub consecutive_no_face_frames: u32,
}

impl FocusState {
    pub(crate) fn record_candidate(&mut self, candidate: bool) {
        if candidate {
            self.consecutive_focused_frames = self.consecutive_focused_frames.saturating_add(1);
            self.consecutive_unfocused_frames = 0;
        } else {
            self.consecutive_unfocused_frames = self.consecutive_unfocused_frames.saturating_add(1);
            self.consecutive_focused_frames = 0;
        }
        debug_assert!(
            self.consecutive_focused_frames == 0 || self.consecutive_unfocused_frames == 0,
            "focused and unfocused runs overlap"
        );
    }

    /// Sets the status, returning true when it changed.
    pub(crate) fn set_status(&mut self, status: FocusStatus) -> bool {
        let changed = self.status != status;
        self.status = status;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_are_mutually_exclusive() {
        let mut state = FocusState::default();
        state.record_candidate(true);
        state.record_candidate(true);
        assert_eq!(state.consecutive_focused_frames, 2);
        assert_eq!(state.consecutive_unfocused_frames, 0);

        state.record_candidate(false);
        assert_eq!(state.consecutive_focused_frames, 0);
        assert_eq!(state.consecutive_unfocused_frames, 1);
    }

    #[test]
    fn set_status_reports_changes_only() {
        let mut state = FocusState::default();
        assert!(!state.set_status(FocusStatus::Unfocused));
        assert!(state.set_status(FocusStatus::Focused));
        assert!(!state.set_status(FocusStatus::Focused));
    }
}
