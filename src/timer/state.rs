use serde::{Deserialize, Serialize};

use crate::persistence::SessionSnapshot;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Uninitialized,
    RunningFocused,
    RunningUnfocused,
    Stopped,
}

impl TimerStatus {
    pub fn is_running(self) -> bool {
        matches!(self, TimerStatus::RunningFocused | TimerStatus::RunningUnfocused)
    }
}

/// Focused / unfocused wall-clock accounting for one tracking session.
///
/// Time is kept in integer milliseconds. Closed intervals are folded into
/// `base_*_ms`; the one open interval is tracked by its start timestamp and
/// added on top whenever the live totals are recomputed, so nothing is counted
/// twice.
#[derive(Debug, Clone, Default)]
pub struct SessionTimer {
    status: TimerStatus,
    module_id: Option<String>,
    /// Virtual start: restored sessions are shifted back by their restored length
    session_start_ms: i64,
    base_focused_ms: i64,
    base_unfocused_ms: i64,
    focus_started_at: Option<i64>,
    unfocus_started_at: Option<i64>,
    session_ms: i64,
    focused_ms: i64,
    unfocused_ms: i64,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the timer in the unfocused state.
    ///
    /// A snapshot for the same module that is no older than `staleness_ms`
    /// seeds the accumulators; anything else is ignored and the session starts
    /// from zero. Returns whether the snapshot was used.
    pub fn start(
        &mut self,
        module_id: &str,
        restored: Option<&SessionSnapshot>,
        now_ms: i64,
        staleness_ms: i64,
    ) -> bool {
        let seed = restored.filter(|snapshot| {
            snapshot.module_id == module_id && snapshot.is_fresh(now_ms, staleness_ms)
        });

        let (session_ms, focused_ms, unfocused_ms) = match seed {
            Some(snapshot) => (
                secs_to_ms(snapshot.session_time_sec),
                secs_to_ms(snapshot.focused_time_sec),
                secs_to_ms(snapshot.unfocused_time_sec),
            ),
            None => (0, 0, 0),
        };

        *self = Self {
            status: TimerStatus::RunningUnfocused,
            module_id: Some(module_id.to_string()),
            session_start_ms: now_ms - session_ms,
            base_focused_ms: focused_ms,
            base_unfocused_ms: unfocused_ms,
            focus_started_at: None,
            unfocus_started_at: Some(now_ms),
            session_ms,
            focused_ms,
            unfocused_ms,
        };
        self.check_invariants();
        seed.is_some()
    }

    /// Closes the open interval and opens one for the new state.
    ///
    /// Returns false (and changes nothing) when the timer is not running or is
    /// already in the requested state.
    pub fn on_focus_change(&mut self, focused: bool, now_ms: i64) -> bool {
        let target = if focused {
            TimerStatus::RunningFocused
        } else {
            TimerStatus::RunningUnfocused
        };
        if !self.status.is_running() || self.status == target {
            return false;
        }

        self.close_open_interval(now_ms);
        if focused {
            self.focus_started_at = Some(now_ms);
        } else {
            self.unfocus_started_at = Some(now_ms);
        }
        self.status = target;
        self.check_invariants();
        self.tick(now_ms);
        true
    }

    /// Recomputes the live totals. A no-op unless running.
    pub fn tick(&mut self, now_ms: i64) {
        if !self.status.is_running() {
            return;
        }

        let open_since = |start: Option<i64>| start.map_or(0, |s| (now_ms - s).max(0));
        let focused = self.base_focused_ms + open_since(self.focus_started_at);
        let unfocused = self.base_unfocused_ms + open_since(self.unfocus_started_at);
        let session = (now_ms - self.session_start_ms).max(0);

        // a clock stepping backwards must not shrink the totals
        self.focused_ms = self.focused_ms.max(focused);
        self.unfocused_ms = self.unfocused_ms.max(unfocused);
        self.session_ms = self.session_ms.max(session);
    }

    /// Final close-out. Terminal and idempotent.
    pub fn stop(&mut self, now_ms: i64) {
        match self.status {
            TimerStatus::Stopped => return,
            TimerStatus::Uninitialized => {
                self.status = TimerStatus::Stopped;
                return;
            }
            TimerStatus::RunningFocused | TimerStatus::RunningUnfocused => {}
        }

        self.tick(now_ms);
        self.close_open_interval(now_ms);
        self.focused_ms = self.focused_ms.max(self.base_focused_ms);
        self.unfocused_ms = self.unfocused_ms.max(self.base_unfocused_ms);
        self.status = TimerStatus::Stopped;
        self.check_invariants();
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    pub fn is_focused(&self) -> bool {
        self.status == TimerStatus::RunningFocused
    }

    pub fn session_ms(&self) -> i64 {
        self.session_ms
    }

    pub fn focused_ms(&self) -> i64 {
        self.focused_ms
    }

    pub fn unfocused_ms(&self) -> i64 {
        self.unfocused_ms
    }

    pub fn session_time_sec(&self) -> f64 {
        ms_to_secs(self.session_ms)
    }

    pub fn focused_time_sec(&self) -> f64 {
        ms_to_secs(self.focused_ms)
    }

    pub fn unfocused_time_sec(&self) -> f64 {
        ms_to_secs(self.unfocused_ms)
    }

    /// Share of accounted time spent focused, to one decimal place.
    pub fn focus_percentage(&self) -> f64 {
        let total = self.focused_ms + self.unfocused_ms;
        if total <= 0 {
            return 0.0;
        }
        (self.focused_ms as f64 / total as f64 * 1000.0).round() / 10.0
    }

    /// Projection stored locally and pushed upstream.
    pub fn to_snapshot(&self, saved_at_ms: i64) -> Option<SessionSnapshot> {
        let module_id = self.module_id.clone()?;
        Some(SessionSnapshot {
            module_id,
            session_time_sec: self.session_time_sec(),
            focused_time_sec: self.focused_time_sec(),
            unfocused_time_sec: self.unfocused_time_sec(),
            saved_at_ts: saved_at_ms,
        })
    }

    fn close_open_interval(&mut self, now_ms: i64) {
        if let Some(start) = self.focus_started_at.take() {
            self.base_focused_ms += (now_ms - start).max(0);
        }
        if let Some(start) = self.unfocus_started_at.take() {
            self.base_unfocused_ms += (now_ms - start).max(0);
        }
    }

    fn check_invariants(&self) {
        debug_assert!(
            !(self.focus_started_at.is_some() && self.unfocus_started_at.is_some()),
            "focus and unfocus intervals open at once"
        );
        debug_assert_eq!(
            self.focus_started_at.is_some(),
            self.status == TimerStatus::RunningFocused,
            "open focus interval does not match status {:?}",
            self.status
        );
        debug_assert_eq!(
            self.unfocus_started_at.is_some(),
            self.status == TimerStatus::RunningUnfocused,
            "open unfocus interval does not match status {:?}",
            self.status
        );
    }
}

fn ms_to_secs(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

fn secs_to_ms(secs: f64) -> i64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as i64
    } else {
        0
    }
}
