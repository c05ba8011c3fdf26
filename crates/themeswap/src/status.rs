#![forbid(unsafe_code)]

//! Switch status state machine.
//!
//! ```text
//!            switch(valid, != current)
//!   Idle ───────────────────────────────▶ Loading ◀─┐
//!                                           │        │ switch(valid, != current)
//!                                     load  │        │
//!                                           ▼        │
//!                                         Loaded ────┘
//! ```
//!
//! Switching to the current theme or to an unknown key never changes state.
//! There is no error state and no terminal state.
//!
//! Every accepted switch bumps a generation counter and hands out a
//! [`LoadTicket`]. What happens when an old ticket completes after a newer
//! switch is decided by [`StaleLoadPolicy`].

use std::fmt;
use std::time::Duration;

use web_time::Instant;

use crate::config::StaleLoadPolicy;

/// Lifecycle of the most recent switch request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Loaded,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof that a particular switch started a stylesheet load.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    theme: String,
    started_at: Instant,
}

impl LoadTicket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn theme(&self) -> &str {
        &self.theme
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Result of delivering a load completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The completion belonged to the current switch.
    Applied,
    /// The completion belonged to a superseded switch and still advanced the
    /// status ([`StaleLoadPolicy::Advance`]).
    AppliedStale,
    /// The completion belonged to a superseded switch and was dropped.
    Ignored,
}

/// `{status, current_theme}` plus the generation counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeSwitcherState {
    status: Status,
    current_theme: Option<String>,
    generation: u64,
}

impl ThemeSwitcherState {
    /// `Idle`, no theme, generation 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn current_theme(&self) -> Option<&str> {
        self.current_theme.as_deref()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether switching to `theme` would be a no-op.
    #[must_use]
    pub fn is_current(&self, theme: &str) -> bool {
        self.current_theme.as_deref() == Some(theme)
    }

    /// The ticket the next accepted switch to `theme` will carry. Does not
    /// change state; see [`Self::commit`].
    #[must_use]
    pub fn prepare(&self, theme: &str) -> LoadTicket {
        LoadTicket {
            generation: self.generation + 1,
            theme: theme.to_owned(),
            started_at: Instant::now(),
        }
    }

    /// Enter `Loading` for `ticket`'s theme.
    pub fn commit(&mut self, ticket: &LoadTicket) {
        self.generation = ticket.generation;
        self.status = Status::Loading;
        self.current_theme = Some(ticket.theme.clone());
    }

    /// Deliver a load completion.
    pub fn complete(&mut self, ticket: &LoadTicket, policy: StaleLoadPolicy) -> LoadOutcome {
        if ticket.generation == self.generation {
            self.status = Status::Loaded;
            return LoadOutcome::Applied;
        }
        match policy {
            StaleLoadPolicy::Advance => {
                self.status = Status::Loaded;
                LoadOutcome::AppliedStale
            }
            StaleLoadPolicy::IgnoreSuperseded => LoadOutcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let state = ThemeSwitcherState::new();
        assert_eq!(state.status(), Status::Idle);
        assert_eq!(state.current_theme(), None);
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn prepare_does_not_mutate() {
        let state = ThemeSwitcherState::new();
        let ticket = state.prepare("dark");
        assert_eq!(ticket.generation(), 1);
        assert_eq!(ticket.theme(), "dark");
        assert_eq!(state, ThemeSwitcherState::new());
    }

    #[test]
    fn commit_then_complete() {
        let mut state = ThemeSwitcherState::new();
        let ticket = state.prepare("dark");
        state.commit(&ticket);
        assert_eq!(state.status(), Status::Loading);
        assert!(state.is_current("dark"));

        let outcome = state.complete(&ticket, StaleLoadPolicy::Advance);
        assert_eq!(outcome, LoadOutcome::Applied);
        assert_eq!(state.status(), Status::Loaded);
    }

    #[test]
    fn superseded_ticket_advances_by_default() {
        let mut state = ThemeSwitcherState::new();
        let dark = state.prepare("dark");
        state.commit(&dark);
        let light = state.prepare("light");
        state.commit(&light);

        let outcome = state.complete(&dark, StaleLoadPolicy::Advance);
        assert_eq!(outcome, LoadOutcome::AppliedStale);
        assert_eq!(state.status(), Status::Loaded);
        assert_eq!(state.current_theme(), Some("light"));
    }

    #[test]
    fn superseded_ticket_ignored_when_requested() {
        let mut state = ThemeSwitcherState::new();
        let dark = state.prepare("dark");
        state.commit(&dark);
        let light = state.prepare("light");
        state.commit(&light);

        let outcome = state.complete(&dark, StaleLoadPolicy::IgnoreSuperseded);
        assert_eq!(outcome, LoadOutcome::Ignored);
        assert_eq!(state.status(), Status::Loading);

        assert_eq!(
            state.complete(&light, StaleLoadPolicy::IgnoreSuperseded),
            LoadOutcome::Applied
        );
        assert_eq!(state.status(), Status::Loaded);
    }

    #[test]
    fn status_text() {
        assert_eq!(Status::Idle.to_string(), "idle");
        assert_eq!(Status::Loading.as_str(), "loading");
        assert_eq!(Status::Loaded.as_str(), "loaded");
    }
}
