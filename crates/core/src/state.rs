//! Bootstrap state machine types.
//!
//! Each managed service moves monotonically through
//! `Pending -> Installing -> Configuring -> Starting -> Running`, or
//! drops into `Failed` from any non-terminal state. The sequencer in
//! `forgeup-bootstrap` is the single writer; everything else only sees
//! published snapshots.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Per-service bootstrap state, serialized into `/status` responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BootstrapState {
    /// Not started yet (waiting on a dependency or on scheduling).
    Pending,
    /// Artifact download / install in progress.
    Installing,
    /// Config rendering and write in progress.
    Configuring,
    /// Process launched, readiness probe in progress.
    Starting,
    /// Readiness confirmed.
    Running,
    /// Terminal failure, attributed to this service.
    Failed { kind: FailureKind, message: String },
}

impl BootstrapState {
    /// Whether this state ends the service's bootstrap run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Running | Self::Failed { .. })
    }

    /// Whether moving to `next` respects the monotonic transition table.
    ///
    /// Forward progress only: each non-terminal state may advance to its
    /// successor or to `Failed`. There are no back-transitions.
    pub fn can_transition_to(&self, next: &BootstrapState) -> bool {
        use BootstrapState::*;
        match (self, next) {
            (_, Failed { .. }) => !self.is_terminal(),
            (Pending, Installing) => true,
            (Installing, Configuring) => true,
            (Configuring, Starting) => true,
            (Starting, Running) => true,
            _ => false,
        }
    }

    /// Short label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Installing => "installing",
            Self::Configuring => "configuring",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> BootstrapState {
        BootstrapState::Failed {
            kind: FailureKind::Fetch,
            message: "connection refused".into(),
        }
    }

    // -- transitions ----------------------------------------------------------

    #[test]
    fn happy_path_transitions_allowed() {
        use BootstrapState::*;
        assert!(Pending.can_transition_to(&Installing));
        assert!(Installing.can_transition_to(&Configuring));
        assert!(Configuring.can_transition_to(&Starting));
        assert!(Starting.can_transition_to(&Running));
    }

    #[test]
    fn any_non_terminal_state_may_fail() {
        use BootstrapState::*;
        for from in [Pending, Installing, Configuring, Starting] {
            assert!(from.can_transition_to(&failed()), "{from:?} -> Failed");
        }
    }

    #[test]
    fn no_back_transitions() {
        use BootstrapState::*;
        assert!(!Installing.can_transition_to(&Pending));
        assert!(!Running.can_transition_to(&Starting));
        assert!(!Configuring.can_transition_to(&Installing));
    }

    #[test]
    fn no_phase_skipping() {
        use BootstrapState::*;
        assert!(!Pending.can_transition_to(&Configuring));
        assert!(!Pending.can_transition_to(&Running));
        assert!(!Installing.can_transition_to(&Running));
    }

    #[test]
    fn terminal_states_are_frozen() {
        use BootstrapState::*;
        assert!(!Running.can_transition_to(&failed()));
        assert!(!failed().can_transition_to(&Running));
        assert!(!failed().can_transition_to(&failed()));
    }

    #[test]
    fn terminal_classification() {
        use BootstrapState::*;
        assert!(Running.is_terminal());
        assert!(failed().is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Starting.is_terminal());
    }

    // -- serialization --------------------------------------------------------

    #[test]
    fn running_serializes_as_tagged_object() {
        let json = serde_json::to_value(&BootstrapState::Running).unwrap();
        assert_eq!(json["state"], "running");
    }

    #[test]
    fn failed_serializes_kind_and_message() {
        let json = serde_json::to_value(failed()).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["kind"], "fetch");
        assert_eq!(json["message"], "connection refused");
    }
}
