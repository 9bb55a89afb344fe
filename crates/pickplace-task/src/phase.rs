use std::fmt;

use serde::{Deserialize, Serialize};

/// Progress of one pick-and-place run.
///
/// Phases advance strictly in declaration order; only a controller reset
/// moves back to [`Approaching`](Self::Approaching).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Moving to a point above the object.
    #[default]
    Approaching,
    /// Descending onto the object and closing the gripper.
    Grasping,
    /// Carrying the object to a point above the target.
    Transporting,
    /// Descending onto the target and opening the gripper.
    Releasing,
    /// Object deposited.
    Done,
}

impl Phase {
    pub const ALL: [Self; 5] = [
        Self::Approaching,
        Self::Grasping,
        Self::Transporting,
        Self::Releasing,
        Self::Done,
    ];

    /// Returns `true` only for [`Done`](Self::Done).
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// The phase that follows this one. `Done` is absorbing.
    pub const fn next(self) -> Self {
        match self {
            Self::Approaching => Self::Grasping,
            Self::Grasping => Self::Transporting,
            Self::Transporting => Self::Releasing,
            Self::Releasing | Self::Done => Self::Done,
        }
    }

    /// Whether the object is held by the gripper during this phase.
    pub const fn holds_object(self) -> bool {
        matches!(self, Self::Transporting | Self::Releasing)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approaching => "APPROACHING",
            Self::Grasping => "GRASPING",
            Self::Transporting => "TRANSPORTING",
            Self::Releasing => "RELEASING",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_done_is_terminal() {
        for phase in Phase::ALL {
            assert_eq!(phase.is_terminal(), phase == Phase::Done, "{phase}");
        }
    }

    #[test]
    fn next_walks_declaration_order() {
        for pair in Phase::ALL.windows(2) {
            assert_eq!(pair[0].next(), pair[1]);
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(Phase::Done.next(), Phase::Done);
    }

    #[test]
    fn default_is_approaching() {
        assert_eq!(Phase::default(), Phase::Approaching);
    }

    #[test]
    fn serializes_in_upper_case() {
        assert_eq!(
            serde_json::to_string(&Phase::Transporting).unwrap(),
            "\"TRANSPORTING\""
        );
        assert_eq!(Phase::Releasing.to_string(), "RELEASING");
    }
}
