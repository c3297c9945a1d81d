/// Traversal state definitions for catalog nodes
///
/// A node starts in `Discover`, where its page is loaded and classified. It
/// then either recurses into child links (`Navigate`) or keeps the products it
/// found (`Collect`), and always ends in `Done`.
use std::fmt;

/// Represents the current state of a catalog node during traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalState {
    /// Page is being loaded and classified
    Discover,

    /// Child links were found and are being visited
    Navigate,

    /// Products were found and are being attached to the node
    Collect,

    /// Node is resolved (possibly as an empty leaf)
    Done,
}

impl TraversalState {
    /// Returns true if the transition `self -> next` is allowed
    ///
    /// `Discover -> Done` covers empty leaves and pages that never loaded.
    pub fn can_transition_to(&self, next: TraversalState) -> bool {
        matches!(
            (self, next),
            (Self::Discover, Self::Navigate)
                | (Self::Discover, Self::Collect)
                | (Self::Discover, Self::Done)
                | (Self::Navigate, Self::Done)
                | (Self::Collect, Self::Done)
        )
    }
}

impl fmt::Display for TraversalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discover => "discover",
            Self::Navigate => "navigate",
            Self::Collect => "collect",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        use TraversalState::*;

        assert!(Discover.can_transition_to(Navigate));
        assert!(Discover.can_transition_to(Collect));
        assert!(Discover.can_transition_to(Done));
        assert!(Navigate.can_transition_to(Done));
        assert!(Collect.can_transition_to(Done));
    }

    #[test]
    fn test_invalid_transitions() {
        use TraversalState::*;

        // A node never goes back to discovery or switches branch
        assert!(!Navigate.can_transition_to(Collect));
        assert!(!Collect.can_transition_to(Navigate));
        assert!(!Navigate.can_transition_to(Discover));
        for state in [Discover, Navigate, Collect, Done] {
            assert!(!Done.can_transition_to(state));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TraversalState::Collect.to_string(), "collect");
        assert_eq!(format!("{}", TraversalState::Discover), "discover");
    }
}
