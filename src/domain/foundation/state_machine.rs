//! Status lifecycles for payment records.

use super::ValidationError;

/// A status enum with an explicit transition table.
///
/// Re-entering the current status is how redelivered events are absorbed,
/// so implementors list self-transitions they tolerate. A status with no
/// outgoing transitions is terminal.
pub trait StateMachine: Sized + Copy + PartialEq {
    /// Stable lowercase name used in errors and storage.
    fn label(&self) -> &'static str;

    fn can_transition_to(&self, target: &Self) -> bool;

    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns `target` if the table allows it.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            return Ok(target);
        }
        Err(ValidationError::invalid_format(
            "status",
            format!("cannot move from '{}' to '{}'", self.label(), target.label()),
        ))
    }

    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Settlement {
        Open,
        Settled,
    }

    impl StateMachine for Settlement {
        fn label(&self) -> &'static str {
            match self {
                Settlement::Open => "open",
                Settlement::Settled => "settled",
            }
        }

        fn can_transition_to(&self, target: &Self) -> bool {
            matches!(self, Settlement::Open) || self == target
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Settlement::Open => vec![Settlement::Open, Settlement::Settled],
                Settlement::Settled => vec![],
            }
        }
    }

    #[test]
    fn allowed_transition_returns_target() {
        assert_eq!(
            Settlement::Open.transition_to(Settlement::Settled).unwrap(),
            Settlement::Settled
        );
    }

    #[test]
    fn rejected_transition_names_both_statuses() {
        let err = Settlement::Settled
            .transition_to(Settlement::Open)
            .unwrap_err();
        assert!(err.to_string().contains("cannot move from 'settled' to 'open'"));
    }

    #[test]
    fn status_without_exits_is_terminal() {
        assert!(Settlement::Settled.is_terminal());
        assert!(!Settlement::Open.is_terminal());
    }
}
