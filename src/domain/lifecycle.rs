use crate::error::{PaymentError, Result};
use std::fmt::Debug;

/// A closed set of statuses with a fixed transition table.
///
/// Non-terminal statuses have one or more legal successors; terminal statuses
/// have none. Both payments (a linear chain) and notifications (two terminal
/// outcomes from one pending status) are described this way.
pub trait Lifecycle: Copy + PartialEq + Debug + Sized + 'static {
    /// Entity name used in error reports.
    const ENTITY: &'static str;

    fn name(&self) -> &'static str;

    fn successors(&self) -> &'static [Self];

    fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    fn can_transition_to(&self, next: Self) -> bool {
        self.successors().contains(&next)
    }
}

/// Moves `current` to `next` if the transition table allows it.
///
/// On an illegal transition `current` is left untouched.
pub fn advance<S: Lifecycle>(current: &mut S, next: S) -> Result<()> {
    if !current.can_transition_to(next) {
        return Err(PaymentError::IllegalTransition {
            entity: S::ENTITY,
            from: current.name(),
            to: next.name(),
        });
    }
    *current = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Door {
        Open,
        Closed,
        Locked,
    }

    impl Lifecycle for Door {
        const ENTITY: &'static str = "door";

        fn name(&self) -> &'static str {
            match self {
                Door::Open => "OPEN",
                Door::Closed => "CLOSED",
                Door::Locked => "LOCKED",
            }
        }

        fn successors(&self) -> &'static [Self] {
            match self {
                Door::Open => &[Door::Closed],
                Door::Closed => &[Door::Locked],
                Door::Locked => &[],
            }
        }
    }

    #[test]
    fn test_advance_follows_table() {
        let mut door = Door::Open;
        advance(&mut door, Door::Closed).unwrap();
        advance(&mut door, Door::Locked).unwrap();
        assert_eq!(door, Door::Locked);
        assert!(door.is_terminal());
    }

    #[test]
    fn test_advance_rejects_skip() {
        let mut door = Door::Open;
        let err = advance(&mut door, Door::Locked).unwrap_err();
        assert!(matches!(
            err,
            PaymentError::IllegalTransition {
                entity: "door",
                from: "OPEN",
                to: "LOCKED"
            }
        ));
        assert_eq!(door, Door::Open);
    }
}
