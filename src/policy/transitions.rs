use crate::models::BookingStatus;

/// Attempted move not in the whitelist. Surfaced to the user naming the
/// current status; an illegal transition must never silently no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "current status: {}, cannot move booking to {}",
            self.from, self.to
        )
    }
}

impl std::error::Error for TransitionError {}

/// The lifecycle whitelist. `overdue` currently has no outgoing edges;
/// terminal statuses never do.
pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    matches!(
        (from, to),
        (Requested, Accepted)
            | (Requested, Rejected)
            | (Requested, Revoked)
            | (Accepted, Confirmed)
            | (Confirmed, Ongoing)
            | (Confirmed, Cancelled)
            | (Confirmed, Overdue)
            | (Ongoing, Completed)
            | (Ongoing, Overdue)
    )
}

pub fn transition(
    from: BookingStatus,
    to: BookingStatus,
) -> Result<BookingStatus, TransitionError> {
    if can_transition(from, to) {
        Ok(to)
    } else {
        Err(TransitionError { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    const ALLOWED: [(BookingStatus, BookingStatus); 9] = [
        (Requested, Accepted),
        (Requested, Rejected),
        (Requested, Revoked),
        (Accepted, Confirmed),
        (Confirmed, Ongoing),
        (Confirmed, Cancelled),
        (Confirmed, Overdue),
        (Ongoing, Completed),
        (Ongoing, Overdue),
    ];

    #[test]
    fn whitelist_is_exact() {
        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                let expected = ALLOWED.contains(&(from, to));
                assert_eq!(
                    can_transition(from, to),
                    expected,
                    "transition {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_edges() {
        for from in BookingStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in BookingStatus::ALL {
                assert!(!can_transition(from, to), "{from} -> {to} should be illegal");
            }
        }
    }

    #[test]
    fn illegal_transition_is_an_error_naming_current_status() {
        let err = transition(Requested, Cancelled).unwrap_err();
        assert_eq!(err.from, Requested);
        assert_eq!(err.to, Cancelled);
        let msg = err.to_string();
        assert!(msg.contains("requested"));
        assert!(msg.contains("cancelled"));
    }

    #[test]
    fn legal_transition_returns_new_status() {
        assert_eq!(transition(Accepted, Confirmed).unwrap(), Confirmed);
    }

    #[test]
    fn self_transition_is_illegal() {
        for s in BookingStatus::ALL {
            assert!(!can_transition(s, s));
        }
    }
}
