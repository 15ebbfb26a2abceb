//! Roster reconciliation.
//!
//! Merges the last known roster with a new, possibly partial sample and
//! decides whether the result is trustworthy enough to report joins and
//! leaves. Named samples and a zero count are trusted; a bare non-zero count
//! is not, so it never produces a change notification.

use crate::{Roster, StatusSample};

/// Outcome of reconciling one sample against the previous roster.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// Server counts as online only when it reports at least one player.
    pub online: bool,
    pub current_players: Roster,
    pub reliable: bool,
    pub joined: Vec<String>,
    pub left: Vec<String>,
}

impl Reconciliation {
    pub fn has_changes(&self) -> bool {
        !self.joined.is_empty() || !self.left.is_empty()
    }
}

/// Reconciles `sample` against `previous`.
///
/// `None` means every probe attempt failed. A sample that is present but
/// not `reachable` is treated the same way.
pub fn reconcile(previous: &Roster, sample: Option<&StatusSample>) -> Reconciliation {
    let (online, current_players, reliable) = match sample.filter(|s| s.reachable) {
        None => (false, Roster::new(), !previous.is_empty()),
        Some(sample) => {
            let count = sample.reported_count.unwrap_or(0);
            let named = Roster::from_names(sample.sampled_names.iter().cloned());

            if !named.is_empty() {
                (count > 0, named, true)
            } else if count == 0 {
                (false, Roster::new(), true)
            } else {
                // Identities unknown, only cardinality: keep the head of the old roster
                (true, previous.truncated(count as usize), false)
            }
        }
    };

    let (joined, left) = if reliable {
        (
            current_players.missing_from(previous),
            previous.missing_from(&current_players),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    Reconciliation {
        online,
        current_players,
        reliable,
        joined,
        left,
    }
}
