//! Memento selection by datetime.

use ldr_types::Instant;

/// Pick the memento that best answers a request for `target`.
///
/// The closest memento at or before `target` wins. When every memento is
/// after `target`, the earliest one wins. The first candidate examined is
/// always a provisional match, so the result is `None` only when there are
/// no candidates. Candidate order does not matter.
pub fn select_nearest(candidates: &[Instant], target: Instant) -> Option<Instant> {
    let mut matched: Option<Instant> = None;
    for &candidate in candidates {
        matched = Some(match matched {
            None => candidate,
            Some(current) => {
                let current_precedes = current <= target;
                let candidate_precedes = candidate <= target;
                match (current_precedes, candidate_precedes) {
                    (true, true) => current.max(candidate),
                    (false, true) => candidate,
                    (true, false) => current,
                    (false, false) => current.min(candidate),
                }
            }
        });
    }
    matched
}
