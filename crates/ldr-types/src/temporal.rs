//! Memento timestamps.
//!
//! Mementos are addressed by a fixed 14-digit `yyyyMMddHHmmss` UTC label.
//! The label has second precision, so every instant that ends up inside an
//! identifier is truncated to the second first.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::error::TypeError;

/// A UTC point in time.
pub type Instant = DateTime<Utc>;

/// `strftime` pattern of a memento label.
pub const MEMENTO_LABEL_FORMAT: &str = "%Y%m%d%H%M%S";

/// Length of a memento label.
pub const MEMENTO_LABEL_LEN: usize = 14;

/// The current time, truncated to the second.
pub fn now() -> Instant {
    truncate_to_second(Utc::now())
}

/// Drop any sub-second component.
pub fn truncate_to_second(instant: Instant) -> Instant {
    instant.trunc_subsecs(0)
}

/// Format an instant as a memento label. Sub-second precision is discarded.
pub fn format_memento_label(instant: &Instant) -> String {
    instant.format(MEMENTO_LABEL_FORMAT).to_string()
}

/// Parse a memento label back into an instant.
///
/// Only exactly fourteen ASCII digits forming a valid calendar time are
/// accepted.
pub fn parse_memento_label(label: &str) -> Result<Instant, TypeError> {
    if !is_memento_label(label) {
        return Err(TypeError::InvalidMementoLabel(label.to_string()));
    }
    NaiveDateTime::parse_from_str(label, MEMENTO_LABEL_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| TypeError::InvalidMementoLabel(label.to_string()))
}

/// Returns `true` if `label` has the shape of a memento label.
pub fn is_memento_label(label: &str) -> bool {
    label.len() == MEMENTO_LABEL_LEN && label.bytes().all(|b| b.is_ascii_digit())
}
