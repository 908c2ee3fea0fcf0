//! Recency-sortable row keys.
//!
//! `row_key = message_type + "::" + reverse_time`, where `reverse_time` is
//! `i64::MAX - timestamp_millis` zero padded to 19 digits. A later timestamp
//! gives a smaller key, so an ascending scan returns the most recent records
//! first. Two events of the same type in the same millisecond share a key.

use chrono::Utc;

use crate::context::MessageType;

/// Separator between the message type and the reverse time component.
pub const ROW_KEY_DELIMITER: &str = "::";

/// Width of the reverse time component (digits in `i64::MAX`).
pub const REVERSE_TIME_WIDTH: usize = 19;

/// Source of the current time in milliseconds since the epoch.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current time in milliseconds since the epoch.
    fn now_millis(&self) -> i64;
}

/// Wall clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

/// Encodes a timestamp so that later instants sort first.
///
/// Negative timestamps are clamped to the epoch.
#[must_use]
pub fn reverse_time_component(timestamp_millis: i64) -> String {
    let millis = timestamp_millis.max(0);
    format!("{:0width$}", i64::MAX - millis, width = REVERSE_TIME_WIDTH)
}

/// Builds the row key for a message type and timestamp.
#[must_use]
pub fn row_key(message_type: MessageType, timestamp_millis: i64) -> String {
    format!(
        "{}{ROW_KEY_DELIMITER}{}",
        message_type.as_str(),
        reverse_time_component(timestamp_millis)
    )
}

/// Returns the key prefix shared by every row of a message type.
#[must_use]
pub fn row_key_prefix(message_type: MessageType) -> String {
    format!("{}{ROW_KEY_DELIMITER}", message_type.as_str())
}

/// Recovers the timestamp in milliseconds from a row key.
#[must_use]
pub fn decode_timestamp(row_key: &str) -> Option<i64> {
    let (_, reverse) = row_key.rsplit_once(ROW_KEY_DELIMITER)?;
    if reverse.len() != REVERSE_TIME_WIDTH || !reverse.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let reverse: i64 = reverse.parse().ok()?;
    Some(i64::MAX - reverse)
}
