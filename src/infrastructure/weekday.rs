//! Weekday numbering adapter.
//!
//! The domain counts weekdays as 0 = Sunday .. 6 = Saturday, matching
//! `Datelike::weekday().num_days_from_sunday()`. The native trigger backends
//! count from a different zero point; the canonical mapping is the 0-based
//! shifted encoding below, applied on every call crossing the backend
//! boundary. A mismatch here fires alarms on the wrong day.

pub const DOMAIN_DAYS: std::ops::RangeInclusive<u8> = 0..=6;

/// Domain day (0=Sun..6=Sat) to backend day.
pub fn to_backend_day(day: u8) -> u8 {
    (day + 1) % 7
}

/// Backend day back to domain numbering.
pub fn from_backend_day(day: u8) -> u8 {
    (day + 6) % 7
}

pub fn to_backend_days(days: &[u8]) -> Vec<u8> {
    days.iter().map(|day| to_backend_day(*day)).collect()
}

pub fn from_backend_days(days: &[u8]) -> Vec<u8> {
    days.iter().map(|day| from_backend_day(*day)).collect()
}
