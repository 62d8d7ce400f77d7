//! Column encodings shared by the insert and query paths.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text (nanosecond
//! precision, `Z` suffix) so that lexical order in SQLite equals time order.

use crate::error::{Result, StoreError};
use crate::types::Metadata;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;

pub(crate) fn encode_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn encode_json(value: Option<&Metadata>) -> Result<Option<String>> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::from)
}

pub(crate) fn decode_json(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<Metadata>> {
    raw.map(|text| {
        serde_json::from_str::<Metadata>(&text)
            .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
    })
    .transpose()
}

pub(crate) fn encode_size(size: u64) -> Result<i64> {
    i64::try_from(size)
        .map_err(|_| StoreError::InvalidValue(format!("dataset size {size} exceeds i64 range")))
}

pub(crate) fn decode_size(idx: usize, raw: i64) -> rusqlite::Result<u64> {
    u64::try_from(raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(err))
    })
}

pub(crate) fn invalid_text(idx: usize, what: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unknown {what} '{raw}'").into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_fixed_width_and_sortable() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).unwrap();
        let later = early + chrono::Duration::nanoseconds(120_000_000);

        let a = encode_ts(early);
        let b = encode_ts(later);
        assert_eq!(a.len(), b.len());
        assert!(a < b, "{a} should sort before {b}");
        assert_eq!(decode_ts(0, &b).unwrap(), later);
    }

    #[test]
    fn oversized_size_is_rejected() {
        assert!(encode_size(u64::MAX).is_err());
        assert_eq!(encode_size(42).unwrap(), 42);
    }
}
