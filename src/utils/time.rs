//! Timestamp helpers shared by the archive and the exporter.
//!
//! Used as `#[serde(with = "crate::utils::time")]` for RFC 3339 fields.

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

/// Deserialize an RFC 3339 formatted string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis(datetime: OffsetDateTime) -> i128 {
    datetime.unix_timestamp_nanos() / 1_000_000
}

/// Formats a date as `YYYY-MM-DD`.
pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn millis_since_epoch() {
        assert_eq!(unix_millis(datetime!(1970-01-01 00:00:01.250 UTC)), 1250);
    }

    #[test]
    fn iso_date_is_zero_padded() {
        assert_eq!(iso_date(date!(2026 - 03 - 04)), "2026-03-04");
    }
}
