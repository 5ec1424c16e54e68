use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Instant a quote or sentiment reading was produced, pinned to UTC.
///
/// Feeds never supply this value; the aggregator stamps data at merge
/// time, so `as_of` reflects our clock and staleness can be derived with
/// [`age`](Self::age) without trusting upstream clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Parses an RFC3339 string. Anything not pinned to UTC is rejected,
    /// never silently converted.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let not_utc = || ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        };
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| not_utc())?;
        if !parsed.offset().is_utc() {
            return Err(not_utc());
        }
        Ok(Self(parsed))
    }

    /// How long ago this instant was, as seen from `now`. Clock skew can
    /// put `now` earlier than `self`; that reads as zero, never negative.
    pub fn age(self, now: Self) -> Duration {
        (now.0 - self.0).max(Duration::ZERO)
    }

    /// The same instant viewed in a market's fixed local offset. Used by
    /// the trading-hours gate; the UTC value itself never changes.
    pub fn to_local(self, offset: UtcOffset) -> OffsetDateTime {
        self.0.to_offset(offset)
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UTC instant is RFC3339 formattable")
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> UtcDateTime {
        UtcDateTime::parse(raw).expect("timestamp")
    }

    #[test]
    fn parses_and_round_trips_utc() {
        assert_eq!(
            at("2026-01-06T02:00:00Z").format_rfc3339(),
            "2026-01-06T02:00:00Z"
        );
    }

    #[test]
    fn rejects_non_utc_offsets() {
        let err = UtcDateTime::parse("2026-01-06T02:00:00+08:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn age_measures_elapsed_time() {
        let stamped = at("2026-01-06T02:00:00Z");
        let now = at("2026-01-06T02:00:45Z");
        assert_eq!(stamped.age(now), Duration::seconds(45));
    }

    #[test]
    fn age_saturates_under_clock_skew() {
        let stamped = at("2026-01-06T02:00:45Z");
        let skewed_now = at("2026-01-06T02:00:00Z");
        assert_eq!(stamped.age(skewed_now), Duration::ZERO);
    }

    #[test]
    fn local_view_shifts_without_changing_the_instant() {
        let stamped = at("2026-01-06T02:00:00Z");
        let offset = UtcOffset::from_hms(8, 0, 0).expect("offset in range");

        let local = stamped.to_local(offset);
        assert_eq!(local.hour(), 10);
        assert_eq!(stamped.format_rfc3339(), "2026-01-06T02:00:00Z");
    }
}
