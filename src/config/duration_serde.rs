//! Human-readable durations in configuration (`"30s"`, `"1m30s"` or plain seconds).

use serde::de::{self, Visitor};
use serde::Deserializer;
use std::{fmt, time::Duration};

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration as seconds (number) or human-readable string (e.g., '30s', '1m30s')")
        }

        fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(seconds))
        }

        fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(seconds)
                .map(Duration::from_secs)
                .map_err(|_| de::Error::custom(format!("Invalid duration '{seconds}': must not be negative")))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(value)
                .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

/// Parse one of the duration defaults from `defaults.rs`
pub(crate) fn parse_default(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or(Duration::from_secs(30))
}
