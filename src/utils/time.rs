//! XMLTV timestamp parsing and formatting
//!
//! The canonical form is `YYYYMMDDHHMMSS ±HHMM`. On input a `T` between the
//! date and the time (`YYYYMMDDTHHMMSS ±HHMM`) is tolerated, because JSON
//! providers commonly emit it. The offset is mandatory.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use crate::errors::ParseError;

const XMLTV_FORMAT: &str = "%Y%m%d%H%M%S %z";

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4})([0-9]{2})([0-9]{2})T?([0-9]{2})([0-9]{2})([0-9]{2}) ([+-])([0-9]{2})([0-9]{2})$")
        .expect("timestamp regex is valid")
});

/// Parse an XMLTV timestamp, keeping the offset it was written with
pub fn parse_xmltv_timestamp(value: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let trimmed = value.trim();

    let caps = TIMESTAMP_RE.captures(trimmed).ok_or_else(|| {
        ParseError::timestamp(
            value,
            "expected 'YYYYMMDDHHMMSS ±HHMM' with a space before the offset",
        )
    })?;

    let num = |i: usize| -> Result<u32, ParseError> {
        caps[i]
            .parse()
            .map_err(|_| ParseError::timestamp(value, format!("non-numeric field '{}'", &caps[i])))
    };

    let date = NaiveDate::from_ymd_opt(num(1)? as i32, num(2)?, num(3)?)
        .ok_or_else(|| ParseError::timestamp(value, "date out of range"))?;
    let time = NaiveTime::from_hms_opt(num(4)?, num(5)?, num(6)?)
        .ok_or_else(|| ParseError::timestamp(value, "time out of range"))?;

    let offset = parse_offset(&caps[7], num(8)?, num(9)?)
        .ok_or_else(|| ParseError::timestamp(value, "invalid UTC offset"))?;

    date.and_time(time)
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| ParseError::timestamp(value, "ambiguous local time"))
}

fn parse_offset(sign: &str, hours: u32, minutes: u32) -> Option<FixedOffset> {
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = (hours * 3600 + minutes * 60) as i32;
    if sign == "-" {
        FixedOffset::west_opt(seconds)
    } else {
        FixedOffset::east_opt(seconds)
    }
}

/// Format a timestamp as `YYYYMMDDHHMMSS ±HHMM`
pub fn format_xmltv_timestamp(dt: &DateTime<FixedOffset>) -> String {
    dt.format(XMLTV_FORMAT).to_string()
}

/// Same instant expressed with a `+0000` offset
pub fn normalize_to_utc(dt: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    dt.with_timezone(&Utc).fixed_offset()
}
