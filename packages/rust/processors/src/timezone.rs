//! Time zones for naive date/times and file timestamps.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};

use holocron_core::Context;
use holocron_shared::{HolocronError, Result};

/// The zone a processor attaches to date/times that carry none.
///
/// Written as `UTC`, `local` (the zone of the running machine), or a fixed
/// offset such as `+03:00`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Timezone {
    #[default]
    Utc,
    Local,
    Fixed(FixedOffset),
}

impl FromStr for Timezone {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "UTC" | "utc" | "Z" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => s
                .parse::<FixedOffset>()
                .map(Self::Fixed)
                .map_err(|_| format!("unsupported timezone '{s}'")),
        }
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utc => f.write_str("UTC"),
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

impl Timezone {
    /// The `timezone` option of `processor`, or the site's `timezone`
    /// metadata when the option is absent. UTC when neither is set.
    pub(crate) fn resolve(
        processor: &str,
        option: Option<String>,
        cx: &Context<'_>,
    ) -> Result<Self> {
        let name = option.or_else(|| {
            cx.metadata()
                .get("timezone")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        });

        match name {
            None => Ok(Self::Utc),
            Some(name) => name
                .parse()
                .map_err(|e: String| HolocronError::invalid_option(processor, "timezone", e)),
        }
    }

    /// `naive` read as a wall-clock time in this zone.
    ///
    /// `None` for local times that do not exist (a DST gap). Ambiguous local
    /// times resolve to the earlier instant.
    pub fn localize(self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Utc => Some(naive.and_utc().fixed_offset()),
            Self::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            Self::Fixed(offset) => offset.from_local_datetime(&naive).single(),
        }
    }

    /// `time` as seen in this zone.
    pub fn at(self, time: SystemTime) -> DateTime<FixedOffset> {
        let utc = DateTime::<Utc>::from(time);
        match self {
            Self::Utc => utc.fixed_offset(),
            Self::Local => utc.with_timezone(&Local).fixed_offset(),
            Self::Fixed(offset) => utc.with_timezone(&offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use chrono::NaiveDate;

    use super::*;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 1, 15)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    #[test]
    fn parses_names_and_offsets() {
        assert_eq!("UTC".parse(), Ok(Timezone::Utc));
        assert_eq!("local".parse(), Ok(Timezone::Local));
        assert_eq!(
            "+03:00".parse(),
            Ok(Timezone::Fixed(FixedOffset::east_opt(3 * 3600).unwrap()))
        );
        assert_eq!(
            "Europe/Kyiv".parse::<Timezone>(),
            Err("unsupported timezone 'Europe/Kyiv'".to_string())
        );
    }

    #[test]
    fn localizes_naive_times() {
        let dt = Timezone::Utc.localize(noon()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2019-01-15T12:00:00+00:00");

        let dt = "+03:00".parse::<Timezone>().unwrap().localize(noon()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2019-01-15T12:00:00+03:00");
        assert_eq!(dt.naive_utc().to_string(), "2019-01-15 09:00:00");
    }

    #[test]
    fn timestamps_keep_the_instant() {
        let time = UNIX_EPOCH + Duration::from_secs(1_547_553_600);
        let tz = "-05:00".parse::<Timezone>().unwrap();

        let dt = tz.at(time);
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(dt, Timezone::Utc.at(time));
    }
}
