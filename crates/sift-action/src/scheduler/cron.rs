//! Cron expression and timezone helpers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use crate::error::SchedulerError;

/// Normalize a 5-field cron expression to 6-field by prepending "0 " for seconds.
///
/// The `cron` crate requires 6 fields: `sec min hour day-of-month month day-of-week`.
/// Handler documents use standard 5-field cron.
pub(crate) fn normalize_cron(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Parse a 5- or 6-field expression.
pub fn parse_schedule(expression: &str) -> Result<Schedule, SchedulerError> {
    Schedule::from_str(&normalize_cron(expression)).map_err(|e| SchedulerError::InvalidCron {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// Zone a schedule's fields are interpreted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobTimezone {
    #[default]
    Utc,
    Local,
    Fixed(FixedOffset),
    /// IANA zone such as `Europe/Istanbul`.
    Named(Tz),
}

impl JobTimezone {
    /// First fire time strictly after `after`.
    pub fn next_after(&self, schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            JobTimezone::Utc => schedule.after(&after).next(),
            JobTimezone::Local => schedule
                .after(&after.with_timezone(&Local))
                .next()
                .map(|t| t.with_timezone(&Utc)),
            JobTimezone::Fixed(offset) => schedule
                .after(&after.with_timezone(offset))
                .next()
                .map(|t| t.with_timezone(&Utc)),
            JobTimezone::Named(tz) => schedule
                .after(&after.with_timezone(tz))
                .next()
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

impl FromStr for JobTimezone {
    type Err = SchedulerError;

    /// Accepts `UTC`, `Z`, `Local`, an offset such as `+02:00`, or an IANA
    /// zone name. Empty is UTC.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "utc" | "z" | "gmt" => Ok(JobTimezone::Utc),
            "local" => Ok(JobTimezone::Local),
            _ => {
                if let Ok(offset) = trimmed.parse::<FixedOffset>() {
                    return Ok(JobTimezone::Fixed(offset));
                }
                trimmed
                    .parse::<Tz>()
                    .map(JobTimezone::Named)
                    .map_err(|_| SchedulerError::InvalidTimezone(trimmed.to_string()))
            }
        }
    }
}

impl fmt::Display for JobTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobTimezone::Utc => f.write_str("UTC"),
            JobTimezone::Local => f.write_str("Local"),
            JobTimezone::Fixed(offset) => write!(f, "{}", offset),
            JobTimezone::Named(tz) => f.write_str(tz.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_normalize_cron() {
        assert_eq!(normalize_cron("*/5 * * * *"), "0 */5 * * * *");
        assert_eq!(normalize_cron(" 0 0 2 * * * "), "0 0 2 * * *");
    }

    #[test]
    fn test_parse_schedule() {
        assert!(parse_schedule("0 2 * * *").is_ok());
        assert!(parse_schedule("30 0 2 * * *").is_ok());
        let err = parse_schedule("not a cron").unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCron { .. }));
    }

    #[test]
    fn test_timezone_parse() {
        assert_eq!("UTC".parse::<JobTimezone>().unwrap(), JobTimezone::Utc);
        assert_eq!("".parse::<JobTimezone>().unwrap(), JobTimezone::Utc);
        assert_eq!("local".parse::<JobTimezone>().unwrap(), JobTimezone::Local);
        let tz: JobTimezone = "+02:00".parse().unwrap();
        assert_eq!(tz, JobTimezone::Fixed(FixedOffset::east_opt(2 * 3600).unwrap()));
        assert!("Mars/Olympus".parse::<JobTimezone>().is_err());

        let tz: JobTimezone = "Europe/Istanbul".parse().unwrap();
        assert_eq!(tz, JobTimezone::Named(chrono_tz::Europe::Istanbul));
        assert_eq!(tz.to_string(), "Europe/Istanbul");
    }

    #[test]
    fn test_next_after_respects_offset() {
        let schedule = parse_schedule("0 2 * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        let utc = JobTimezone::Utc.next_after(&schedule, after).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2026, 1, 2, 2, 0, 0).unwrap());

        let plus_two = JobTimezone::Fixed(FixedOffset::east_opt(2 * 3600).unwrap())
            .next_after(&schedule, after)
            .unwrap();
        assert_eq!(plus_two.hour(), 0);
        assert_eq!(plus_two, Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_next_after_in_named_zone() {
        // Istanbul is UTC+3 all year.
        let schedule = parse_schedule("0 9 * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let next = JobTimezone::Named(chrono_tz::Europe::Istanbul)
            .next_after(&schedule, after)
            .unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 2, 6, 0, 0).unwrap());
    }
}
