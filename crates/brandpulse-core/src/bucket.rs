use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Width of an aggregation time bucket. Buckets are aligned in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketWidth {
    Hour,
    Day,
    /// ISO week, starting Monday 00:00 UTC.
    Week,
}

impl BucketWidth {
    /// Floor `ts` to the start of the bucket containing it.
    #[must_use]
    pub fn bucket_start(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let day_start = ts.date_naive().and_time(NaiveTime::MIN).and_utc();
        match self {
            BucketWidth::Hour => day_start + TimeDelta::hours(i64::from(ts.hour())),
            BucketWidth::Day => day_start,
            BucketWidth::Week => {
                day_start - TimeDelta::days(i64::from(ts.weekday().num_days_from_monday()))
            }
        }
    }

    /// Length of one bucket.
    #[must_use]
    pub fn step(self) -> TimeDelta {
        match self {
            BucketWidth::Hour => TimeDelta::hours(1),
            BucketWidth::Day => TimeDelta::days(1),
            BucketWidth::Week => TimeDelta::weeks(1),
        }
    }
}

impl std::fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketWidth::Hour => write!(f, "hour"),
            BucketWidth::Day => write!(f, "day"),
            BucketWidth::Week => write!(f, "week"),
        }
    }
}

impl std::str::FromStr for BucketWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" | "hourly" => Ok(BucketWidth::Hour),
            "day" | "daily" => Ok(BucketWidth::Day),
            "week" | "weekly" => Ok(BucketWidth::Week),
            other => Err(format!("unknown bucket width '{other}'; expected hour, day, or week")),
        }
    }
}
