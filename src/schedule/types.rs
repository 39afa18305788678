//! Closed enumerations and records describing backup policy schedules.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Smallest accepted retention.
pub const MIN_RETENTION_DAYS: u32 = 1;
/// Largest accepted retention.
pub const MAX_RETENTION_DAYS: u32 = 2549;
/// Largest accepted start hour.
pub const MAX_START_HOUR: u8 = 23;

const SECONDS_PER_DAY: u64 = 86_400;

/// Errors raised when schedule input fails validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScheduleValidationError {
    /// A textual field did not name a known value.
    #[error("invalid {field} '{value}'; expected one of: {expected}")]
    UnknownValue {
        /// Field being parsed.
        field: &'static str,
        /// Value supplied.
        value: String,
        /// Accepted spellings.
        expected: &'static str,
    },
    /// Start hour outside `0..=23`.
    #[error("start hour {0} is outside 0..=23")]
    StartHour(u8),
    /// Retention outside `1..=2549` days.
    #[error("retention of {0} days is outside {MIN_RETENTION_DAYS}..={MAX_RETENTION_DAYS}")]
    Retention(u32),
}

macro_rules! schedule_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Provider spelling.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ScheduleValidationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let normalised = value.trim().to_ascii_uppercase().replace('-', "_");
                match normalised.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ScheduleValidationError::UnknownValue {
                        field: $field,
                        value: value.to_owned(),
                        expected: concat!($($text, " "),+),
                    }),
                }
            }
        }
    };
}

schedule_enum! {
    /// Kind of backup a schedule produces.
    BackupType ("backup type") {
        /// Complete copy.
        Full => "FULL",
        /// Changes since the previous backup.
        Incremental => "INCREMENTAL",
    }
}

schedule_enum! {
    /// How often a schedule fires.
    Period ("period") {
        /// Hourly.
        OneHour => "ONE_HOUR",
        /// Daily.
        OneDay => "ONE_DAY",
        /// Weekly.
        OneWeek => "ONE_WEEK",
        /// Monthly.
        OneMonth => "ONE_MONTH",
        /// Yearly.
        OneYear => "ONE_YEAR",
    }
}

impl Period {
    /// Monthly and yearly schedules need a structured offset.
    #[must_use]
    pub const fn needs_structured_offset(self) -> bool {
        matches!(self, Self::OneMonth | Self::OneYear)
    }
}

schedule_enum! {
    /// Day a weekly schedule fires on.
    Weekday ("day of week") {
        /// Monday.
        Monday => "MONDAY",
        /// Tuesday.
        Tuesday => "TUESDAY",
        /// Wednesday.
        Wednesday => "WEDNESDAY",
        /// Thursday.
        Thursday => "THURSDAY",
        /// Friday.
        Friday => "FRIDAY",
        /// Saturday.
        Saturday => "SATURDAY",
        /// Sunday.
        Sunday => "SUNDAY",
    }
}

schedule_enum! {
    /// Month a yearly schedule fires in.
    Month ("month") {
        /// January.
        January => "JANUARY",
        /// February.
        February => "FEBRUARY",
        /// March.
        March => "MARCH",
        /// April.
        April => "APRIL",
        /// May.
        May => "MAY",
        /// June.
        June => "JUNE",
        /// July.
        July => "JULY",
        /// August.
        August => "AUGUST",
        /// September.
        September => "SEPTEMBER",
        /// October.
        October => "OCTOBER",
        /// November.
        November => "NOVEMBER",
        /// December.
        December => "DECEMBER",
    }
}

schedule_enum! {
    /// How the start offset of a schedule is expressed.
    OffsetType ("offset type") {
        /// Hour, weekday, and month fields.
        Structured => "STRUCTURED",
        /// Seconds from the period start.
        NumericSeconds => "NUMERIC_SECONDS",
    }
}

/// Identity of a schedule within a policy.
///
/// Only [`ScheduleKey::new`] builds keys from caller input, so every key
/// carries an hour in `0..=23`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct ScheduleKey {
    backup_type: BackupType,
    period: Period,
    start_hour: u8,
}

impl ScheduleKey {
    /// Builds a key, rejecting hours past 23.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleValidationError::StartHour`] for out-of-range hours.
    pub const fn new(
        backup_type: BackupType,
        period: Period,
        start_hour: u8,
    ) -> Result<Self, ScheduleValidationError> {
        if start_hour > MAX_START_HOUR {
            return Err(ScheduleValidationError::StartHour(start_hour));
        }
        Ok(Self {
            backup_type,
            period,
            start_hour,
        })
    }

    /// Backup type.
    #[must_use]
    pub const fn backup_type(&self) -> BackupType {
        self.backup_type
    }

    /// Period.
    #[must_use]
    pub const fn period(&self) -> Period {
        self.period
    }

    /// Hour of day the schedule starts.
    #[must_use]
    pub const fn start_hour(&self) -> u8 {
        self.start_hour
    }
}

impl fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.backup_type, self.period, self.start_hour
        )
    }
}

/// One schedule entry of a backup policy.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Schedule {
    /// Backup type.
    pub backup_type: BackupType,
    /// Period.
    pub period: Period,
    /// Hour of day the schedule starts.
    pub hour_of_day: u8,
    /// Weekday, meaningful for weekly schedules.
    pub day_of_week: Option<Weekday>,
    /// Day of month, as reported for existing schedules.
    pub day_of_month: Option<u8>,
    /// Month, meaningful for yearly schedules.
    pub month: Option<Month>,
    /// Offset style; structured for monthly and yearly schedules.
    pub offset_type: Option<OffsetType>,
    /// Numeric offset, as reported for existing schedules.
    pub offset_seconds: Option<u64>,
    /// Retention in seconds.
    pub retention_seconds: u64,
    /// Time zone the hour refers to, as reported for existing schedules.
    pub time_zone: Option<String>,
}

impl Schedule {
    /// Key the schedule is identified by.
    #[must_use]
    pub const fn key(&self) -> ScheduleKey {
        ScheduleKey {
            backup_type: self.backup_type,
            period: self.period,
            start_hour: self.hour_of_day,
        }
    }

    /// Retention in whole days, rounded down.
    #[must_use]
    pub const fn retention_days(&self) -> u64 {
        match self.retention_seconds.checked_div(SECONDS_PER_DAY) {
            Some(days) => days,
            None => 0,
        }
    }
}

/// Validated input for a new schedule.
///
/// Built through [`ScheduleRequest::new`] only; the retention range is
/// checked there.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScheduleRequest {
    key: ScheduleKey,
    retention_days: u32,
    day_of_week: Option<Weekday>,
    month: Option<Month>,
}

impl ScheduleRequest {
    /// Builds a request, checking the retention range.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleValidationError::Retention`] when retention is
    /// outside `1..=2549` days.
    pub const fn new(
        key: ScheduleKey,
        retention_days: u32,
    ) -> Result<Self, ScheduleValidationError> {
        if retention_days < MIN_RETENTION_DAYS || retention_days > MAX_RETENTION_DAYS {
            return Err(ScheduleValidationError::Retention(retention_days));
        }
        Ok(Self {
            key,
            retention_days,
            day_of_week: None,
            month: None,
        })
    }

    /// Backup type, period, and start hour.
    #[must_use]
    pub const fn key(&self) -> ScheduleKey {
        self.key
    }

    /// Retention in days, `1..=2549`.
    #[must_use]
    pub const fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Sets the weekday; kept only for weekly schedules.
    #[must_use]
    pub const fn day_of_week(mut self, value: Option<Weekday>) -> Self {
        self.day_of_week = value;
        self
    }

    /// Sets the month; kept only for yearly schedules.
    #[must_use]
    pub const fn month(mut self, value: Option<Month>) -> Self {
        self.month = value;
        self
    }

    /// Converts the request into a schedule entry.
    #[must_use]
    pub fn into_schedule(self) -> Schedule {
        let period = self.key.period;
        Schedule {
            backup_type: self.key.backup_type,
            period,
            hour_of_day: self.key.start_hour,
            day_of_week: self.day_of_week.filter(|_| period == Period::OneWeek),
            day_of_month: None,
            month: self.month.filter(|_| period == Period::OneYear),
            offset_type: period
                .needs_structured_offset()
                .then_some(OffsetType::Structured),
            offset_seconds: None,
            retention_seconds: u64::from(self.retention_days) * SECONDS_PER_DAY,
            time_zone: None,
        }
    }
}
