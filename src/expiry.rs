//! Option expiry date parsing and resolution.
//!
//! NSE-style index options expire on Thursdays: weekly contracts every
//! Thursday, monthly contracts on the last Thursday of the month. Every
//! function here takes the reference time explicitly so callers decide
//! which clock applies.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Format used by data vendors and in every API response.
const VENDOR_FORMAT: &str = "%d-%m-%Y";

/// Internal (ISO) format.
const ISO_FORMAT: &str = "%Y-%m-%d";

/// Weekly contracts stop trading at 15:30 local time on expiry day.
const MARKET_CLOSE: (u32, u32) = (15, 30);

/// Error returned when a string is not a recognised expiry date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised expiry date: {0}")]
pub struct ExpiryParseError(pub String);

/// A calendar expiry date without time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryDate(NaiveDate);

impl ExpiryDate {
    /// Wraps a calendar date.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Builds a date from its parts, `None` when it does not exist.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parses `DD-MM-YYYY` or `YYYY-MM-DD`.
    ///
    /// # Errors
    /// Returns [`ExpiryParseError`] when neither format matches.
    pub fn parse(value: &str) -> Result<Self, ExpiryParseError> {
        let trimmed = value.trim();
        NaiveDate::parse_from_str(trimmed, VENDOR_FORMAT)
            .or_else(|_| NaiveDate::parse_from_str(trimmed, ISO_FORMAT))
            .map(Self)
            .map_err(|_| ExpiryParseError(value.to_string()))
    }

    /// Underlying calendar date.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// `DD-MM-YYYY`.
    #[must_use]
    pub fn vendor_format(&self) -> String {
        self.0.format(VENDOR_FORMAT).to_string()
    }

    /// `YYYY-MM-DD`.
    #[must_use]
    pub fn iso_format(&self) -> String {
        self.0.format(ISO_FORMAT).to_string()
    }

    /// Whole calendar days from `today` to this date (negative when past).
    #[must_use]
    pub fn days_from(&self, today: NaiveDate) -> i64 {
        (self.0 - today).num_days()
    }
}

impl fmt::Display for ExpiryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.vendor_format())
    }
}

impl FromStr for ExpiryDate {
    type Err = ExpiryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Weekly or monthly contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryKind {
    /// Any Thursday that is not the last of its month.
    Weekly,
    /// Last Thursday of the month.
    Monthly,
}

impl fmt::Display for ExpiryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for ExpiryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" | "week" | "w" => Ok(Self::Weekly),
            "monthly" | "month" | "m" => Ok(Self::Monthly),
            _ => Err(format!(
                "Invalid expiry preference: {}. Use 'weekly' or 'monthly'",
                s
            )),
        }
    }
}

/// Result of [`nifty_expiry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NiftyExpiry {
    /// The expiry that applies.
    pub expiry: ExpiryDate,
    /// Whether it is the monthly contract.
    pub kind: ExpiryKind,
}

fn before_market_close(now: NaiveDateTime) -> bool {
    let (hour, minute) = MARKET_CLOSE;
    let close = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    now.time() < close
}

fn is_tradable_thursday(now: NaiveDateTime) -> bool {
    now.date().weekday() == Weekday::Thu && before_market_close(now)
}

/// Picks the expiry to query from a vendor-supplied list.
///
/// Unparsable entries are ignored. Only dates after `now` are eligible; with
/// `prefer_weekly`, today also counts when it is a Thursday before 15:30.
/// When nothing is eligible the first candidate of the list is returned.
/// Weekly preference returns the nearest eligible date. Monthly preference
/// returns the latest date of the current month, or of the earliest future
/// month when the current one has nothing left.
///
/// Returns `None` only for an empty list. Output is `DD-MM-YYYY` except when
/// the fallback candidate itself cannot be parsed.
#[must_use]
pub fn resolve_expiry<S: AsRef<str>>(
    candidates: &[S],
    prefer_weekly: bool,
    now: NaiveDateTime,
) -> Option<String> {
    let first = candidates.first()?.as_ref();

    let parsed: Vec<ExpiryDate> = candidates
        .iter()
        .filter_map(|c| ExpiryDate::parse(c.as_ref()).ok())
        .collect();
    if parsed.is_empty() {
        return Some(first.to_string());
    }

    let today = now.date();
    let today_eligible = prefer_weekly && is_tradable_thursday(now);
    let mut upcoming: Vec<ExpiryDate> = parsed
        .into_iter()
        .filter(|d| d.date() > today || (today_eligible && d.date() == today))
        .collect();

    if upcoming.is_empty() {
        let fallback = ExpiryDate::parse(first)
            .map(|d| d.vendor_format())
            .unwrap_or_else(|_| first.to_string());
        return Some(fallback);
    }

    upcoming.sort();

    if prefer_weekly {
        return upcoming.first().map(ExpiryDate::vendor_format);
    }

    let mut by_month: BTreeMap<(i32, u32), Vec<ExpiryDate>> = BTreeMap::new();
    for date in &upcoming {
        by_month
            .entry((date.date().year(), date.date().month()))
            .or_default()
            .push(*date);
    }

    let current = (today.year(), today.month());
    let group = by_month
        .get(&current)
        .or_else(|| by_month.values().next());

    match group.and_then(|dates| dates.iter().max()) {
        Some(date) => Some(date.vendor_format()),
        None => upcoming.first().map(ExpiryDate::vendor_format),
    }
}

/// Last Thursday of the given month.
///
/// Falls back to the first of the month if `month` is out of range.
#[must_use]
pub fn last_thursday_of_month(year: i32, month: u32) -> ExpiryDate {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let Some(mut day) = NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
    else {
        return ExpiryDate(NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default());
    };

    while day.weekday() != Weekday::Thu {
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }

    ExpiryDate(day)
}

/// Thursday of the week containing `date` (weeks start on Sunday), or the
/// following Thursday for Friday and Saturday.
#[must_use]
pub fn nearest_thursday(date: NaiveDate) -> NaiveDate {
    let weekday = i64::from(date.weekday().num_days_from_sunday());
    let thursday = i64::from(Weekday::Thu.num_days_from_sunday());
    let ahead = (thursday - weekday).rem_euclid(7);
    date + Duration::days(ahead)
}

/// Resolves the NIFTY expiry that applies to a requested date.
///
/// The nearest Thursday is monthly when it is also the last Thursday of the
/// requested date's month, weekly otherwise. Unparsable input yields
/// `today + 7 days`.
#[must_use]
pub fn nifty_expiry(requested: &str, today: NaiveDate) -> NiftyExpiry {
    let Ok(date) = ExpiryDate::parse(requested) else {
        return NiftyExpiry {
            expiry: ExpiryDate(today + Duration::days(7)),
            kind: ExpiryKind::Weekly,
        };
    };

    let date = date.date();
    let monthly = last_thursday_of_month(date.year(), date.month());
    let weekly = ExpiryDate(nearest_thursday(date));

    if weekly == monthly {
        NiftyExpiry {
            expiry: monthly,
            kind: ExpiryKind::Monthly,
        }
    } else {
        NiftyExpiry {
            expiry: weekly,
            kind: ExpiryKind::Weekly,
        }
    }
}

/// Next weekly expiry computed from the calendar alone.
///
/// A Thursday before 15:30 is its own expiry.
#[must_use]
pub fn next_weekly_expiry(now: NaiveDateTime) -> ExpiryDate {
    let today = now.date();
    if is_tradable_thursday(now) {
        return ExpiryDate(today);
    }
    let next = nearest_thursday(today + Duration::days(1));
    ExpiryDate(next)
}

/// Next monthly expiry computed from the calendar alone.
#[must_use]
pub fn next_monthly_expiry(now: NaiveDateTime) -> ExpiryDate {
    let today = now.date();
    let this_month = last_thursday_of_month(today.year(), today.month());
    let still_open = this_month.date() > today
        || (this_month.date() == today && before_market_close(now));
    if still_open {
        return this_month;
    }

    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    last_thursday_of_month(year, month)
}
