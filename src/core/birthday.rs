//! Birthday value type
//!
//! A birthday always has a month and day; the year is often unknown. The wire and
//! storage form is `YYYY-MM-DD`, or `--MM-DD` when the year is missing.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Birthday {
    year: Option<i32>,
    month: u32,
    day: u32,
}

impl Birthday {
    pub fn new(year: Option<i32>, month: u32, day: u32) -> Result<Self, ValidationError> {
        // A leap year accepts every valid month/day pair, including Feb 29
        let check_year = year.unwrap_or(2000);
        if NaiveDate::from_ymd_opt(check_year, month, day).is_none() {
            return Err(ValidationError::new(format!(
                "Invalid birthday: {month:02}-{day:02}"
            )));
        }
        Ok(Birthday { year, month, day })
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Whether this birthday is celebrated on `date`.
    ///
    /// Feb 29 birthdays fall on Feb 28 in non-leap years.
    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        if self.month == date.month() && self.day == date.day() {
            return true;
        }
        self.month == 2
            && self.day == 29
            && date.month() == 2
            && date.day() == 28
            && !is_leap_year(date.year())
    }

    /// Age reached on `date`, when the birth year is known.
    pub fn age_on(&self, date: NaiveDate) -> Option<i32> {
        let year = self.year?;
        let mut age = date.year() - year;
        if (date.month(), date.day()) < (self.month, self.day) && !self.is_due_on(date) {
            age -= 1;
        }
        Some(age)
    }

    /// `MM-DD` keys whose birthdays are due on `date`. Matches the last five
    /// characters of the stored form.
    pub fn due_keys(date: NaiveDate) -> Vec<String> {
        let mut keys = vec![format!("{:02}-{:02}", date.month(), date.day())];
        if date.month() == 2 && date.day() == 28 && !is_leap_year(date.year()) {
            keys.push("02-29".to_string());
        }
        keys
    }
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

impl fmt::Display for Birthday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.year {
            Some(year) => write!(f, "{year:04}-{:02}-{:02}", self.month, self.day),
            None => write!(f, "--{:02}-{:02}", self.month, self.day),
        }
    }
}

impl FromStr for Birthday {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ValidationError::new(format!("Invalid birthday: {s}"));

        if let Some(rest) = s.strip_prefix("--") {
            let (month, day) = parse_month_day(rest).ok_or_else(invalid)?;
            return Birthday::new(None, month, day);
        }

        // A full RFC 3339 timestamp such as 1990-04-12T00:00:00Z contributes its date part
        let date_part = if s.len() == 10 {
            s
        } else if DateTime::parse_from_rfc3339(s).is_ok() {
            s.get(..10).ok_or_else(invalid)?
        } else {
            return Err(invalid());
        };
        let (year, rest) = date_part.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let (month, day) = parse_month_day(rest).ok_or_else(invalid)?;

        // Year 0 and 1 are the "unknown year" sentinels used by older clients
        let year = if year <= 1 { None } else { Some(year) };
        Birthday::new(year, month, day)
    }
}

fn parse_month_day(s: &str) -> Option<(u32, u32)> {
    let (month, day) = s.split_once('-')?;
    Some((month.parse().ok()?, day.parse().ok()?))
}

impl TryFrom<String> for Birthday {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Birthday> for String {
    fn from(value: Birthday) -> Self {
        value.to_string()
    }
}
