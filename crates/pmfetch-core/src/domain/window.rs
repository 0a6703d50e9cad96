use time::{Date, Month};

use crate::ValidationError;

const MIN_YEAR: i32 = 1970;
const MAX_YEAR: i32 = 2100;

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    start: Date,
    end: Date,
}

impl DateWindow {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// January 1 through December 31 of `year`.
    pub fn calendar_year(year: i32) -> Result<Self, ValidationError> {
        let year = validate_year(year)?;
        let start = Date::from_calendar_date(year, Month::January, 1)
            .map_err(|_| ValidationError::InvalidYear { year })?;
        let end = Date::from_calendar_date(year, Month::December, 31)
            .map_err(|_| ValidationError::InvalidYear { year })?;
        Self::new(start, end)
    }

    /// Single-day window.
    pub fn day(date: Date) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub const fn start(&self) -> Date {
        self.start
    }

    pub const fn end(&self) -> Date {
        self.end
    }

    pub fn day_count(&self) -> usize {
        let days = (self.end - self.start).whole_days();
        usize::try_from(days).map_or(0, |days| days + 1)
    }

    pub fn days(&self) -> impl Iterator<Item = Date> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |current| {
            current.next_day().filter(|next| *next <= end)
        })
    }
}

pub(crate) fn validate_year(year: i32) -> Result<i32, ValidationError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year)
    } else {
        Err(ValidationError::InvalidYear { year })
    }
}
