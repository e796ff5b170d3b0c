use chrono::{Datelike, Days, NaiveDate};

use crate::config::MonthOverflow;
use crate::errors::{LedgerError, Result};

/// result of stepping a date forward by one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthStep {
    pub date: NaiveDate,
    pub adjustment: Option<MonthAdjustment>,
}

/// recorded when the target month is shorter than the requested day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthAdjustment {
    pub requested_day: u32,
    pub target_year: i32,
    pub target_month: u32,
    pub mode: MonthOverflow,
}

/// advance by one calendar month keeping the day of month
pub fn add_one_calendar_month(date: NaiveDate, mode: MonthOverflow) -> Result<MonthStep> {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    let day = date.day();
    let last_day = days_in_month(year, month);

    if day <= last_day {
        return Ok(MonthStep {
            date: ymd(year, month, day)?,
            adjustment: None,
        });
    }

    let month_end = ymd(year, month, last_day)?;
    let date = match mode {
        MonthOverflow::Clamp => month_end,
        MonthOverflow::Roll => month_end
            .checked_add_days(Days::new(u64::from(day - last_day)))
            .ok_or_else(|| out_of_range(year, month, day))?,
    };

    Ok(MonthStep {
        date,
        adjustment: Some(MonthAdjustment {
            requested_day: day,
            target_year: year,
            target_month: month,
            mode,
        }),
    })
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| out_of_range(year, month, day))
}

fn out_of_range(year: i32, month: u32, day: u32) -> LedgerError {
    LedgerError::InvalidDate {
        message: format!("{:04}-{:02}-{:02} is out of range", year, month, day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plain_month_step() {
        let step = add_one_calendar_month(date(2024, 1, 1), MonthOverflow::Roll).unwrap();
        assert_eq!(step.date, date(2024, 2, 1));
        assert_eq!(step.adjustment, None);

        let step = add_one_calendar_month(date(2024, 1, 29), MonthOverflow::Roll).unwrap();
        assert_eq!(step.date, date(2024, 2, 29));
        assert_eq!(step.adjustment, None);
    }

    #[test]
    fn test_december_wraps_year() {
        let step = add_one_calendar_month(date(2023, 12, 31), MonthOverflow::Roll).unwrap();
        assert_eq!(step.date, date(2024, 1, 31));
        assert_eq!(step.adjustment, None);
    }

    #[test]
    fn test_jan_31_rolls_into_march() {
        // leap year: Feb 31 is two days past Feb 29
        let step = add_one_calendar_month(date(2024, 1, 31), MonthOverflow::Roll).unwrap();
        assert_eq!(step.date, date(2024, 3, 2));

        let adjustment = step.adjustment.unwrap();
        assert_eq!(adjustment.requested_day, 31);
        assert_eq!((adjustment.target_year, adjustment.target_month), (2024, 2));
        assert_eq!(adjustment.mode, MonthOverflow::Roll);

        let step = add_one_calendar_month(date(2023, 1, 31), MonthOverflow::Roll).unwrap();
        assert_eq!(step.date, date(2023, 3, 3));
    }

    #[test]
    fn test_jan_31_clamps_to_month_end() {
        let step = add_one_calendar_month(date(2024, 1, 31), MonthOverflow::Clamp).unwrap();
        assert_eq!(step.date, date(2024, 2, 29));
        assert!(step.adjustment.is_some());

        let step = add_one_calendar_month(date(2023, 1, 31), MonthOverflow::Clamp).unwrap();
        assert_eq!(step.date, date(2023, 2, 28));
    }

    #[test]
    fn test_thirty_day_month_overflow() {
        let rolled = add_one_calendar_month(date(2024, 5, 31), MonthOverflow::Roll).unwrap();
        assert_eq!(rolled.date, date(2024, 7, 1));

        let clamped = add_one_calendar_month(date(2024, 5, 31), MonthOverflow::Clamp).unwrap();
        assert_eq!(clamped.date, date(2024, 6, 30));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
    }

    #[test]
    fn test_end_of_calendar_is_an_error() {
        let result = add_one_calendar_month(NaiveDate::MAX, MonthOverflow::Roll);
        assert!(matches!(result, Err(LedgerError::InvalidDate { .. })));
    }
}
