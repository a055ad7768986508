//! Calendar feature engineering.
//!
//! Every feature here is a pure function of the date, so there is no
//! temporal leakage risk: the same values are available at training time
//! and at forecast time.

use std::collections::HashSet;
use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate, Weekday};

/// Pluggable holiday source for the `is_holiday` indicator.
pub trait HolidayCalendar: Send + Sync {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// Calendar with no holidays. The default when the caller has none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}

/// Holiday calendar backed by a fixed set of dates.
#[derive(Debug, Clone, Default)]
pub struct FixedHolidays {
    dates: HashSet<NaiveDate>,
}

impl FixedHolidays {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }
}

impl HolidayCalendar for FixedHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

/// Number of annual Fourier harmonics.
const ANNUAL_HARMONICS: usize = 3;

/// Average tropical year length in days, used as the annual Fourier period.
const DAYS_PER_YEAR: f64 = 365.25;

/// Names of all calendar feature columns, in output order.
pub const CALENDAR_FEATURES: [&str; 19] = [
    "dow",
    "dow_sin",
    "dow_cos",
    "month",
    "month_sin",
    "month_cos",
    "quarter",
    "week_of_year",
    "day_of_year",
    "is_weekend",
    "is_holiday",
    "fourier_week_sin_1",
    "fourier_week_cos_1",
    "fourier_year_sin_1",
    "fourier_year_cos_1",
    "fourier_year_sin_2",
    "fourier_year_cos_2",
    "fourier_year_sin_3",
    "fourier_year_cos_3",
];

/// Compute the calendar feature vector for one date, aligned with
/// [`CALENDAR_FEATURES`].
///
/// Fourier terms use the date's ordinal day number (days since the common
/// era) for both the weekly and annual periods, so the annual phase is
/// continuous across year boundaries instead of resetting each January.
pub fn calendar_row(date: NaiveDate, calendar: &dyn HolidayCalendar) -> Vec<f64> {
    let dow = date.weekday().num_days_from_monday() as f64;
    let month = date.month() as f64;
    let quarter = (date.month0() / 3 + 1) as f64;
    let week_of_year = date.iso_week().week() as f64;
    let day_of_year = date.ordinal() as f64;
    let is_weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
    let ordinal = date.num_days_from_ce() as f64;

    let mut row = Vec::with_capacity(CALENDAR_FEATURES.len());
    row.push(dow);
    row.push((2.0 * PI * dow / 7.0).sin());
    row.push((2.0 * PI * dow / 7.0).cos());
    row.push(month);
    row.push((2.0 * PI * (month - 1.0) / 12.0).sin());
    row.push((2.0 * PI * (month - 1.0) / 12.0).cos());
    row.push(quarter);
    row.push(week_of_year);
    row.push(day_of_year);
    row.push(if is_weekend { 1.0 } else { 0.0 });
    row.push(if calendar.is_holiday(date) { 1.0 } else { 0.0 });

    row.push((2.0 * PI * ordinal / 7.0).sin());
    row.push((2.0 * PI * ordinal / 7.0).cos());
    for k in 1..=ANNUAL_HARMONICS {
        let phase = 2.0 * PI * k as f64 * ordinal / DAYS_PER_YEAR;
        row.push(phase.sin());
        row.push(phase.cos());
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn feature(row: &[f64], name: &str) -> f64 {
        let idx = CALENDAR_FEATURES.iter().position(|n| *n == name).unwrap();
        row[idx]
    }

    #[test]
    fn row_width_matches_feature_names() {
        let row = calendar_row(date(2024, 6, 15), &NoHolidays);
        assert_eq!(row.len(), CALENDAR_FEATURES.len());
    }

    #[test]
    fn known_date_values() {
        // 2024-06-15 is a Saturday in Q2, ISO week 24.
        let row = calendar_row(date(2024, 6, 15), &NoHolidays);
        assert_eq!(feature(&row, "dow"), 5.0);
        assert_eq!(feature(&row, "month"), 6.0);
        assert_eq!(feature(&row, "quarter"), 2.0);
        assert_eq!(feature(&row, "week_of_year"), 24.0);
        assert_eq!(feature(&row, "day_of_year"), 167.0);
        assert_eq!(feature(&row, "is_weekend"), 1.0);
        assert_eq!(feature(&row, "is_holiday"), 0.0);
    }

    #[test]
    fn cyclic_encoding_identity() {
        let row = calendar_row(date(2024, 1, 1), &NoHolidays);
        let sin = feature(&row, "dow_sin");
        let cos = feature(&row, "dow_cos");
        assert_relative_eq!(sin * sin + cos * cos, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn weekly_fourier_repeats_every_seven_days() {
        let a = calendar_row(date(2024, 2, 5), &NoHolidays);
        let b = calendar_row(date(2024, 2, 12), &NoHolidays);
        assert_relative_eq!(
            feature(&a, "fourier_week_sin_1"),
            feature(&b, "fourier_week_sin_1"),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            feature(&a, "fourier_week_cos_1"),
            feature(&b, "fourier_week_cos_1"),
            epsilon = 1e-9
        );
    }

    #[test]
    fn annual_fourier_is_continuous_across_year_boundary() {
        // Dec 31 -> Jan 1 must move by one day's phase, not jump back a year.
        let dec31 = calendar_row(date(2023, 12, 31), &NoHolidays);
        let jan1 = calendar_row(date(2024, 1, 1), &NoHolidays);
        let day_step = 2.0 * PI / DAYS_PER_YEAR;

        let phase_dec = feature(&dec31, "fourier_year_sin_1")
            .atan2(feature(&dec31, "fourier_year_cos_1"));
        let phase_jan = feature(&jan1, "fourier_year_sin_1")
            .atan2(feature(&jan1, "fourier_year_cos_1"));
        let mut delta = phase_jan - phase_dec;
        if delta < 0.0 {
            delta += 2.0 * PI;
        }
        assert_relative_eq!(delta, day_step, epsilon = 1e-9);
    }

    #[test]
    fn fixed_holidays_are_flagged() {
        let holidays = FixedHolidays::new([date(2024, 7, 4)]);
        let on = calendar_row(date(2024, 7, 4), &holidays);
        let off = calendar_row(date(2024, 7, 5), &holidays);
        assert_eq!(feature(&on, "is_holiday"), 1.0);
        assert_eq!(feature(&off, "is_holiday"), 0.0);
    }
}
