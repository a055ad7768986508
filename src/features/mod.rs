//! Feature engineering: calendar signals plus per-series lag/rolling
//! aggregates, assembled into leakage-safe training tables and future
//! templates.

pub mod calendar;
pub mod lag;
pub mod pipeline;

pub use calendar::{calendar_row, FixedHolidays, HolidayCalendar, NoHolidays, CALENDAR_FEATURES};
pub use lag::{lag_columns, lag_feature_names, LAG_WINDOWS};
pub use pipeline::{build_features, build_future_template, feature_names, RowPolicy};
