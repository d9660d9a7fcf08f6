use crate::domain::models::{DayCell, ViewMonth};
use crate::error::PlannerError;
use chrono::{Datelike, NaiveDate};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Build the day grid for a month: one blank cell per weekday preceding the
/// 1st (Sunday-first), then one cell per day of the month. No trailing
/// blanks; a renderer that wants full weeks pads on its own.
///
/// `month` is a zero-based index. Cells come back with empty event lists;
/// the caller fills them from the event index.
pub fn build_grid(year: i32, month: u32) -> Result<Vec<DayCell>, PlannerError> {
    let first = first_of_month(year, month)?;
    let leading_blanks = first.weekday().num_days_from_sunday();
    let days = days_in_month(first);

    let mut cells = Vec::with_capacity((leading_blanks + days) as usize);
    for _ in 0..leading_blanks {
        cells.push(DayCell {
            day_of_month: None,
            events: Vec::new(),
        });
    }
    for day in 1..=days {
        cells.push(DayCell {
            day_of_month: Some(day),
            events: Vec::new(),
        });
    }
    Ok(cells)
}

/// Display title for a viewed month, e.g. "April 2024".
pub fn month_title(view: &ViewMonth) -> String {
    format!("{} {}", MONTH_NAMES[view.month() as usize], view.year())
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, PlannerError> {
    if month > 11 {
        return Err(PlannerError::InvalidArgument(format!(
            "month index {month} out of range 0..=11"
        )));
    }
    NaiveDate::from_ymd_opt(year, month + 1, 1).ok_or_else(|| {
        PlannerError::InvalidArgument(format!("year {year} is not a representable calendar year"))
    })
}

fn days_in_month(first: NaiveDate) -> u32 {
    // Day zero of the next month: the predecessor of the following 1st.
    // `from_ymd_opt` rejects month 13, which only happens for December,
    // and December always has 31 days.
    match NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1).and_then(|date| date.pred_opt())
    {
        Some(last) => last.day(),
        None => 31,
    }
}
