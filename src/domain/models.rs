use crate::error::PlannerError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Backend-assigned event identifier. The server issues integer
/// epoch-millisecond ids, but the value is treated as opaque text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventId(String);

impl EventId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(Self(value.to_string())),
            Repr::Text(value) => Ok(Self(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// The month currently on screen, independent of "today". Month is a
/// zero-based index in [0, 11]; navigation wraps at year boundaries.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ViewMonth {
    year: i32,
    month: u32,
}

impl ViewMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, PlannerError> {
        if month > 11 {
            return Err(PlannerError::InvalidArgument(format!(
                "month index {month} out of range 0..=11"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn prev(self) -> Self {
        if self.month == 0 {
            Self {
                year: self.year.saturating_sub(1),
                month: 11,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn next(self) -> Self {
        if self.month == 11 {
            Self {
                year: self.year.saturating_add(1),
                month: 0,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Canonical zero-padded calendar-date key for a day of this month.
    pub fn date_key(&self, day_of_month: u32) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month + 1, day_of_month)
    }
}

/// One cell of the month grid. `day_of_month` is `None` for the leading
/// blanks that pad the first week.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayCell {
    pub day_of_month: Option<u32>,
    pub events: Vec<Event>,
}

/// Read-only view model handed to a renderer. Recomputed on every state
/// change, never the source of truth.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthView {
    pub title: String,
    pub cells: Vec<DayCell>,
}
