//! How often a scheduled transaction recurs, and the lookback period used to
//! decide whether it has already run.

use rusqlite::{
    Connection,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

/// An integer that does not correspond to a [Frequency].
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{0} is not a valid frequency code")]
pub struct FrequencyError(pub i64);

/// How often a scheduled transaction happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// A single occurrence.
    Once,
    /// Every day.
    Daily,
    /// Every seven days.
    Weekly,
    /// Every calendar month.
    Monthly,
    /// Every calendar year.
    Yearly,
}

impl Frequency {
    /// Every frequency, in the order the batch driver processes them.
    pub const ALL: [Frequency; 5] = [
        Frequency::Once,
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    /// The ID of the frequency in the `frequency` lookup table.
    pub fn id(self) -> i64 {
        match self {
            Frequency::Once => 1,
            Frequency::Daily => 2,
            Frequency::Weekly => 3,
            Frequency::Monthly => 4,
            Frequency::Yearly => 5,
        }
    }

    /// The label shown to users and stored in the lookup table.
    pub fn label(self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    /// The first day of the lookback period that ends on `today`.
    ///
    /// A materialized transaction created on or after this date counts as an
    /// occurrence for the current period.
    ///
    /// Month and year arithmetic keeps the day of the month where possible
    /// and otherwise clamps to the last day of the target month, so
    /// 31 March looks back to 29 February in a leap year and 29 February
    /// looks back a year to 28 February.
    pub fn period_start(self, today: Date) -> Date {
        let start = match self {
            Frequency::Once | Frequency::Daily => Some(today),
            Frequency::Weekly => today.checked_sub(Duration::weeks(1)),
            Frequency::Monthly => {
                let (year, month) = match today.month() {
                    Month::January => (today.year() - 1, Month::December),
                    month => (today.year(), month.previous()),
                };
                clamped_date(year, month, today.day())
            }
            Frequency::Yearly => clamped_date(today.year() - 1, today.month(), today.day()),
        };

        // Only reachable for dates at the edge of the representable range.
        start.unwrap_or(Date::MIN)
    }
}

impl TryFrom<i64> for Frequency {
    type Error = FrequencyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Frequency::ALL
            .into_iter()
            .find(|frequency| frequency.id() == value)
            .ok_or(FrequencyError(value))
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl ToSql for Frequency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.id()))
    }
}

impl FromSql for Frequency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let id = value.as_i64()?;

        Frequency::try_from(id).map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// The date `year`-`month`-`day`, moving `day` back to the end of the month
/// when the month is shorter.
fn clamped_date(year: i32, month: Month, day: u8) -> Option<Date> {
    (1..=day)
        .rev()
        .find_map(|day| Date::from_calendar_date(year, month, day).ok())
}

/// Create the frequency lookup table and seed it with every [Frequency].
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_frequency_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS frequency (
            id INTEGER PRIMARY KEY,
            label TEXT NOT NULL UNIQUE
        )",
        (),
    )?;

    let mut statement =
        connection.prepare("INSERT OR IGNORE INTO frequency (id, label) VALUES (?1, ?2)")?;

    for frequency in Frequency::ALL {
        statement.execute((frequency, frequency.label()))?;
    }

    Ok(())
}
