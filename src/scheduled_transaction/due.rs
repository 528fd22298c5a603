//! Deciding which scheduled transactions are due on a given day.

use rusqlite::{Connection, named_params};
use time::Date;

use crate::{
    Error, Frequency, database_id::ScheduledTransactionId,
    scheduled_transaction::{ScheduledTransaction, map_scheduled_transaction_row},
};

/// Matches transactions of the schedule `t.scheduled_transaction_id` refers
/// to that count as an occurrence for the current period.
///
/// The creation day must be today, and it must not be before the period
/// start. The second condition can never exclude a row the first one keeps,
/// but both are part of the occurrence rule.
const OCCURRENCE_PREDICATE: &str = "t.date = :today AND t.date >= :period_start";

/// Whether a transaction has already been materialized for schedule `id`
/// in the period of `frequency` that ends on `today`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn occurrence_exists(
    id: ScheduledTransactionId,
    frequency: Frequency,
    today: Date,
    connection: &Connection,
) -> Result<bool, Error> {
    connection
        .prepare(&format!(
            "SELECT EXISTS (
                SELECT 1 FROM \"transaction\" t
                WHERE t.scheduled_transaction_id = :id AND {OCCURRENCE_PREDICATE}
            )"
        ))?
        .query_row(
            named_params! {
                ":id": id,
                ":today": today,
                ":period_start": frequency.period_start(today),
            },
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Get the active schedules of `frequency` whose validity window contains
/// `today` and that have no occurrence yet for the current period.
///
/// An empty list means nothing is due. The list is ordered by schedule ID.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_due_schedules(
    frequency: Frequency,
    today: Date,
    connection: &Connection,
) -> Result<Vec<ScheduledTransaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT s.id, s.account_id, s.offset_account_id, s.amount, s.reference, \
                s.category_id, s.frequency_id, s.date_start, s.date_end, s.is_active
             FROM scheduled_transaction s
             WHERE s.date_start <= :today
               AND s.date_end >= :today
               AND s.is_active = 1
               AND s.frequency_id = :frequency_id
               AND NOT EXISTS (
                   SELECT 1 FROM \"transaction\" t
                   WHERE t.scheduled_transaction_id = s.id AND {OCCURRENCE_PREDICATE}
               )
             ORDER BY s.id ASC"
        ))?
        .query_map(
            named_params! {
                ":today": today,
                ":frequency_id": frequency,
                ":period_start": frequency.period_start(today),
            },
            map_scheduled_transaction_row,
        )?
        .map(|maybe_schedule| maybe_schedule.map_err(|error| error.into()))
        .collect()
}
