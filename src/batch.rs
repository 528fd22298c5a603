//! The daily batch step: materialize every schedule that is due today.

use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{
    Clock, Error, Frequency, ScheduledTransaction, Transaction, get_due_schedules, materialize,
};

/// What a batch run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// The day the batch ran for.
    pub date: Date,
    /// The transactions that were materialized, in the order they were created.
    pub transactions: Vec<Transaction>,
}

/// Materialize a transaction for every schedule that is due on `clock.today()`.
///
/// Due schedules are selected for every [Frequency] first, then each one is
/// materialized and committed in its own SQL transaction. If a write fails,
/// that schedule's writes are rolled back, the failure is logged and the
/// remaining schedules are still processed. Committed schedules stay
/// committed, so the batch can be re-run.
///
/// Running the batch twice on the same day creates nothing the second time.
///
/// # Errors
/// Returns the error from selecting schedules, or the first error from
/// materializing them once every due schedule has been attempted.
pub fn process_scheduled_transactions(
    connection: &mut Connection,
    clock: &impl Clock,
) -> Result<BatchReport, Error> {
    let today = clock.today();

    let mut due = Vec::new();
    for frequency in Frequency::ALL {
        due.extend(get_due_schedules(frequency, today, connection)?);
    }

    tracing::info!("{} scheduled transaction(s) due on {today}", due.len());

    let mut transactions = Vec::with_capacity(due.len());
    let mut first_error = None;
    for schedule in &due {
        match materialize_and_commit(schedule, clock, connection) {
            Ok(transaction) => {
                tracing::debug!(
                    "Created transaction {} from {} schedule {}",
                    transaction.id,
                    schedule.frequency,
                    schedule.id
                );
                transactions.push(transaction);
            }
            Err(error) => {
                tracing::error!("Could not materialize schedule {}: {error}", schedule.id);
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
    }

    if let Some(error) = first_error {
        return Err(error);
    }

    Ok(BatchReport {
        date: today,
        transactions,
    })
}

/// Materialize `schedule` in its own SQL transaction. The transaction is
/// rolled back when dropped on error.
fn materialize_and_commit(
    schedule: &ScheduledTransaction,
    clock: &impl Clock,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.transaction()?;
    let transaction = materialize(schedule, clock, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(transaction)
}
