//! Turning a due schedule into a concrete transaction.

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Clock, Error,
    scheduled_transaction::ScheduledTransaction,
    transaction::{NewTransaction, Transaction, create_transaction},
};

/// Create the transaction that records one occurrence of `schedule`.
///
/// The transaction copies the schedule's account, amount, reference and
/// category, links back to the schedule, and is timestamped with
/// `clock.now()`. Only the owning account's balance is updated: the
/// schedule's offset account gets no counter entry. The schedule itself is
/// not modified.
///
/// No duplicate check happens here: callers should only pass schedules
/// returned by [get_due_schedules](crate::get_due_schedules) for the same day.
/// Run this inside an SQL transaction so the insert and balance update are
/// applied together.
///
/// # Errors
/// Returns [Error::DuplicateOccurrence] if the schedule already has a
/// transaction for today, or any other error from [create_transaction].
pub fn materialize(
    schedule: &ScheduledTransaction,
    clock: &impl Clock,
    connection: &Connection,
) -> Result<Transaction, Error> {
    create_transaction(
        new_transaction_from_schedule(schedule, clock.now()),
        connection,
    )
}

/// The transaction for an occurrence of `schedule` created at `created_at`.
pub fn new_transaction_from_schedule(
    schedule: &ScheduledTransaction,
    created_at: OffsetDateTime,
) -> NewTransaction {
    NewTransaction {
        account_id: schedule.account_id,
        amount: schedule.amount,
        reference: schedule.reference.clone(),
        category_id: schedule.category_id,
        created_at,
        scheduled_transaction_id: Some(schedule.id),
    }
}
