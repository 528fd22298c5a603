//! Scheduled (recurring) transactions and the logic that turns them into
//! concrete transactions.
//!
//! This module contains:
//! - The `ScheduledTransaction` model and its database queries
//! - The due-schedule selector and the occurrence existence check
//! - The materializer that books an occurrence of a due schedule

mod core;
mod due;
mod materialize;

pub use core::{
    NewScheduledTransaction, ScheduledTransaction, create_scheduled_transaction,
    create_scheduled_transaction_table, delete_scheduled_transaction, get_scheduled_transaction,
    get_scheduled_transactions_in_period, map_scheduled_transaction_row,
    set_scheduled_transaction_active,
};
pub use due::{get_due_schedules, occurrence_exists};
pub use materialize::{materialize, new_transaction_from_schedule};
