//! Concrete transactions: money that has actually moved in or out of an account.
//!
//! Transactions are either entered by hand or materialized from a
//! [ScheduledTransaction](crate::ScheduledTransaction) by the scheduler.

mod core;

pub use core::{
    NewTransaction, Transaction, count_transactions, create_transaction,
    create_transaction_table, get_transaction, get_transactions_for_schedule, map_transaction_row,
};
