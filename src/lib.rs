//! Scheduled transactions for a personal finance ledger.
//!
//! Users define recurring transactions (rent, wages, subscriptions) as
//! schedules with a frequency and a validity window. Once per day the batch
//! driver selects the schedules that are due and materializes a concrete
//! transaction for each of them.
//!
//! The library works directly on a SQLite connection. Every operation takes
//! the connection (or an open SQL transaction) explicitly.

#![warn(missing_docs)]

use time::Date;

pub mod account;
mod amount;
pub mod batch;
pub mod category;
pub mod clock;
pub mod database_id;
pub mod db;
pub mod frequency;
pub mod logging;
pub mod scheduled_transaction;
pub mod timezone;
pub mod transaction;

pub use batch::{BatchReport, process_scheduled_transactions};
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::initialize as initialize_db;
pub use frequency::Frequency;
pub use scheduled_transaction::{
    ScheduledTransaction, get_due_schedules, materialize, occurrence_exists,
};
pub use transaction::Transaction;

use crate::{account::AccountId, frequency::FrequencyError};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A query referenced a row that does not exist, e.g. an account or
    /// category ID that is not in the database.
    #[error("a referenced account, category or schedule does not exist")]
    InvalidForeignKey,

    /// A transaction for the schedule has already been created on that day.
    ///
    /// The database allows at most one materialized transaction per
    /// schedule per day. Seeing this error means two batch runs overlapped
    /// or a caller materialized a schedule without checking whether it was
    /// due first.
    #[error("a transaction for this schedule has already been created today")]
    DuplicateOccurrence,

    /// The schedule's start date is after its end date.
    #[error("the start date {start} is after the end date {end}")]
    InvalidDateRange {
        /// The first day the schedule applies to.
        start: Date,
        /// The last day the schedule applies to.
        end: Date,
    },

    /// A stored frequency id does not map to a [Frequency].
    #[error("{0} is not a valid frequency code")]
    InvalidFrequency(i64),

    /// A stored amount could not be parsed as a decimal number.
    #[error("could not parse a stored amount: {0}")]
    InvalidAmount(String),

    /// The specified account name already exists in the database.
    #[error("the account \"{0}\" already exists in the database")]
    DuplicateAccountName(String),

    /// The specified category name already exists in the database.
    #[error("the category \"{0}\" already exists in the database")]
    DuplicateCategoryName(String),

    /// The account that a transaction would be booked against does not exist.
    #[error("the account {0} does not exist")]
    MissingAccount(AccountId),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Tried to update a scheduled transaction that does not exist
    #[error("tried to update a scheduled transaction that is not in the database")]
    UpdateMissingScheduledTransaction,

    /// Tried to delete a scheduled transaction that does not exist
    #[error("tried to delete a scheduled transaction that is not in the database")]
    DeleteMissingScheduledTransaction,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::FromSqlConversionFailure(_, _, ref inner) = value
            && let Some(FrequencyError(id)) = inner.downcast_ref::<FrequencyError>()
        {
            return Error::InvalidFrequency(*id);
        }

        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidForeignKey,
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                Some(ref desc),
            ) if desc.contains("transaction.scheduled_transaction_id") => {
                Error::DuplicateOccurrence
            }
            rusqlite::Error::FromSqlConversionFailure(_, _, ref inner)
                if inner.is::<rust_decimal::Error>() =>
            {
                Error::InvalidAmount(inner.to_string())
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
