//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row, named_params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::{AccountId, adjust_account_balance},
    amount::get_amount,
    category::CategoryId,
    database_id::{ScheduledTransactionId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// The amount of money spent (negative) or earned (positive).
    pub amount: Decimal,
    /// A short text describing what the transaction was for.
    pub reference: String,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// The calendar day the transaction was created on.
    pub date: Date,
    /// When the transaction was created.
    pub created_at: OffsetDateTime,
    /// The schedule that produced this transaction, `None` for transactions
    /// entered by hand.
    pub scheduled_transaction_id: Option<ScheduledTransactionId>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(
        account_id: AccountId,
        amount: Decimal,
        category_id: CategoryId,
        created_at: OffsetDateTime,
    ) -> NewTransaction {
        NewTransaction {
            account_id,
            amount,
            reference: String::new(),
            category_id,
            created_at,
            scheduled_transaction_id: None,
        }
    }
}

/// A transaction that has not been saved to the database yet.
///
/// The transaction's `date` is the calendar date of `created_at` in
/// whatever offset `created_at` carries, so callers should pass a timestamp
/// in the ledger's reference timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The account the money moves in or out of.
    pub account_id: AccountId,
    /// Positive values represent income, negative values represent expenses.
    pub amount: Decimal,
    /// A short description, e.g. "Rent" or "Netflix".
    pub reference: String,
    /// The category of the transaction.
    pub category_id: CategoryId,
    /// When the transaction is created.
    pub created_at: OffsetDateTime,
    /// The schedule producing this transaction, if any.
    pub scheduled_transaction_id: Option<ScheduledTransactionId>,
}

impl NewTransaction {
    /// Set the reference text for the transaction.
    pub fn reference(mut self, reference: &str) -> Self {
        reference.clone_into(&mut self.reference);
        self
    }

    /// Link the transaction to the schedule that produced it.
    pub fn scheduled_transaction_id(mut self, id: Option<ScheduledTransactionId>) -> Self {
        self.scheduled_transaction_id = id;
        self
    }

    /// The calendar day this transaction will be recorded on.
    pub fn date(&self) -> Date {
        self.created_at.date()
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_COLUMNS: &str = "id, account_id, amount, reference, category_id, date, created_at, \
    scheduled_transaction_id";

/// Create a new transaction and add its amount to the account balance.
///
/// The caller is expected to run this inside an SQL transaction when the
/// insert and the balance update must succeed or fail together.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidForeignKey] if the account, category or schedule does not exist,
/// - or [Error::DuplicateOccurrence] if the schedule already has a transaction on that day,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let created = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (account_id, amount, reference, category_id, date, \
                created_at, scheduled_transaction_id)
             VALUES (:account_id, :amount, :reference, :category_id, :date, :created_at, \
                :scheduled_transaction_id)
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":account_id": transaction.account_id,
                ":amount": transaction.amount.to_string(),
                ":reference": transaction.reference,
                ":category_id": transaction.category_id,
                ":date": transaction.date(),
                ":created_at": transaction.created_at,
                ":scheduled_transaction_id": transaction.scheduled_transaction_id,
            },
            map_transaction_row,
        )?;

    adjust_account_balance(created.account_id, created.amount, connection)?;

    Ok(created)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve every transaction materialized from the schedule `id`, oldest first.
pub fn get_transactions_for_schedule(
    id: ScheduledTransactionId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM \"transaction\"
             WHERE scheduled_transaction_id = :id
             ORDER BY date ASC, id ASC"
        ))?
        .query_map(&[(":id", &id)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// Requires the account, category and scheduled transaction tables.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            amount TEXT NOT NULL,
            reference TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            scheduled_transaction_id INTEGER,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE,
            FOREIGN KEY(scheduled_transaction_id) REFERENCES scheduled_transaction(id)
                ON UPDATE CASCADE ON DELETE SET NULL
        );

        -- At most one materialized transaction per schedule per day.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_transaction_schedule_date
            ON \"transaction\"(scheduled_transaction_id, date)
            WHERE scheduled_transaction_id IS NOT NULL;

        CREATE INDEX IF NOT EXISTS idx_transaction_account_date
            ON \"transaction\"(account_id, date);",
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let account_id = row.get(1)?;
    let amount = get_amount(row, 2)?;
    let reference = row.get(3)?;
    let category_id = row.get(4)?;
    let date = row.get(5)?;
    let created_at = row.get(6)?;
    let scheduled_transaction_id = row.get(7)?;

    Ok(Transaction {
        id,
        account_id,
        amount,
        reference,
        category_id,
        date,
        created_at,
        scheduled_transaction_id,
    })
}

// ============================================================================
// TESTS
// ============================================================================
