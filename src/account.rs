//! Accounts (wallets) that transactions are booked against.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, amount::get_amount};

/// The ID of an account.
pub type AccountId = i64;

/// A bank account, credit card or cash wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The name of the account, unique across all accounts.
    pub name: String,
    /// The current balance.
    pub balance: Decimal,
}

/// Create the account table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            balance TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Create an account with an opening `balance`.
///
/// # Errors
/// Returns [Error::DuplicateAccountName] if an account called `name` already
/// exists, or [Error::SqlError] if there is some other SQL error.
pub fn create_account(
    name: &str,
    balance: Decimal,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "INSERT INTO account (name, balance) VALUES (?1, ?2)
             RETURNING id, name, balance",
        )?
        .query_row((name, balance.to_string()), map_row_to_account)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateAccountName(name.to_owned()),
            error => error.into(),
        })
}

/// Retrieve an account by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to an account.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare("SELECT id, name, balance FROM account WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row_to_account)
        .map_err(|error| error.into())
}

/// Add `delta` to the balance of account `id` and return the new balance.
///
/// Balances are stored as decimal text, so the sum is computed here rather
/// than in SQL.
///
/// # Errors
/// Returns [Error::MissingAccount] if `id` does not refer to an account.
pub fn adjust_account_balance(
    id: AccountId,
    delta: Decimal,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let account = get_account(id, connection).map_err(|error| match error {
        Error::NotFound => Error::MissingAccount(id),
        error => error,
    })?;

    let balance = account.balance + delta;
    connection.execute(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        (balance.to_string(), id),
    )?;

    Ok(balance)
}

/// Map a database row to an [Account].
pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let balance = get_amount(row, 2)?;

    Ok(Account { id, name, balance })
}

#[cfg(test)]
mod create_table_tests {
    use rusqlite::Connection;

    use super::create_account_table;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), create_account_table(&connection));
    }
}

#[cfg(test)]
mod account_query_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use crate::Error;

    use super::{adjust_account_balance, create_account, create_account_table, get_account};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_account_table(&conn).unwrap();
        conn
    }

    #[test]
    fn create_and_get_account() {
        let conn = get_test_connection();

        let account = create_account("Everyday", dec!(100.50), &conn).unwrap();
        let got = get_account(account.id, &conn);

        assert_eq!(got, Ok(account));
    }

    #[test]
    fn create_fails_on_duplicate_name() {
        let conn = get_test_connection();
        create_account("Savings", dec!(0), &conn).unwrap();

        let result = create_account("Savings", dec!(10), &conn);

        assert_eq!(result, Err(Error::DuplicateAccountName("Savings".to_owned())));
    }

    #[test]
    fn get_missing_account_is_not_found() {
        let conn = get_test_connection();

        assert_eq!(get_account(42, &conn), Err(Error::NotFound));
    }

    #[test]
    fn adjust_balance_keeps_decimal_precision() {
        let conn = get_test_connection();
        let account = create_account("Everyday", dec!(0.10), &conn).unwrap();

        adjust_account_balance(account.id, dec!(0.20), &conn).unwrap();
        let balance = adjust_account_balance(account.id, dec!(-1.05), &conn).unwrap();

        assert_eq!(balance, dec!(-0.75));
        assert_eq!(get_account(account.id, &conn).unwrap().balance, dec!(-0.75));
    }

    #[test]
    fn adjust_balance_of_missing_account_fails() {
        let conn = get_test_connection();

        let result = adjust_account_balance(7, dec!(1), &conn);

        assert_eq!(result, Err(Error::MissingAccount(7)));
    }

    #[test]
    fn corrupt_balance_is_reported() {
        let conn = get_test_connection();
        conn.execute(
            "INSERT INTO account (id, name, balance) VALUES (1, 'Broken', 'lots')",
            (),
        )
        .unwrap();

        let result = get_account(1, &conn);

        assert!(matches!(result, Err(Error::InvalidAmount(_))));
    }
}
