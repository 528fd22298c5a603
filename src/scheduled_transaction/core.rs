//! The scheduled transaction model and its database queries.

use rusqlite::{Connection, Row, named_params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, Frequency, account::AccountId, amount::get_amount, category::CategoryId,
    database_id::ScheduledTransactionId,
};

/// A recurring transaction template, e.g. rent every month or wages every week.
///
/// To create a new `ScheduledTransaction`, use [ScheduledTransaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTransaction {
    /// The ID of the schedule.
    pub id: ScheduledTransactionId,
    /// The account each occurrence is booked against.
    pub account_id: AccountId,
    /// The account on the other side of a transfer. Occurrences are only
    /// booked against `account_id`.
    pub offset_account_id: Option<AccountId>,
    /// The amount of each occurrence.
    pub amount: Decimal,
    /// The reference copied onto each occurrence.
    pub reference: String,
    /// The category copied onto each occurrence.
    pub category_id: CategoryId,
    /// How often the schedule recurs.
    pub frequency: Frequency,
    /// The first day the schedule applies to.
    pub date_start: Date,
    /// The last day the schedule applies to.
    pub date_end: Date,
    /// Whether the user has paused the schedule.
    pub is_active: bool,
}

impl ScheduledTransaction {
    /// Create a new scheduled transaction.
    ///
    /// Shortcut for [NewScheduledTransaction] for discoverability.
    pub fn build(
        account_id: AccountId,
        amount: Decimal,
        category_id: CategoryId,
        frequency: Frequency,
        date_start: Date,
        date_end: Date,
    ) -> NewScheduledTransaction {
        NewScheduledTransaction {
            account_id,
            offset_account_id: None,
            amount,
            reference: String::new(),
            category_id,
            frequency,
            date_start,
            date_end,
            is_active: true,
        }
    }

    /// Whether the schedule applies to `day`: it is active and `day` falls
    /// within its inclusive validity window.
    pub fn is_in_scope(&self, day: Date) -> bool {
        self.is_active && self.date_start <= day && day <= self.date_end
    }
}

/// A scheduled transaction that has not been saved to the database yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScheduledTransaction {
    /// The account each occurrence is booked against.
    pub account_id: AccountId,
    /// The account on the other side of a transfer.
    pub offset_account_id: Option<AccountId>,
    /// The amount of each occurrence.
    pub amount: Decimal,
    /// The reference copied onto each occurrence.
    pub reference: String,
    /// The category copied onto each occurrence.
    pub category_id: CategoryId,
    /// How often the schedule recurs.
    pub frequency: Frequency,
    /// The first day the schedule applies to.
    pub date_start: Date,
    /// The last day the schedule applies to.
    pub date_end: Date,
    /// Defaults to `true`.
    pub is_active: bool,
}

impl NewScheduledTransaction {
    /// Set the reference text.
    pub fn reference(mut self, reference: &str) -> Self {
        reference.clone_into(&mut self.reference);
        self
    }

    /// Record the account on the other side of a transfer.
    pub fn offset_account_id(mut self, offset_account_id: Option<AccountId>) -> Self {
        self.offset_account_id = offset_account_id;
        self
    }
}

const SELECT_COLUMNS: &str = "id, account_id, offset_account_id, amount, reference, category_id, \
    frequency_id, date_start, date_end, is_active";

/// Save a new scheduled transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidDateRange] if `date_start` is after `date_end`,
/// - or [Error::InvalidForeignKey] if an account or the category does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_scheduled_transaction(
    schedule: NewScheduledTransaction,
    connection: &Connection,
) -> Result<ScheduledTransaction, Error> {
    if schedule.date_start > schedule.date_end {
        return Err(Error::InvalidDateRange {
            start: schedule.date_start,
            end: schedule.date_end,
        });
    }

    let schedule = connection
        .prepare(&format!(
            "INSERT INTO scheduled_transaction (account_id, offset_account_id, amount, reference, \
                category_id, frequency_id, date_start, date_end, is_active)
             VALUES (:account_id, :offset_account_id, :amount, :reference, :category_id, \
                :frequency_id, :date_start, :date_end, :is_active)
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row(
            named_params! {
                ":account_id": schedule.account_id,
                ":offset_account_id": schedule.offset_account_id,
                ":amount": schedule.amount.to_string(),
                ":reference": schedule.reference,
                ":category_id": schedule.category_id,
                ":frequency_id": schedule.frequency,
                ":date_start": schedule.date_start,
                ":date_end": schedule.date_end,
                ":is_active": schedule.is_active,
            },
            map_scheduled_transaction_row,
        )?;

    Ok(schedule)
}

/// Retrieve a scheduled transaction by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a scheduled transaction.
pub fn get_scheduled_transaction(
    id: ScheduledTransactionId,
    connection: &Connection,
) -> Result<ScheduledTransaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM scheduled_transaction WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_scheduled_transaction_row)
        .map_err(|error| error.into())
}

/// Retrieve the schedules of `account_id` whose whole validity window lies
/// between `date_start` and `date_end` (inclusive).
pub fn get_scheduled_transactions_in_period(
    account_id: AccountId,
    date_start: Date,
    date_end: Date,
    connection: &Connection,
) -> Result<Vec<ScheduledTransaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM scheduled_transaction
             WHERE account_id = :account_id
               AND date_start >= :date_start
               AND date_end <= :date_end
             ORDER BY date_start ASC, id ASC"
        ))?
        .query_map(
            named_params! {
                ":account_id": account_id,
                ":date_start": date_start,
                ":date_end": date_end,
            },
            map_scheduled_transaction_row,
        )?
        .map(|maybe_schedule| maybe_schedule.map_err(|error| error.into()))
        .collect()
}

/// Pause or resume a scheduled transaction.
///
/// # Errors
/// Returns [Error::UpdateMissingScheduledTransaction] if `id` does not exist.
pub fn set_scheduled_transaction_active(
    id: ScheduledTransactionId,
    is_active: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE scheduled_transaction SET is_active = ?1 WHERE id = ?2",
        (is_active, id),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingScheduledTransaction);
    }

    Ok(())
}

/// Delete a scheduled transaction.
///
/// Transactions already materialized from it are kept, their schedule link
/// is cleared.
///
/// # Errors
/// Returns [Error::DeleteMissingScheduledTransaction] if `id` does not exist.
pub fn delete_scheduled_transaction(
    id: ScheduledTransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM scheduled_transaction WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingScheduledTransaction);
    }

    Ok(())
}

/// Create the scheduled transaction table.
///
/// Requires the account, category and frequency tables.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_scheduled_transaction_table(
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS scheduled_transaction (
            id INTEGER PRIMARY KEY,
            account_id INTEGER NOT NULL,
            offset_account_id INTEGER,
            amount TEXT NOT NULL,
            reference TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            frequency_id INTEGER NOT NULL,
            date_start TEXT NOT NULL,
            date_end TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            CHECK (date_start <= date_end),
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(offset_account_id) REFERENCES account(id)
                ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE,
            FOREIGN KEY(frequency_id) REFERENCES frequency(id)
        );

        CREATE INDEX IF NOT EXISTS idx_scheduled_transaction_due
            ON scheduled_transaction(frequency_id, is_active, date_start, date_end);",
    )?;

    Ok(())
}

/// Map a database row to a [ScheduledTransaction].
pub fn map_scheduled_transaction_row(row: &Row) -> Result<ScheduledTransaction, rusqlite::Error> {
    let id = row.get(0)?;
    let account_id = row.get(1)?;
    let offset_account_id = row.get(2)?;
    let amount = get_amount(row, 3)?;
    let reference = row.get(4)?;
    let category_id = row.get(5)?;
    let frequency = row.get(6)?;
    let date_start = row.get(7)?;
    let date_end = row.get(8)?;
    let is_active = row.get(9)?;

    Ok(ScheduledTransaction {
        id,
        account_id,
        offset_account_id,
        amount,
        reference,
        category_id,
        frequency,
        date_start,
        date_end,
        is_active,
    })
}


#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error, Frequency, ScheduledTransaction,
        account::create_account,
        category::create_category,
        db::initialize,
        scheduled_transaction::{
            create_scheduled_transaction, delete_scheduled_transaction,
            get_scheduled_transaction, get_scheduled_transactions_in_period,
            set_scheduled_transaction_active,
        },
    };

    struct Fixture {
        conn: Connection,
        account_id: i64,
        category_id: i64,
    }

    fn get_fixture() -> Fixture {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let account_id = create_account("Everyday", dec!(0), &conn).unwrap().id;
        let category_id = create_category("Bills", &conn).unwrap().id;

        Fixture {
            conn,
            account_id,
            category_id,
        }
    }

    #[test]
    fn create_and_get_succeeds() {
        let Fixture {
            conn,
            account_id,
            category_id,
        } = get_fixture();
        let savings = create_account("Savings", dec!(0), &conn).unwrap();

        let schedule = create_scheduled_transaction(
            ScheduledTransaction::build(
                account_id,
                dec!(-50.25),
                category_id,
                Frequency::Weekly,
                date!(2024 - 01 - 01),
                date!(2024 - 12 - 31),
            )
            .reference("Save")
            .offset_account_id(Some(savings.id)),
            &conn,
        )
        .expect("Could not create schedule");

        assert!(schedule.id > 0);
        assert_eq!(schedule.amount, dec!(-50.25));
        assert_eq!(schedule.reference, "Save");
        assert_eq!(schedule.frequency, Frequency::Weekly);
        assert_eq!(schedule.offset_account_id, Some(savings.id));
        assert!(schedule.is_active);
        assert_eq!(get_scheduled_transaction(schedule.id, &conn), Ok(schedule));
    }

    #[test]
    fn single_day_window_is_allowed() {
        let Fixture {
            conn,
            account_id,
            category_id,
        } = get_fixture();
        let day = date!(2024 - 03 - 10);

        let result = create_scheduled_transaction(
            ScheduledTransaction::build(
                account_id,
                dec!(1),
                category_id,
                Frequency::Once,
                day,
                day,
            ),
            &conn,
        );

        assert!(result.is_ok());
    }

    #[test]
    fn create_fails_when_start_is_after_end() {
        let Fixture {
            conn,
            account_id,
            category_id,
        } = get_fixture();

        let result = create_scheduled_transaction(
            ScheduledTransaction::build(
                account_id,
                dec!(1),
                category_id,
                Frequency::Daily,
                date!(2024 - 03 - 11),
                date!(2024 - 03 - 10),
            ),
            &conn,
        );

        assert_eq!(
            result,
            Err(Error::InvalidDateRange {
                start: date!(2024 - 03 - 11),
                end: date!(2024 - 03 - 10),
            })
        );
    }

    #[test]
    fn create_fails_on_invalid_account() {
        let Fixture {
            conn, category_id, ..
        } = get_fixture();

        let result = create_scheduled_transaction(
            ScheduledTransaction::build(
                999,
                dec!(1),
                category_id,
                Frequency::Daily,
                date!(2024 - 03 - 01),
                date!(2024 - 03 - 31),
            ),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidForeignKey));
    }

    #[test]
    fn get_missing_schedule_is_not_found() {
        let Fixture { conn, .. } = get_fixture();

        assert_eq!(get_scheduled_transaction(5, &conn), Err(Error::NotFound));
    }

    #[test]
    fn unknown_stored_frequency_is_invalid_frequency() {
        let Fixture {
            conn,
            account_id,
            category_id,
        } = get_fixture();
        let schedule = create_scheduled_transaction(
            ScheduledTransaction::build(
                account_id,
                dec!(1),
                category_id,
                Frequency::Daily,
                date!(2024 - 03 - 01),
                date!(2024 - 03 - 31),
            ),
            &conn,
        )
        .unwrap();
        conn.pragma_update(None, "foreign_keys", false).unwrap();
        conn.execute(
            "UPDATE scheduled_transaction SET frequency_id = 9 WHERE id = ?1",
            [schedule.id],
        )
        .unwrap();

        let result = get_scheduled_transaction(schedule.id, &conn);

        assert_eq!(result, Err(Error::InvalidFrequency(9)));
    }

    #[test]
    fn period_query_returns_windows_inside_period() {
        let Fixture {
            conn,
            account_id,
            category_id,
        } = get_fixture();
        let create = |start, end| {
            create_scheduled_transaction(
                ScheduledTransaction::build(
                    account_id,
                    dec!(1),
                    category_id,
                    Frequency::Daily,
                    start,
                    end,
                ),
                &conn,
            )
            .unwrap()
        };
        let inside = create(date!(2024 - 03 - 01), date!(2024 - 03 - 31));
        let _starts_before = create(date!(2024 - 02 - 01), date!(2024 - 03 - 31));
        let _ends_after = create(date!(2024 - 03 - 01), date!(2024 - 04 - 30));
        let other_account = create_account("Other", dec!(0), &conn).unwrap();
        create_scheduled_transaction(
            ScheduledTransaction::build(
                other_account.id,
                dec!(1),
                category_id,
                Frequency::Daily,
                date!(2024 - 03 - 05),
                date!(2024 - 03 - 06),
            ),
            &conn,
        )
        .unwrap();

        let got = get_scheduled_transactions_in_period(
            account_id,
            date!(2024 - 03 - 01),
            date!(2024 - 03 - 31),
            &conn,
        );

        assert_eq!(got, Ok(vec![inside]));
    }

    #[test]
    fn deactivate_and_reactivate() {
        let Fixture {
            conn,
            account_id,
            category_id,
        } = get_fixture();
        let schedule = create_scheduled_transaction(
            ScheduledTransaction::build(
                account_id,
                dec!(1),
                category_id,
                Frequency::Daily,
                date!(2024 - 03 - 01),
                date!(2024 - 03 - 31),
            ),
            &conn,
        )
        .unwrap();

        set_scheduled_transaction_active(schedule.id, false, &conn).unwrap();
        assert!(!get_scheduled_transaction(schedule.id, &conn).unwrap().is_active);

        set_scheduled_transaction_active(schedule.id, true, &conn).unwrap();
        assert!(get_scheduled_transaction(schedule.id, &conn).unwrap().is_active);
    }

    #[test]
    fn update_missing_schedule_fails() {
        let Fixture { conn, .. } = get_fixture();

        let result = set_scheduled_transaction_active(3, false, &conn);

        assert_eq!(result, Err(Error::UpdateMissingScheduledTransaction));
    }

    #[test]
    fn delete_succeeds() {
        let Fixture {
            conn,
            account_id,
            category_id,
        } = get_fixture();
        let schedule = create_scheduled_transaction(
            ScheduledTransaction::build(
                account_id,
                dec!(1),
                category_id,
                Frequency::Daily,
                date!(2024 - 03 - 01),
                date!(2024 - 03 - 31),
            ),
            &conn,
        )
        .unwrap();

        delete_scheduled_transaction(schedule.id, &conn).unwrap();

        assert_eq!(
            get_scheduled_transaction(schedule.id, &conn),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_missing_schedule_fails() {
        let Fixture { conn, .. } = get_fixture();

        let result = delete_scheduled_transaction(3, &conn);

        assert_eq!(result, Err(Error::DeleteMissingScheduledTransaction));
    }
}
