//! Money amounts are stored as decimal strings in SQLite so that no precision
//! is lost to floating point.

use std::str::FromStr;

use rusqlite::{Row, types::Type};
use rust_decimal::Decimal;

/// Read the decimal amount stored as text in column `index` of `row`.
pub(crate) fn get_amount(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let raw: String = row.get(index)?;

    Decimal::from_str(&raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use super::get_amount;

    #[test]
    fn reads_decimal_text() {
        let conn = Connection::open_in_memory().unwrap();

        let amount = conn
            .query_row("SELECT '-1234.56'", [], |row| get_amount(row, 0))
            .unwrap();

        assert_eq!(amount, dec!(-1234.56));
    }

    #[test]
    fn rejects_non_numeric_text() {
        let conn = Connection::open_in_memory().unwrap();

        let result = conn.query_row("SELECT 'twelve'", [], |row| get_amount(row, 0));

        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(0, _, _))
        ));
    }
}
