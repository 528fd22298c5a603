use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};

use scheduled_transactions::{
    Frequency, ScheduledTransaction, account::create_account, category::create_category,
    initialize_db, scheduled_transaction::create_scheduled_transaction,
};

/// A utility for creating a test database with sample scheduled transactions.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test accounts and categories...");

    let everyday = create_account("Everyday", Decimal::new(250_000, 2), &conn)?;
    let savings = create_account("Savings", Decimal::new(1_000_000, 2), &conn)?;
    let wages = create_category("Wages", &conn)?;
    let rent = create_category("Rent", &conn)?;
    let subscriptions = create_category("Subscriptions", &conn)?;
    let transfers = create_category("Transfers", &conn)?;

    println!("Creating test schedules...");

    let today = OffsetDateTime::now_utc().date();
    let start = today - Duration::days(30);
    let end = today + Duration::days(365);

    let schedules = [
        ScheduledTransaction::build(
            everyday.id,
            Decimal::new(320_000, 2),
            wages.id,
            Frequency::Monthly,
            start,
            end,
        )
        .reference("Salary"),
        ScheduledTransaction::build(
            everyday.id,
            Decimal::new(-55_000, 2),
            rent.id,
            Frequency::Weekly,
            start,
            end,
        )
        .reference("Rent"),
        ScheduledTransaction::build(
            everyday.id,
            Decimal::new(-1_799, 2),
            subscriptions.id,
            Frequency::Yearly,
            start,
            end,
        )
        .reference("Streaming"),
        ScheduledTransaction::build(
            everyday.id,
            Decimal::new(-10_000, 2),
            transfers.id,
            Frequency::Weekly,
            start,
            end,
        )
        .reference("Savings")
        .offset_account_id(Some(savings.id)),
        ScheduledTransaction::build(
            everyday.id,
            Decimal::new(-4_500, 2),
            subscriptions.id,
            Frequency::Once,
            today + Duration::days(1),
            today + Duration::days(1),
        )
        .reference("Concert tickets"),
    ];

    for schedule in schedules {
        create_scheduled_transaction(schedule, &conn)?;
    }

    println!("Success!");

    Ok(())
}
