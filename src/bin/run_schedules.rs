use std::{error::Error, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;
use time::{Date, OffsetDateTime, macros::format_description};
use tokio::signal;

use scheduled_transactions::{
    BatchReport, Clock, FixedClock, SystemClock, initialize_db, logging::setup_logging,
    process_scheduled_transactions,
};

/// How long to wait before retrying a run that failed.
const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(5 * 60);

/// Create the transactions for every scheduled transaction that is due today.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DB_PATH")]
    db_path: String,

    /// The canonical timezone that decides what "today" is, e.g. "Pacific/Auckland".
    #[arg(long, env = "TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// Process schedules for this date (YYYY-MM-DD) instead of today.
    #[arg(long, value_parser = parse_date, conflicts_with = "daemon")]
    date: Option<Date>,

    /// Keep running and process schedules again after every midnight.
    #[arg(long)]
    daemon: bool,

    /// Print the report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();
    validate_db_path(Path::new(&args.db_path));

    let clock = SystemClock::new(&args.timezone)?;

    let mut conn = Connection::open(&args.db_path)?;
    initialize_db(&conn)?;

    if let Some(date) = args.date {
        let report = process_scheduled_transactions(&mut conn, &FixedClock::at_date(date))?;
        print_report(&report, args.json)?;
        return Ok(());
    }

    if !args.daemon {
        let report = process_scheduled_transactions(&mut conn, &clock)?;
        print_report(&report, args.json)?;
        return Ok(());
    }

    tracing::info!("Processing scheduled transactions daily ({})", args.timezone);

    loop {
        let wait = match process_scheduled_transactions(&mut conn, &clock) {
            Ok(report) => {
                print_report(&report, args.json)?;
                until_next_midnight(clock.now())
            }
            Err(error) => {
                tracing::error!("Could not process scheduled transactions: {error}");
                retry_delay(clock.now())
            }
        };
        tracing::debug!("Sleeping for {wait:?}");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {},
            _ = shutdown_signal() => {
                tracing::info!("Shutting down.");
                return Ok(());
            }
        }
    }
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
}

fn validate_db_path(db_path: &Path) {
    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}!");
        exit(1);
    }
}

/// The time left until just after the next midnight in `now`'s offset.
fn until_next_midnight(now: OffsetDateTime) -> std::time::Duration {
    let next_midnight = now
        .date()
        .next_day()
        .map(|day| day.midnight().assume_offset(now.offset()))
        .unwrap_or(now);

    (next_midnight - now + time::Duration::seconds(1)).unsigned_abs()
}

/// Wait [RETRY_DELAY] after a failed run, but no longer than the next regular run.
fn retry_delay(now: OffsetDateTime) -> std::time::Duration {
    RETRY_DELAY.min(until_next_midnight(now))
}

fn print_report(report: &BatchReport, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for transaction in &report.transactions {
        tracing::info!(
            "Created transaction {} ({} on account {}) from schedule {:?}",
            transaction.id,
            transaction.amount,
            transaction.account_id,
            transaction.scheduled_transaction_id
        );
    }
    tracing::info!(
        "Created {} transaction(s) for {}",
        report.transactions.len(),
        report.date
    );

    Ok(())
}

/// Wait for either the ctrl+c or terminate signal, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::debug!("Received ctrl+c signal."),
        _ = terminate => tracing::debug!("Received terminate signal."),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::{RETRY_DELAY, parse_date, retry_delay, until_next_midnight};

    #[test]
    fn parses_iso_date() {
        assert_eq!(parse_date("2024-03-10").ok(), Some(date!(2024 - 03 - 10)));
        assert!(parse_date("10.03.2024").is_err());
    }

    #[test]
    fn sleeps_until_just_after_midnight() {
        let wait = until_next_midnight(datetime!(2024-03-10 23:00 +13:00));

        assert_eq!(wait, std::time::Duration::from_secs(3601));
    }

    #[test]
    fn retries_failed_run_after_short_delay() {
        assert_eq!(retry_delay(datetime!(2024-03-10 12:00 UTC)), RETRY_DELAY);
    }

    #[test]
    fn retry_does_not_skip_past_midnight() {
        let wait = retry_delay(datetime!(2024-03-10 23:59 UTC));

        assert_eq!(wait, std::time::Duration::from_secs(61));
    }
}
