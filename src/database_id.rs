//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of a concrete transaction.
pub type TransactionId = DatabaseId;
/// The ID of a scheduled (recurring) transaction.
pub type ScheduledTransactionId = DatabaseId;
