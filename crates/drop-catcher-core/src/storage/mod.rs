pub mod models;
pub mod queries;
pub mod sqlite;

pub use models::{MoveRecord, MoveStatus};
pub use sqlite::Database;

use crate::error::Error;

/// Durable log of move records. One insert per accepted file, then one final
/// upsert carrying the terminal outcome.
pub trait MoveRecordStore {
    fn insert(&self, record: &MoveRecord) -> Result<String, Error>;
    fn upsert(&self, record: &MoveRecord) -> Result<(), Error>;
}
