//! CSV provider: loads a delimited table, exposes a text column for scoring,
//! and writes the table back with a score column.

mod delimiter;
mod errors;
mod table;

pub use delimiter::parse_delimiter;
pub use errors::CsvProviderError;
pub use table::{ColumnPlacement, CsvTable};
