//! Column input and result export.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`read_column`] | One named CSV column, trimmed, without blanks or duplicates |
//! | [`write_json`] | The result collection as a JSON array of `{target, source}` objects |
//! | [`write_csv`] | The same records as a two-column CSV |

mod export;
mod reader;

pub use export::{write_csv, write_json};
pub use reader::{read_column, read_column_from_reader};
