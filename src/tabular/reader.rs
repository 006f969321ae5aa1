use crate::{Error, ErrorContext, Result};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Read one column from a CSV file with a header row.
///
/// Cells are trimmed; empty cells are dropped, and so are repeats of a value
/// already seen. First-seen order is kept.
pub fn read_column(path: impl AsRef<Path>, column: &str) -> Result<Vec<String>> {
    let file = std::fs::File::open(path.as_ref())?;
    read_column_from_reader(file, column).map_err(|e| match e {
        Error::Configuration { message, context } => Error::Configuration {
            message,
            context: context.with_source(path.as_ref().display().to_string()),
        },
        other => other,
    })
}

pub fn read_column_from_reader<R: Read>(reader: R, column: &str) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let idx = headers.iter().position(|h| h == column).ok_or_else(|| {
        Error::configuration_with_context(
            format!("column '{}' not found", column),
            ErrorContext::new()
                .with_field_path(column)
                .with_details(format!(
                    "available: {}",
                    headers.iter().collect::<Vec<_>>().join(", ")
                )),
        )
    })?;

    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for record in rdr.records() {
        let record = record?;
        match record.get(idx) {
            Some(cell) if !cell.is_empty() => {
                if seen.insert(cell.to_string()) {
                    values.push(cell.to_string());
                }
            }
            _ => {}
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_blanks_and_duplicates_keeping_order() {
        let data = "id,Fruit\n1,banana\n2,\n3, apple \n4,banana\n5\n6,Cherry\n";
        let values = read_column_from_reader(data.as_bytes(), "Fruit").unwrap();
        assert_eq!(values, vec!["banana", "apple", "Cherry"]);
    }

    #[test]
    fn test_missing_column_lists_headers() {
        let err = read_column_from_reader("a,b\n1,2\n".as_bytes(), "c").unwrap_err();
        let ctx = err.context().unwrap();
        assert_eq!(ctx.field_path.as_deref(), Some("c"));
        assert_eq!(ctx.details.as_deref(), Some("available: a, b"));
    }

    #[test]
    fn test_numeric_cells_keep_their_text() {
        let values = read_column_from_reader("code\n1501\n1502\n1501\n".as_bytes(), "code").unwrap();
        assert_eq!(values, vec!["1501", "1502"]);
    }
}
