use crate::batch::ResultCollection;
use crate::utils::to_indented_json;
use crate::Result;
use std::path::Path;

/// Write the records as a JSON array of `{target_field, source_field}` objects.
pub fn write_json(
    path: impl AsRef<Path>,
    collection: &ResultCollection,
    target_field: &str,
    source_field: &str,
) -> Result<()> {
    let doc = collection.to_json(target_field, source_field);
    std::fs::write(path, to_indented_json(&doc)?)?;
    Ok(())
}

/// Write the records as CSV with a `target_field,source_field` header.
pub fn write_csv(
    path: impl AsRef<Path>,
    collection: &ResultCollection,
    target_field: &str,
    source_field: &str,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([target_field, source_field])?;
    for record in collection.records() {
        wtr.write_record([record.target.as_str(), record.source.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}
