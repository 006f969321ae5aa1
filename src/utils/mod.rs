//! Small shared helpers.

use crate::Result;
use serde::Serialize;

/// Pretty JSON with a four-space indent and non-ASCII characters left unescaped.
///
/// Both the token estimate for a value group and the JSON export use this shape.
pub fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json only ever writes UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_space_indent_and_raw_unicode() {
        let out = to_indented_json(&serde_json::json!([{ "Nombre": "Añejo" }])).unwrap();
        assert_eq!(out, "[\n    {\n        \"Nombre\": \"Añejo\"\n    }\n]");
    }
}
