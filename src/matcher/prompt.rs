//! Prompt text for one matching request.

/// Build the single-turn prompt for one batch.
///
/// `source_json` is the whole source column as a JSON array of strings and
/// `batch_json` the batch as `[{target_field: value}, ...]`.
pub fn build_prompt(
    source_field: &str,
    source_json: &str,
    target_field: &str,
    batch_json: &str,
) -> String {
    format!(
        "Source list ({source_field}): {source_json}\n\n\
         Entries to match ({target_field}): {batch_json}\n\n\
         For every entry, pick the single closest value from the source list. Copy both \
         values exactly as they appear, keeping their original spelling and formatting. \
         Reply with a JSON array only, one object per entry, shaped like:\n\n\
         {{\n  \"{target_field}\": \"value_from_entries\",\n  \"{source_field}\": \"matched_value_from_source_or_blank\"\n}}\n\n\
         When no source value is a suitable match, use an empty string (\"\") as the matched value. \
         Do not add explanations, extra keys, trailing commas or any text outside the array."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_both_lists_and_field_names() {
        let p = build_prompt(
            "Catalog",
            r#"["Apple","Banana"]"#,
            "Fruit",
            r#"[{"Fruit":"apple"}]"#,
        );
        assert!(p.contains(r#"Source list (Catalog): ["Apple","Banana"]"#));
        assert!(p.contains(r#"Entries to match (Fruit): [{"Fruit":"apple"}]"#));
        assert!(p.contains("\"Catalog\": \"matched_value_from_source_or_blank\""));
        assert!(p.contains("empty string"));
    }
}
