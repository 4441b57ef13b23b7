//
// formula.rs
//
// Field-reference extraction from formula expressions
//

use std::sync::OnceLock;

use regex::Regex;

/// Field-id token: fixed `fld` prefix followed by a 10-character suffix.
fn field_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"fld\w{10}").expect("field id pattern is valid"))
}

/// Extract every field id referenced by a formula expression.
///
/// This is the single place the token rule lives; the closure resolver only
/// sees the resulting id list. Malformed or reference-free expressions yield
/// an empty list, never an error — one broken formula must not abort closure
/// computation for the rest of the document.
pub fn extract_referenced_field_ids(expression: &str) -> Vec<String> {
    field_id_pattern()
        .find_iter(expression)
        .map(|m| m.as_str().to_string())
        .collect()
}
