//! Result column allocation with unique-name enforcement.

use crate::store::DefinitionNode;
use crate::table::{FeatureTable, FieldType, TableError};

/// Base column name for a composite node: its role (`IRI`, `RI`, `SVI`),
/// or for a theme its name reduced to `[A-Za-z0-9_]`.
pub fn base_name(node: &DefinitionNode, theme_prefix: &str) -> String {
    if let Some(role) = node.kind.role() {
        return role.to_string();
    }
    let cleaned: String = node
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        let prefix = theme_prefix.trim_end_matches('_');
        if prefix.is_empty() { "THEME".to_string() } else { prefix.to_string() }
    } else {
        format!("{}{}", theme_prefix, cleaned)
    }
}

fn truncate(name: &str, max_len: Option<usize>) -> String {
    match max_len {
        Some(max) => name.chars().take(max).collect(),
        None => name.to_string(),
    }
}

/// Adds a new double column named after `base`, suffixing `_1`, `_2`, ...
/// until the name is free. With `max_len`, the base is shortened so the
/// suffixed name still fits; once the suffix leaves no room for a single
/// character of the base, allocation fails with `NoFreeName`.
pub fn allocate_column<T: FeatureTable + ?Sized>(
    table: &mut T,
    base: &str,
    max_len: Option<usize>,
) -> Result<String, TableError> {
    let mut candidate = truncate(base, max_len);
    let mut counter = 1;

    while table.has_field(&candidate) {
        let suffix = format!("_{}", counter);
        let room = match max_len {
            Some(m) if suffix.len() >= m => {
                return Err(TableError::NoFreeName { base: base.to_string(), max_len: m });
            }
            Some(m) => Some(m - suffix.len()),
            None => None,
        };
        candidate = format!("{}{}", truncate(base, room), suffix);
        counter += 1;
    }

    table.add_column(&candidate, FieldType::Double)?;
    Ok(candidate)
}
