//! Identifier and literal rendering for namespace tables.
//!
//! Table names and vector literals cannot be bound as parameters in OceanBase
//! DDL and distance expressions, so they are validated and inlined here.

use std::fmt::Write;

use crate::error::{VectorDbError, VectorDbResult};

/// MySQL identifier length limit
const MAX_IDENTIFIER_LEN: usize = 64;

/// Physical table name for `namespace`
pub fn table_name(prefix: &str, namespace: &str) -> VectorDbResult<String> {
    if namespace.is_empty() {
        return Err(VectorDbError::InvalidArgument(
            "namespace name is required".to_string(),
        ));
    }
    if namespace.chars().any(char::is_control) {
        return Err(VectorDbError::InvalidArgument(format!(
            "namespace {:?} contains control characters",
            namespace
        )));
    }

    let table = format!("{}{}", prefix, namespace);
    if table.chars().count() > MAX_IDENTIFIER_LEN {
        return Err(VectorDbError::InvalidArgument(format!(
            "namespace {:?} is too long for a table name",
            namespace
        )));
    }
    Ok(table)
}

/// Namespace part of a physical table name, if it follows the naming convention
pub fn namespace_of<'a>(prefix: &str, table: &'a str) -> Option<&'a str> {
    // Servers running with lower_case_table_names=1 report `vtb_ws1` for `VTB_ws1`
    let head = table.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    table.get(prefix.len()..).filter(|ns| !ns.is_empty())
}

/// Backtick-quoted identifier
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `LIKE` pattern matching every table that starts with `prefix`
pub fn prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 2);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `'[0.1,0.2,...]'` vector literal
pub fn vector_literal(values: &[f32]) -> VectorDbResult<String> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(VectorDbError::InvalidArgument(
            "vector contains a non-finite component".to_string(),
        ));
    }

    let mut literal = String::with_capacity(values.len() * 10 + 4);
    literal.push_str("'[");
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            literal.push(',');
        }
        let _ = write!(literal, "{}", v);
    }
    literal.push_str("]'");
    Ok(literal)
}

/// Dimension from an information_schema column type such as `vector(1536)`
pub fn parse_vector_dimension(column_type: &str) -> Option<usize> {
    let lower = column_type.trim().to_ascii_lowercase();
    lower
        .strip_prefix("vector(")?
        .strip_suffix(')')?
        .trim()
        .parse()
        .ok()
}
