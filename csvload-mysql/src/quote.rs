/// Quotes an identifier for use in a MySQL statement.
///
/// Wraps the name in backticks and doubles any backtick it contains, so arbitrary header
/// names cannot break out of the identifier position.
pub fn quote_identifier(identifier: &str) -> String {
    let mut quoted = String::with_capacity(identifier.len() + 2);
    quoted.push('`');
    for c in identifier.chars() {
        if c == '`' {
            quoted.push('`');
        }
        quoted.push(c);
    }
    quoted.push('`');

    quoted
}

/// Quotes a possibly schema-qualified table name such as `db.table`.
pub fn quote_table_name(table: &str) -> String {
    table
        .split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}
