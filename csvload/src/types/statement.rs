use csvload_mysql::quote::{quote_identifier, quote_table_name};

use crate::types::Header;

/// Parameterized insert derived once from the header and shared by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    table: String,
    header: Header,
    sql: String,
    placeholder_count: usize,
}

impl InsertStatement {
    /// Builds `INSERT INTO <table> (<cols>) VALUES (?, ...)` with one placeholder per column.
    ///
    /// Identifiers are quoted with backticks, so header names need not be valid bare MySQL
    /// identifiers.
    pub fn new(table: &str, header: Header) -> Self {
        let columns = header
            .columns()
            .iter()
            .map(|column| quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholder_count = header.arity();
        let placeholders = vec!["?"; placeholder_count].join(", ");

        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote_table_name(table)
        );

        Self {
            table: table.to_string(),
            header,
            sql,
            placeholder_count,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of positional parameters the statement binds.
    pub fn placeholder_count(&self) -> usize {
        self.placeholder_count
    }
}
