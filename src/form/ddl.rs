//! Schema reconciliation
//!
//! Creates the tables of a batch that do not exist yet and adds the columns
//! that are missing from the ones that do. Running it twice over the same
//! definitions is a no-op.

use std::{collections::HashSet, fmt::Write as _};

use indexmap::IndexMap;
use itertools::Itertools as _;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::{CREATED_AT, Error, FieldDefinition, FieldType, PRIMARY_KEY};

/// Column type for a logical field type.
pub(crate) fn sql_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Number => "NUMERIC",
        FieldType::Text => "TEXT",
        FieldType::ShortText => "VARCHAR(150)",
        FieldType::Boolean => "BOOLEAN",
    }
}

fn write_column(out: &mut String, field: &FieldDefinition) -> std::fmt::Result {
    write!(out, "{} {}", field.name, sql_type(field.field_type))?;
    if let Some(target) = field.foreign_table() {
        write!(out, " REFERENCES {target}({PRIMARY_KEY})")?;
    }
    Ok(())
}

fn write_create_table(
    out: &mut String,
    table: &str,
    fields: &[&FieldDefinition],
) -> std::fmt::Result {
    writeln!(out, "CREATE TABLE IF NOT EXISTS {table} (")?;
    writeln!(out, "  {PRIMARY_KEY} INTEGER PRIMARY KEY AUTOINCREMENT,")?;
    write!(out, "  {CREATED_AT} TEXT DEFAULT CURRENT_TIMESTAMP")?;
    for field in fields {
        writeln!(out, ",")?;
        write!(out, "  ")?;
        write_column(out, field)?;
    }
    writeln!(out)?;
    write!(out, ")")
}

pub fn create_table(table: &str, fields: &[&FieldDefinition]) -> String {
    let mut out = String::new();
    write_create_table(&mut out, table, fields).expect("writing to a String cannot fail");
    out
}

pub fn add_column(table: &str, field: &FieldDefinition) -> String {
    let mut out = format!("ALTER TABLE {table} ADD COLUMN ");
    write_column(&mut out, field).expect("writing to a String cannot fail");
    out
}

/// Definitions of `table`, one per column, leaving out the managed columns.
fn table_columns<'a>(
    table: &str,
    fields: &'a [FieldDefinition],
) -> IndexMap<String, &'a FieldDefinition> {
    let mut columns = IndexMap::new();
    for field in fields.iter().filter(|field| field.table == table) {
        let name = field.name.to_lowercase();
        if name == PRIMARY_KEY || name == CREATED_AT {
            continue;
        }
        columns.entry(name).or_insert(field);
    }
    columns
}

/// SQLite resolves table names without regard to case, so the catalog lookup
/// does the same.
pub async fn table_exists(conn: &mut SqliteConnection, table: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE)",
    )
    .bind(table)
    .fetch_one(&mut *conn)
    .await
}

/// Lower-cased column names of an existing table.
pub async fn existing_columns(
    conn: &mut SqliteConnection,
    table: &str,
) -> Result<HashSet<String>, sqlx::Error> {
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;
    Ok(names.into_iter().map(|name| name.to_lowercase()).collect())
}

#[derive(Debug, Default, PartialEq)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub added_columns: Vec<(String, String)>,
}

impl ReconcileReport {
    pub fn is_unchanged(&self) -> bool {
        self.created.is_empty() && self.added_columns.is_empty()
    }
}

/// Brings every table of the batch up to its field definitions.
///
/// Statements run one by one on `conn`; a failure leaves the DDL already
/// applied for earlier tables in place.
pub async fn reconcile(
    conn: &mut SqliteConnection,
    tables: &[String],
    fields: &[FieldDefinition],
) -> Result<ReconcileReport, Error> {
    let mut report = ReconcileReport::default();
    for table in tables.iter().unique() {
        let schema_error = |source| Error::Schema {
            table: table.clone(),
            source,
        };
        let columns = table_columns(table, fields);

        if !table_exists(conn, table).await.map_err(schema_error)? {
            let sql = create_table(table, &columns.values().copied().collect::<Vec<_>>());
            debug!(%sql, "creating table");
            sqlx::query(&sql)
                .execute(&mut *conn)
                .await
                .map_err(schema_error)?;
            info!(%table, "created table");
            report.created.push(table.clone());
            continue;
        }

        let existing = existing_columns(conn, table).await.map_err(schema_error)?;
        for (name, field) in &columns {
            if existing.contains(name) {
                continue;
            }
            let sql = add_column(table, field);
            debug!(%sql, "adding column");
            sqlx::query(&sql)
                .execute(&mut *conn)
                .await
                .map_err(schema_error)?;
            info!(%table, column = %field.name, "added column");
            report
                .added_columns
                .push((table.clone(), field.name.clone()));
        }
    }
    Ok(report)
}
