//! Ordered row inserts with same-batch foreign-key wiring

use indexmap::IndexMap;
use itertools::Itertools as _;
use sqlx::{Sqlite, SqliteConnection, sqlite::SqliteArguments};
use tracing::{debug, info};

use super::{Error, FieldDefinition, PRIMARY_KEY, RowValue};

/// A JSON value narrowed to what a column can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<&serde_json::Value> for SqlValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Integer(i),
                (None, Some(f)) => Self::Real(f),
                (None, None) => Self::Text(n.to_string()),
            },
            serde_json::Value::String(s) => Self::Text(s.clone()),
            // arrays and objects are kept as JSON text
            other => Self::Text(other.to_string()),
        }
    }
}

type ScalarQuery<'q> = sqlx::query::QueryScalar<'q, Sqlite, i64, SqliteArguments<'q>>;

fn bind(query: ScalarQuery<'_>, value: SqlValue) -> ScalarQuery<'_> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Boolean(b) => query.bind(b),
        SqlValue::Integer(i) => query.bind(i),
        SqlValue::Real(f) => query.bind(f),
        SqlValue::Text(s) => query.bind(s),
    }
}

/// One `INSERT … RETURNING id` for a single table of the batch.
#[derive(Debug, PartialEq)]
pub struct RowInsert {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<SqlValue>,
}

impl RowInsert {
    /// Builds the row of `table` from the values addressed to it.
    ///
    /// A foreign-key field whose referenced table already got an id in this
    /// batch takes that id, whatever the caller sent. Such fields are added
    /// even when the caller sent nothing for them. Returns `None` when no
    /// value targets the table.
    pub fn plan(
        table: &str,
        data: &[RowValue],
        fields: &[FieldDefinition],
        generated: &IndexMap<String, i64>,
    ) -> Option<Self> {
        let supplied = data
            .iter()
            .filter(|value| value.table == table)
            .collect::<Vec<_>>();
        if supplied.is_empty() {
            return None;
        }
        let definitions = fields
            .iter()
            .filter(|field| field.table == table)
            .collect::<Vec<_>>();
        let batch_id = |field: &FieldDefinition| {
            field
                .foreign_table()
                .and_then(|target| generated.get(target))
                .copied()
        };

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for value in &supplied {
            let wired = definitions
                .iter()
                .copied()
                .find(|field| field.is_named(&value.field))
                .and_then(batch_id);
            columns.push(value.field.clone());
            values.push(match wired {
                Some(id) => SqlValue::Integer(id),
                None => SqlValue::from(&value.value),
            });
        }
        for field in definitions.iter().copied() {
            if supplied.iter().any(|value| field.is_named(&value.field)) {
                continue;
            }
            if let Some(id) = batch_id(field) {
                columns.push(field.name.clone());
                values.push(SqlValue::Integer(id));
            }
        }

        Some(Self {
            table: table.to_owned(),
            columns,
            values,
        })
    }

    pub fn sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {PRIMARY_KEY}",
            self.table,
            self.columns.iter().join(", "),
            self.columns.iter().map(|_| "?").join(", "),
        )
    }

    pub async fn execute(self, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
        let sql = self.sql();
        self.values
            .into_iter()
            .fold(sqlx::query_scalar::<Sqlite, i64>(&sql), bind)
            .fetch_one(&mut *conn)
            .await
    }
}

/// Inserts one row per table following `order` and returns the generated ids.
/// Tables without values are skipped and get no id.
pub async fn insert_ordered(
    conn: &mut SqliteConnection,
    order: &[String],
    fields: &[FieldDefinition],
    data: &[RowValue],
) -> Result<IndexMap<String, i64>, Error> {
    let mut generated = IndexMap::new();
    for table in order {
        let Some(row) = RowInsert::plan(table, data, fields, &generated) else {
            debug!(%table, "no values for table, skipped");
            continue;
        };
        let id = row
            .execute(conn)
            .await
            .map_err(|source| Error::Insert {
                table: table.clone(),
                source,
            })?;
        info!(%table, id, "inserted row");
        generated.insert(table.clone(), id);
    }
    Ok(generated)
}
