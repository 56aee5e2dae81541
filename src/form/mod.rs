//! Dynamic relational form processor
//!
//! Takes a batch of logical tables, their field definitions and a flat list of
//! values, makes sure the tables exist with the right columns, and inserts one
//! row per table in foreign-key order inside a single transaction.

pub mod ddl;
pub mod insert;
pub mod naming;
pub mod order;
pub mod transform;

use std::{
    collections::HashSet,
    sync::{Arc, LazyLock, Mutex},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::{Connection as _, SqliteConnection};
use tracing::{debug, error, info, warn};

pub use naming::{NamingConvention, SuffixConvention};
pub use transform::ValueTransformer;

/// Surrogate primary key every managed table carries.
pub const PRIMARY_KEY: &str = "id";
/// Creation timestamp column every managed table carries.
pub const CREATED_AT: &str = "fecha_creacion";

static IDENTIFIER: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*$").expect("identifier pattern is valid")
});

/// Table and column names end up inside DDL/DML text, so they are restricted
/// to unquoted SQL identifiers: letters, digits and underscores.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Text,
    #[serde(rename = "varchar", alias = "short-text")]
    ShortText,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(rename = "type", alias = "tipo")]
    pub field_type: FieldType,
    #[serde(alias = "tabla")]
    pub table: String,
    #[serde(default, alias = "esClaveForanea")]
    pub is_foreign_key: bool,
    #[serde(
        default,
        alias = "tablaReferenciada",
        skip_serializing_if = "Option::is_none"
    )]
    pub referenced_table: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type,
            table: table.into(),
            is_foreign_key: false,
            referenced_table: None,
        }
    }

    pub fn references(mut self, table: impl Into<String>) -> Self {
        self.is_foreign_key = true;
        self.referenced_table = Some(table.into());
        self
    }

    /// Referenced table. Naming one makes the field a foreign key whether or
    /// not the flag is set.
    pub fn foreign_table(&self) -> Option<&str> {
        self.referenced_table.as_deref()
    }

    pub(crate) fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowValue {
    #[serde(alias = "campo")]
    pub field: String,
    #[serde(alias = "tabla")]
    pub table: String,
    #[serde(default, alias = "valor")]
    pub value: serde_json::Value,
}

impl RowValue {
    pub fn new(
        field: impl Into<String>,
        table: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            table: table.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormRequest {
    #[serde(default, alias = "tablas")]
    pub tables: Vec<String>,
    #[serde(default, alias = "campos")]
    pub fields: Vec<FieldDefinition>,
    #[serde(default, alias = "datos")]
    pub data: Vec<RowValue>,
}

impl FormRequest {
    /// Shape checks that do not need the database. Every problem is reported,
    /// not only the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        if self.tables.is_empty() {
            problems.push("\"tables\" must list at least one table".to_owned());
        }
        if self.fields.is_empty() {
            problems.push("\"fields\" must define at least one field".to_owned());
        }
        if self.data.is_empty() {
            problems.push("\"data\" must carry at least one value".to_owned());
        }
        for table in &self.tables {
            if !is_identifier(table) {
                problems.push(format!("invalid table name: {table:?}"));
            }
        }
        for field in &self.fields {
            if !is_identifier(&field.name) {
                problems.push(format!("invalid field name: {:?}", field.name));
            }
            if let Some(referenced) = &field.referenced_table {
                if !is_identifier(referenced) {
                    problems.push(format!("invalid referenced table: {referenced:?}"));
                }
            }
        }
        for value in &self.data {
            if !is_identifier(&value.field) {
                problems.push(format!("invalid field name: {:?}", value.field));
            }
            if !self.tables.contains(&value.table) {
                problems.push(format!(
                    "value for {} targets table {} which is not in the batch",
                    value.field, value.table
                ));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_ids: Option<IndexMap<String, i64>>,
}

impl ProcessingResult {
    pub fn success(generated_ids: IndexMap<String, i64>) -> Self {
        Self {
            success: true,
            message: "Form data saved".to_owned(),
            errors: None,
            generated_ids: Some(generated_ids),
        }
    }

    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Some(errors),
            generated_ids: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid form: {}", .0.join("; "))]
    InvalidInput(Vec<String>),
    #[error("field {field} of table {table} is a foreign key without a referenced table")]
    MissingReference { table: String, field: String },
    #[error("failed to acquire a database connection: {0}")]
    Acquire(sqlx::Error),
    #[error("schema reconciliation failed for table {table}: {source}")]
    Schema { table: String, source: sqlx::Error },
    #[error("circular dependency detected at table: {0}")]
    CircularDependency(String),
    #[error("failed to hash field {field}: {source}")]
    Hash {
        field: String,
        source: bcrypt::BcryptError,
    },
    #[error("value transformation aborted: {0}")]
    TransformTask(tokio::task::JoinError),
    #[error("insert into {table} failed: {source}")]
    Insert { table: String, source: sqlx::Error },
    #[error("transaction failed: {0}")]
    Transaction(sqlx::Error),
}

/// Step of a single processing call, used to tag log lines.
#[derive(Debug, Clone, Copy)]
enum Stage {
    DetectingForeignKeys,
    ReconcilingSchema,
    OrderingTables,
    TransformingValues,
    InsertingRows,
    Committed,
    RolledBack,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DetectingForeignKeys => "detecting_foreign_keys",
            Self::ReconcilingSchema => "reconciling_schema",
            Self::OrderingTables => "ordering_tables",
            Self::TransformingValues => "transforming_values",
            Self::InsertingRows => "inserting_rows",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// Batch shapes whose schema is known to be in place.
///
/// Shapes come from clients, so the set is emptied once it reaches its
/// capacity. A forgotten shape only costs one more catalog lookup.
#[derive(Debug)]
struct ReconcileCache {
    seen: Mutex<HashSet<blake3::Hash>>,
    capacity: usize,
}

impl ReconcileCache {
    const CAPACITY: usize = 1024;

    fn new(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            capacity,
        }
    }

    fn contains(&self, key: &blake3::Hash) -> bool {
        self.seen
            .lock()
            .map(|seen| seen.contains(key))
            .unwrap_or(false)
    }

    fn record(&self, key: blake3::Hash) {
        if let Ok(mut seen) = self.seen.lock() {
            if seen.len() >= self.capacity {
                debug!(entries = seen.len(), "reconcile cache full, clearing");
                seen.clear();
            }
            seen.insert(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }
}

pub struct FormProcessor {
    pool: sqlx::SqlitePool,
    naming: Arc<dyn NamingConvention>,
    transformer: ValueTransformer,
    reconciled: ReconcileCache,
}

impl FormProcessor {
    pub fn new(
        pool: sqlx::SqlitePool,
        naming: Arc<dyn NamingConvention>,
        transformer: ValueTransformer,
    ) -> Self {
        Self {
            pool,
            naming,
            transformer,
            reconciled: ReconcileCache::new(ReconcileCache::CAPACITY),
        }
    }

    pub fn transformer(&self) -> &ValueTransformer {
        &self.transformer
    }

    /// Runs the whole pipeline and folds every failure into the result.
    pub async fn process(&self, request: &FormRequest) -> ProcessingResult {
        match self.try_process(request).await {
            Ok(ids) => {
                info!(tables = ids.len(), "form processed");
                ProcessingResult::success(ids)
            }
            Err(Error::InvalidInput(problems)) => {
                warn!(?problems, "rejected form");
                ProcessingResult::failure("Invalid form", problems)
            }
            Err(error) => {
                error!(%error, "form processing failed");
                ProcessingResult::failure("Failed to process the form", vec![error.to_string()])
            }
        }
    }

    pub async fn try_process(&self, request: &FormRequest) -> Result<IndexMap<String, i64>, Error> {
        request.validate().map_err(Error::InvalidInput)?;

        debug!(stage = %Stage::DetectingForeignKeys);
        let fields = naming::detect_foreign_keys(self.naming.as_ref(), &request.fields)?;

        let mut conn = self.pool.acquire().await.map_err(Error::Acquire)?;

        debug!(stage = %Stage::ReconcilingSchema);
        self.reconcile_once(&mut conn, &request.tables, &fields)
            .await?;

        let mut tx = conn.begin().await.map_err(Error::Transaction)?;
        match self.insert_batch(&mut tx, request, &fields).await {
            Ok(ids) => {
                tx.commit().await.map_err(Error::Transaction)?;
                debug!(stage = %Stage::Committed, ?ids);
                Ok(ids)
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback().await {
                    error!(error = %rollback, "rollback failed");
                }
                debug!(stage = %Stage::RolledBack);
                Err(error)
            }
        }
    }

    async fn reconcile_once(
        &self,
        conn: &mut SqliteConnection,
        tables: &[String],
        fields: &[FieldDefinition],
    ) -> Result<(), Error> {
        let key = fingerprint(tables, fields);
        if self.reconciled.contains(&key) {
            debug!(%key, "schema already reconciled");
            return Ok(());
        }
        let report = ddl::reconcile(conn, tables, fields).await?;
        if !report.is_unchanged() {
            info!(created = ?report.created, added = ?report.added_columns, "schema evolved");
        }
        self.reconciled.record(key);
        Ok(())
    }

    /// `fields` carry the detected foreign keys.
    async fn insert_batch(
        &self,
        conn: &mut SqliteConnection,
        request: &FormRequest,
        fields: &[FieldDefinition],
    ) -> Result<IndexMap<String, i64>, Error> {
        debug!(stage = %Stage::OrderingTables);
        let order = order::order_tables(&request.tables, fields)?;
        debug!(?order, "insert order");

        debug!(stage = %Stage::TransformingValues);
        let transformer = self.transformer.clone();
        let data = request.data.clone();
        let data = tokio::task::spawn_blocking(move || transformer.apply(data))
            .await
            .map_err(Error::TransformTask)??;

        debug!(stage = %Stage::InsertingRows);
        insert::insert_ordered(conn, &order, fields, &data).await
    }
}

/// Identity of a `(tables, fields)` set, independent of listing order.
pub fn fingerprint(tables: &[String], fields: &[FieldDefinition]) -> blake3::Hash {
    let mut tables = tables.iter().map(String::as_str).collect::<Vec<_>>();
    tables.sort_unstable();
    tables.dedup();
    let mut fields = fields
        .iter()
        .map(|field| {
            format!(
                "{}.{}:{:?}:{}",
                field.table,
                field.name.to_lowercase(),
                field.field_type,
                field.foreign_table().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>();
    fields.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for table in tables {
        hasher.update(table.as_bytes());
        hasher.update(&[0]);
    }
    hasher.update(&[1]);
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}
