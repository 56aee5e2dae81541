use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use super::{Error, default_active, delete_by_id};

/// Entry of the document index (`indice`).
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Document {
    pub id: i64,
    pub enlace: String,
    pub fecha_creacion: Option<String>,
    pub activo: bool,
    pub tema: String,
    pub curso: String,
    pub autor: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInput {
    pub enlace: String,
    #[serde(default = "default_active")]
    pub activo: bool,
    pub tema: String,
    pub curso: String,
    pub autor: String,
}

const COLUMNS: &str = "id, enlace, fecha_creacion, activo, tema, curso, autor";

/// Links are absolute URLs or server paths such as `/uploads/pdfs/a.pdf`.
pub fn is_valid_link(link: &str) -> bool {
    link.starts_with('/') || url::Url::parse(link).is_ok_and(|url| url.has_host())
}

fn validate(input: &DocumentInput) -> Result<(), Error> {
    if is_valid_link(&input.enlace) {
        Ok(())
    } else {
        Err(Error::InvalidLink(input.enlace.clone()))
    }
}

/// Newest first.
pub async fn list(pool: &SqlitePool) -> Result<Vec<Document>, Error> {
    let sql = format!("SELECT {COLUMNS} FROM indice ORDER BY id DESC");
    Ok(sqlx::query_as::<_, Document>(&sql).fetch_all(pool).await?)
}

pub async fn create(pool: &SqlitePool, input: &DocumentInput) -> Result<Document, Error> {
    validate(input)?;
    let sql = format!(
        "INSERT INTO indice (enlace, activo, tema, curso, autor) VALUES (?, ?, ?, ?, ?) \
         RETURNING {COLUMNS}"
    );
    let document = sqlx::query_as::<_, Document>(&sql)
        .bind(&input.enlace)
        .bind(input.activo)
        .bind(&input.tema)
        .bind(&input.curso)
        .bind(&input.autor)
        .fetch_one(pool)
        .await?;
    info!(id = document.id, tema = %document.tema, "indexed document");
    Ok(document)
}

pub async fn update(pool: &SqlitePool, id: i64, input: &DocumentInput) -> Result<Document, Error> {
    validate(input)?;
    let sql = format!(
        "UPDATE indice SET enlace = ?, activo = ?, tema = ?, curso = ?, autor = ? \
         WHERE id = ? RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Document>(&sql)
        .bind(&input.enlace)
        .bind(input.activo)
        .bind(&input.tema)
        .bind(&input.curso)
        .bind(&input.autor)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound {
            entity: "document",
            id,
        })
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), Error> {
    delete_by_id(pool, "indice", "document", id).await?;
    info!(id, "removed document from the index");
    Ok(())
}
