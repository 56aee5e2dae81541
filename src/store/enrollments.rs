use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use super::{Error, default_active, delete_by_id};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Enrollment {
    pub id: i64,
    pub ediciones_cursos_id: i64,
    pub activo: bool,
    pub alumno_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentInput {
    pub ediciones_cursos_id: i64,
    #[serde(default = "default_active")]
    pub activo: bool,
    pub alumno_id: i64,
}

const COLUMNS: &str = "id, ediciones_cursos_id, activo, alumno_id";
const DUPLICATE: &str = "the student is already enrolled in this edition";

pub async fn list(pool: &SqlitePool) -> Result<Vec<Enrollment>, Error> {
    let sql = format!("SELECT {COLUMNS} FROM matriculasalumnos ORDER BY id ASC");
    Ok(sqlx::query_as::<_, Enrollment>(&sql).fetch_all(pool).await?)
}

async fn ensure_unique(
    pool: &SqlitePool,
    input: &EnrollmentInput,
    id: Option<i64>,
) -> Result<(), Error> {
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM matriculasalumnos \
         WHERE ediciones_cursos_id = ? AND alumno_id = ? AND id IS NOT ?)",
    )
    .bind(input.ediciones_cursos_id)
    .bind(input.alumno_id)
    .bind(id)
    .fetch_one(pool)
    .await?;
    if taken {
        Err(Error::Duplicate(DUPLICATE))
    } else {
        Ok(())
    }
}

pub async fn create(pool: &SqlitePool, input: &EnrollmentInput) -> Result<Enrollment, Error> {
    ensure_unique(pool, input, None).await?;
    let sql = format!(
        "INSERT INTO matriculasalumnos (ediciones_cursos_id, activo, alumno_id) \
         VALUES (?, ?, ?) RETURNING {COLUMNS}"
    );
    let enrollment = sqlx::query_as::<_, Enrollment>(&sql)
        .bind(input.ediciones_cursos_id)
        .bind(input.activo)
        .bind(input.alumno_id)
        .fetch_one(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?;
    info!(
        id = enrollment.id,
        edition = enrollment.ediciones_cursos_id,
        student = enrollment.alumno_id,
        "enrolled student"
    );
    Ok(enrollment)
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    input: &EnrollmentInput,
) -> Result<Enrollment, Error> {
    ensure_unique(pool, input, Some(id)).await?;
    let sql = format!(
        "UPDATE matriculasalumnos SET ediciones_cursos_id = ?, activo = ?, alumno_id = ? \
         WHERE id = ? RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Enrollment>(&sql)
        .bind(input.ediciones_cursos_id)
        .bind(input.activo)
        .bind(input.alumno_id)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?
        .ok_or(Error::NotFound {
            entity: "enrollment",
            id,
        })
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), Error> {
    delete_by_id(pool, "matriculasalumnos", "enrollment", id).await?;
    info!(id, "deleted enrollment");
    Ok(())
}
