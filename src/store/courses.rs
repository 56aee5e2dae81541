use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use super::{Error, default_active, delete_by_id};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Course {
    pub id: i64,
    pub codigo: String,
    pub descripcion: String,
    pub duracion_horas: Option<i64>,
    pub nivel: Option<i64>,
    pub activo: bool,
    pub observaciones: Option<String>,
    pub fecha_creacion: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseInput {
    pub codigo: String,
    pub descripcion: String,
    #[serde(default = "default_hours")]
    pub duracion_horas: Option<i64>,
    #[serde(default)]
    pub nivel: Option<i64>,
    #[serde(default = "default_active")]
    pub activo: bool,
    #[serde(default)]
    pub observaciones: Option<String>,
}

fn default_hours() -> Option<i64> {
    Some(50)
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CourseOption {
    pub id: i64,
    pub codigo: String,
    pub descripcion: String,
}

const COLUMNS: &str =
    "id, codigo, descripcion, duracion_horas, nivel, activo, observaciones, fecha_creacion";
const DUPLICATE: &str = "the course is already registered";

pub async fn list(pool: &SqlitePool) -> Result<Vec<Course>, Error> {
    let sql = format!("SELECT {COLUMNS} FROM cursos ORDER BY id ASC");
    Ok(sqlx::query_as::<_, Course>(&sql).fetch_all(pool).await?)
}

pub async fn create(pool: &SqlitePool, input: &CourseInput) -> Result<Course, Error> {
    let sql = format!(
        "INSERT INTO cursos (codigo, descripcion, duracion_horas, nivel, activo, observaciones) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let course = sqlx::query_as::<_, Course>(&sql)
        .bind(&input.codigo)
        .bind(&input.descripcion)
        .bind(input.duracion_horas)
        .bind(input.nivel)
        .bind(input.activo)
        .bind(&input.observaciones)
        .fetch_one(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?;
    info!(id = course.id, codigo = %course.codigo, "created course");
    Ok(course)
}

pub async fn update(pool: &SqlitePool, id: i64, input: &CourseInput) -> Result<Course, Error> {
    let sql = format!(
        "UPDATE cursos SET codigo = ?, descripcion = ?, duracion_horas = ?, nivel = ?, \
         activo = ?, observaciones = ? WHERE id = ? RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Course>(&sql)
        .bind(&input.codigo)
        .bind(&input.descripcion)
        .bind(input.duracion_horas)
        .bind(input.nivel)
        .bind(input.activo)
        .bind(&input.observaciones)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?
        .ok_or(Error::NotFound { entity: "course", id })
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), Error> {
    delete_by_id(pool, "cursos", "course", id).await?;
    info!(id, "deleted course");
    Ok(())
}

/// Nominal duration of a course, `None` when the course has none.
pub async fn duration(pool: &SqlitePool, id: i64) -> Result<Option<i64>, Error> {
    sqlx::query_scalar::<_, Option<i64>>("SELECT duracion_horas FROM cursos WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound { entity: "course", id })
}

pub async fn options(pool: &SqlitePool) -> Result<Vec<CourseOption>, Error> {
    Ok(sqlx::query_as::<_, CourseOption>(
        "SELECT id, codigo, descripcion FROM cursos WHERE activo = 1 ORDER BY descripcion ASC",
    )
    .fetch_all(pool)
    .await?)
}
