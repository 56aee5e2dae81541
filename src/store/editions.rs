//! Course editions: a course taught by a tutor between two dates.
//!
//! Writes are checked against the working-day hours rule before they reach
//! the table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{info, warn};

use super::{Error, courses, default_active, delete_by_id};
use crate::schedule::{self, HoursCheck};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Edition {
    pub id: i64,
    pub curso_id: i64,
    pub activo: bool,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub tutor_id: Option<i64>,
    pub maximo_alumnos: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditionInput {
    pub curso_id: i64,
    #[serde(default = "default_active")]
    pub activo: bool,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    #[serde(default)]
    pub tutor_id: Option<i64>,
    #[serde(default)]
    pub maximo_alumnos: Option<i64>,
}

/// Active edition with the description of its course, for enrollment forms.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct EditionOption {
    pub id: i64,
    pub curso_id: i64,
    pub descripcion: String,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
    pub tutor_id: Option<i64>,
    pub maximo_alumnos: Option<i64>,
}

const COLUMNS: &str = "id, curso_id, activo, fecha_inicio, fecha_fin, tutor_id, maximo_alumnos";
const DUPLICATE: &str = "the course edition is already registered";

pub async fn list(pool: &SqlitePool) -> Result<Vec<Edition>, Error> {
    let sql = format!("SELECT {COLUMNS} FROM edicionescursos ORDER BY id ASC");
    Ok(sqlx::query_as::<_, Edition>(&sql).fetch_all(pool).await?)
}

/// Hours rule for `course` between `start` and `end`, without writing anything.
pub async fn hours(
    pool: &SqlitePool,
    course: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<HoursCheck, Error> {
    let duration = match courses::duration(pool, course).await {
        Err(Error::NotFound { .. }) => return Err(Error::MissingReference),
        other => other?,
    };
    Ok(schedule::check_hours(duration, start, end)?)
}

async fn check(pool: &SqlitePool, input: &EditionInput, id: Option<i64>) -> Result<(), Error> {
    let check = hours(pool, input.curso_id, input.fecha_inicio, input.fecha_fin).await?;
    if !check.within_tolerance {
        warn!(course = input.curso_id, ?check, "edition hours out of tolerance");
        return Err(Error::HoursOutOfTolerance(check));
    }
    let taken = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM edicionescursos \
         WHERE curso_id = ? AND fecha_inicio = ? AND fecha_fin = ? AND tutor_id IS ? AND id IS NOT ?)",
    )
    .bind(input.curso_id)
    .bind(input.fecha_inicio)
    .bind(input.fecha_fin)
    .bind(input.tutor_id)
    .bind(id)
    .fetch_one(pool)
    .await?;
    if taken {
        return Err(Error::Duplicate(DUPLICATE));
    }
    Ok(())
}

pub async fn create(pool: &SqlitePool, input: &EditionInput) -> Result<Edition, Error> {
    check(pool, input, None).await?;
    let sql = format!(
        "INSERT INTO edicionescursos (curso_id, activo, fecha_inicio, fecha_fin, tutor_id, maximo_alumnos) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let edition = sqlx::query_as::<_, Edition>(&sql)
        .bind(input.curso_id)
        .bind(input.activo)
        .bind(input.fecha_inicio)
        .bind(input.fecha_fin)
        .bind(input.tutor_id)
        .bind(input.maximo_alumnos)
        .fetch_one(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?;
    info!(id = edition.id, course = edition.curso_id, "created course edition");
    Ok(edition)
}

pub async fn update(pool: &SqlitePool, id: i64, input: &EditionInput) -> Result<Edition, Error> {
    check(pool, input, Some(id)).await?;
    let sql = format!(
        "UPDATE edicionescursos SET curso_id = ?, activo = ?, fecha_inicio = ?, fecha_fin = ?, \
         tutor_id = ?, maximo_alumnos = ? WHERE id = ? RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Edition>(&sql)
        .bind(input.curso_id)
        .bind(input.activo)
        .bind(input.fecha_inicio)
        .bind(input.fecha_fin)
        .bind(input.tutor_id)
        .bind(input.maximo_alumnos)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?
        .ok_or(Error::NotFound {
            entity: "course edition",
            id,
        })
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), Error> {
    delete_by_id(pool, "edicionescursos", "course edition", id).await?;
    info!(id, "deleted course edition");
    Ok(())
}

pub async fn options(pool: &SqlitePool) -> Result<Vec<EditionOption>, Error> {
    Ok(sqlx::query_as::<_, EditionOption>(
        r#"
        SELECT ec.id, ec.curso_id, c.descripcion, ec.fecha_inicio, ec.fecha_fin,
               ec.tutor_id, ec.maximo_alumnos
        FROM edicionescursos ec
        INNER JOIN cursos c ON ec.curso_id = c.id
        WHERE ec.activo = 1
        ORDER BY c.descripcion ASC, ec.fecha_inicio DESC
        "#,
    )
    .fetch_all(pool)
    .await?)
}
