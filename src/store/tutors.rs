use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use super::{Error, default_active, delete_by_id};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Tutor {
    pub id: i64,
    pub nombre: String,
    pub apellidos: Option<String>,
    pub dni: Option<String>,
    pub email: String,
    pub tlf: Option<String>,
    pub especialidad: Option<String>,
    pub activo: bool,
    pub observaciones: Option<String>,
    pub fecha_creacion: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TutorInput {
    pub nombre: String,
    #[serde(default)]
    pub apellidos: Option<String>,
    #[serde(default)]
    pub dni: Option<String>,
    pub email: String,
    #[serde(default)]
    pub tlf: Option<String>,
    #[serde(default)]
    pub especialidad: Option<String>,
    #[serde(default = "default_active")]
    pub activo: bool,
    #[serde(default)]
    pub observaciones: Option<String>,
}

/// Entry of the tutor picker.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TutorOption {
    pub id: i64,
    pub nombre: String,
    pub apellidos: Option<String>,
}

const COLUMNS: &str =
    "id, nombre, apellidos, dni, email, tlf, especialidad, activo, observaciones, fecha_creacion";
const DUPLICATE: &str = "the tutor is already registered";

pub async fn list(pool: &SqlitePool) -> Result<Vec<Tutor>, Error> {
    let sql = format!("SELECT {COLUMNS} FROM tutores ORDER BY id ASC");
    Ok(sqlx::query_as::<_, Tutor>(&sql).fetch_all(pool).await?)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Tutor, Error> {
    let sql = format!("SELECT {COLUMNS} FROM tutores WHERE id = ?");
    sqlx::query_as::<_, Tutor>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound {
            entity: "tutor",
            id,
        })
}

pub async fn create(pool: &SqlitePool, input: &TutorInput) -> Result<Tutor, Error> {
    let sql = format!(
        "INSERT INTO tutores (nombre, apellidos, dni, email, tlf, especialidad, activo, observaciones) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let tutor = sqlx::query_as::<_, Tutor>(&sql)
        .bind(&input.nombre)
        .bind(&input.apellidos)
        .bind(&input.dni)
        .bind(&input.email)
        .bind(&input.tlf)
        .bind(&input.especialidad)
        .bind(input.activo)
        .bind(&input.observaciones)
        .fetch_one(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?;
    info!(id = tutor.id, "created tutor");
    Ok(tutor)
}

pub async fn update(pool: &SqlitePool, id: i64, input: &TutorInput) -> Result<Tutor, Error> {
    let sql = format!(
        "UPDATE tutores SET nombre = ?, apellidos = ?, dni = ?, email = ?, tlf = ?, especialidad = ?, \
         activo = ?, observaciones = ? WHERE id = ? RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Tutor>(&sql)
        .bind(&input.nombre)
        .bind(&input.apellidos)
        .bind(&input.dni)
        .bind(&input.email)
        .bind(&input.tlf)
        .bind(&input.especialidad)
        .bind(input.activo)
        .bind(&input.observaciones)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?
        .ok_or(Error::NotFound {
            entity: "tutor",
            id,
        })
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), Error> {
    delete_by_id(pool, "tutores", "tutor", id).await?;
    info!(id, "deleted tutor");
    Ok(())
}

/// Active tutors, by surname then name.
pub async fn options(pool: &SqlitePool) -> Result<Vec<TutorOption>, Error> {
    Ok(sqlx::query_as::<_, TutorOption>(
        "SELECT id, nombre, apellidos FROM tutores WHERE activo = 1 ORDER BY apellidos, nombre ASC",
    )
    .fetch_all(pool)
    .await?)
}
