use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::info;

use super::{Error, default_active, delete_by_id};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Student {
    pub id: i64,
    pub nombre: String,
    pub apellidos: Option<String>,
    pub dni: Option<String>,
    pub email: String,
    pub tlf: Option<String>,
    pub grupo: Option<String>,
    pub activo: bool,
    pub observaciones: Option<String>,
    pub fecha_creacion: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentInput {
    pub nombre: String,
    #[serde(default)]
    pub apellidos: Option<String>,
    #[serde(default)]
    pub dni: Option<String>,
    pub email: String,
    #[serde(default)]
    pub tlf: Option<String>,
    #[serde(default)]
    pub grupo: Option<String>,
    #[serde(default = "default_active")]
    pub activo: bool,
    #[serde(default)]
    pub observaciones: Option<String>,
}

/// Entry of the student picker.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct StudentOption {
    pub id: i64,
    pub nombre: String,
    pub apellidos: Option<String>,
}

const COLUMNS: &str =
    "id, nombre, apellidos, dni, email, tlf, grupo, activo, observaciones, fecha_creacion";
const DUPLICATE: &str = "the student is already registered";

pub async fn list(pool: &SqlitePool) -> Result<Vec<Student>, Error> {
    let sql = format!("SELECT {COLUMNS} FROM alumnos ORDER BY id ASC");
    Ok(sqlx::query_as::<_, Student>(&sql).fetch_all(pool).await?)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Student, Error> {
    let sql = format!("SELECT {COLUMNS} FROM alumnos WHERE id = ?");
    sqlx::query_as::<_, Student>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound {
            entity: "student",
            id,
        })
}

pub async fn create(pool: &SqlitePool, input: &StudentInput) -> Result<Student, Error> {
    let sql = format!(
        "INSERT INTO alumnos (nombre, apellidos, dni, email, tlf, grupo, activo, observaciones) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let student = sqlx::query_as::<_, Student>(&sql)
        .bind(&input.nombre)
        .bind(&input.apellidos)
        .bind(&input.dni)
        .bind(&input.email)
        .bind(&input.tlf)
        .bind(&input.grupo)
        .bind(input.activo)
        .bind(&input.observaciones)
        .fetch_one(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?;
    info!(id = student.id, "created student");
    Ok(student)
}

pub async fn update(pool: &SqlitePool, id: i64, input: &StudentInput) -> Result<Student, Error> {
    let sql = format!(
        "UPDATE alumnos SET nombre = ?, apellidos = ?, dni = ?, email = ?, tlf = ?, grupo = ?, \
         activo = ?, observaciones = ? WHERE id = ? RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Student>(&sql)
        .bind(&input.nombre)
        .bind(&input.apellidos)
        .bind(&input.dni)
        .bind(&input.email)
        .bind(&input.tlf)
        .bind(&input.grupo)
        .bind(input.activo)
        .bind(&input.observaciones)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?
        .ok_or(Error::NotFound {
            entity: "student",
            id,
        })
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), Error> {
    delete_by_id(pool, "alumnos", "student", id).await?;
    info!(id, "deleted student");
    Ok(())
}

/// Active students, by surname then name.
pub async fn options(pool: &SqlitePool) -> Result<Vec<StudentOption>, Error> {
    Ok(sqlx::query_as::<_, StudentOption>(
        "SELECT id, nombre, apellidos FROM alumnos WHERE activo = 1 ORDER BY apellidos, nombre ASC",
    )
    .fetch_all(pool)
    .await?)
}
