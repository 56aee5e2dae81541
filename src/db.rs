use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tracing::{error, info};

use crate::{config::SeedAdmin, form::ValueTransformer};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open database {url}: {source}")]
    Open { url: String, source: sqlx::Error },
    #[error("failed to create tables: {0}")]
    Bootstrap(sqlx::Error),
    #[error("failed to hash the seed admin password: {0}")]
    Hash(bcrypt::BcryptError),
    #[error("failed to seed the admin user: {0}")]
    Seed(sqlx::Error),
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn open(url: &str) -> Result<Self, Error> {
        let open_error = |source| Error::Open {
            url: url.to_owned(),
            source,
        };
        let options = SqliteConnectOptions::from_str(url)
            .map_err(open_error)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .inspect_err(|error| error!(%error, url, "failed to connect"))
            .map_err(open_error)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the fixed back-office tables and, when configured, the first
    /// admin user. Safe to run on every start.
    pub async fn bootstrap(
        &self,
        transformer: &ValueTransformer,
        admin: Option<&SeedAdmin>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS indice (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                enlace TEXT NOT NULL,
                fecha_creacion TEXT DEFAULT CURRENT_TIMESTAMP,
                activo BOOLEAN NOT NULL DEFAULT 1,
                tema VARCHAR(255) NOT NULL,
                curso VARCHAR(255) NOT NULL,
                autor VARCHAR(255) NOT NULL
            );
            CREATE TABLE IF NOT EXISTS usuarios (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) UNIQUE NOT NULL,
                password VARCHAR(255) NOT NULL,
                rol VARCHAR(50) NOT NULL DEFAULT 'admin',
                ultima_entrada TEXT,
                activo BOOLEAN NOT NULL DEFAULT 1,
                fecha_creacion TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS cursos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                codigo VARCHAR(25) UNIQUE NOT NULL,
                descripcion VARCHAR(255) NOT NULL,
                duracion_horas INTEGER DEFAULT 50,
                nivel INTEGER,
                activo BOOLEAN NOT NULL DEFAULT 1,
                observaciones TEXT,
                fecha_creacion TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS tutores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nombre VARCHAR(25) NOT NULL,
                apellidos VARCHAR(25),
                dni VARCHAR(15),
                email VARCHAR(80) UNIQUE NOT NULL,
                tlf VARCHAR(80),
                activo BOOLEAN NOT NULL DEFAULT 1,
                especialidad VARCHAR(155),
                observaciones TEXT,
                fecha_creacion TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS alumnos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                nombre VARCHAR(25) NOT NULL,
                apellidos VARCHAR(25),
                dni VARCHAR(15),
                email VARCHAR(80) UNIQUE NOT NULL,
                tlf VARCHAR(80),
                grupo VARCHAR(155),
                activo BOOLEAN NOT NULL DEFAULT 1,
                observaciones TEXT,
                fecha_creacion TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS edicionescursos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                curso_id INTEGER NOT NULL REFERENCES cursos(id),
                activo BOOLEAN NOT NULL DEFAULT 1,
                fecha_inicio TEXT NOT NULL,
                fecha_fin TEXT NOT NULL,
                tutor_id INTEGER REFERENCES tutores(id),
                maximo_alumnos INTEGER,
                fecha_creacion TEXT DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS matriculasalumnos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ediciones_cursos_id INTEGER NOT NULL REFERENCES edicionescursos(id),
                activo BOOLEAN NOT NULL DEFAULT 1,
                alumno_id INTEGER NOT NULL REFERENCES alumnos(id),
                fecha_creacion TEXT DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(Error::Bootstrap)?;
        info!("tables ready");

        let Some(admin) = admin else {
            return Ok(());
        };
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM usuarios WHERE email = ?)",
        )
        .bind(&admin.email)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Seed)?;
        if exists {
            info!(email = %admin.email, "admin user already exists");
            return Ok(());
        }
        let hashed = transformer.hash(&admin.password).map_err(Error::Hash)?;
        sqlx::query("INSERT INTO usuarios (email, password, rol) VALUES (?, ?, 'admin')")
            .bind(&admin.email)
            .bind(hashed)
            .execute(&self.pool)
            .await
            .map_err(Error::Seed)?;
        info!(email = %admin.email, "created admin user");
        Ok(())
    }
}
