//! Back-office accounts and credential checks

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{info, warn};

use super::{Error, default_active};
use crate::form::{ValueTransformer, transform};

/// Role every new account gets unless told otherwise.
pub const DEFAULT_ROLE: &str = "admin";

/// An account as shown to clients. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub rol: String,
    pub activo: bool,
    pub ultima_entrada: Option<String>,
    pub fecha_creacion: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInput {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub rol: Option<String>,
    #[serde(default = "default_active")]
    pub activo: bool,
}

#[derive(FromRow)]
struct Credentials {
    id: i64,
    password: String,
    activo: bool,
}

const COLUMNS: &str = "id, email, rol, activo, ultima_entrada, fecha_creacion";
const DUPLICATE: &str = "the email is already registered";

async fn hash(transformer: &ValueTransformer, plain: &str) -> Result<String, Error> {
    let transformer = transformer.clone();
    let plain = plain.to_owned();
    Ok(tokio::task::spawn_blocking(move || transformer.hash(&plain)).await??)
}

/// Rejects empty or missing passwords.
fn password(input: &UserInput) -> Option<&str> {
    input.password.as_deref().filter(|password| !password.is_empty())
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, Error> {
    let sql = format!("SELECT {COLUMNS} FROM usuarios ORDER BY id ASC");
    Ok(sqlx::query_as::<_, User>(&sql).fetch_all(pool).await?)
}

pub async fn create(
    pool: &SqlitePool,
    transformer: &ValueTransformer,
    input: &UserInput,
) -> Result<User, Error> {
    let plain = password(input).ok_or(Error::MissingPassword)?;
    let hashed = hash(transformer, plain).await?;
    let sql = format!(
        "INSERT INTO usuarios (email, password, rol, activo) VALUES (?, ?, ?, ?) RETURNING {COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(&input.email)
        .bind(hashed)
        .bind(input.rol.as_deref().unwrap_or(DEFAULT_ROLE))
        .bind(input.activo)
        .fetch_one(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?;
    info!(id = user.id, rol = %user.rol, "created user");
    Ok(user)
}

/// Updates an account. The stored hash is replaced only when a new password
/// is supplied, and the role is kept when none is.
pub async fn update(
    pool: &SqlitePool,
    transformer: &ValueTransformer,
    id: i64,
    input: &UserInput,
) -> Result<User, Error> {
    let hashed = match password(input) {
        Some(plain) => Some(hash(transformer, plain).await?),
        None => None,
    };
    let sql = format!(
        "UPDATE usuarios SET email = ?, password = COALESCE(?, password), rol = COALESCE(?, rol), \
         activo = ? WHERE id = ? RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(&input.email)
        .bind(hashed)
        .bind(&input.rol)
        .bind(input.activo)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|error| Error::from_write(error, DUPLICATE))?
        .ok_or(Error::NotFound { entity: "user", id })
}

/// Deletes an account, refusing to remove the last administrator.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), Error> {
    let role = sqlx::query_scalar::<_, String>("SELECT rol FROM usuarios WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(Error::NotFound { entity: "user", id })?;
    if role.eq_ignore_ascii_case(DEFAULT_ROLE) {
        let admins = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM usuarios WHERE lower(rol) = ?",
        )
        .bind(DEFAULT_ROLE)
        .fetch_one(pool)
        .await?;
        if admins <= 1 {
            warn!(id, "refused to delete the last administrator");
            return Err(Error::LastAdmin);
        }
    }
    super::delete_by_id(pool, "usuarios", "user", id).await?;
    info!(id, "deleted user");
    Ok(())
}

/// Checks an email/password pair and stamps the last-login time.
pub async fn authenticate(pool: &SqlitePool, email: &str, plain: &str) -> Result<User, Error> {
    let Some(credentials) = sqlx::query_as::<_, Credentials>(
        "SELECT id, password, activo FROM usuarios WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    else {
        warn!(email, "login for unknown email");
        return Err(Error::InvalidCredentials);
    };

    let plain = plain.to_owned();
    let stored = credentials.password;
    let valid = tokio::task::spawn_blocking(move || transform::verify(&plain, &stored)).await?;
    if !valid {
        warn!(id = credentials.id, "login with wrong password");
        return Err(Error::InvalidCredentials);
    }
    if !credentials.activo {
        warn!(id = credentials.id, "login for inactive user");
        return Err(Error::Inactive);
    }

    let sql = format!(
        "UPDATE usuarios SET ultima_entrada = CURRENT_TIMESTAMP WHERE id = ? RETURNING {COLUMNS}"
    );
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(credentials.id)
        .fetch_one(pool)
        .await?;
    info!(id = user.id, "user logged in");
    Ok(user)
}
