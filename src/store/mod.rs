//! Repositories for the fixed back-office tables
//!
//! Every function takes the pool and runs its own statements; none of them
//! spans a transaction.

pub mod courses;
pub mod documents;
pub mod editions;
pub mod enrollments;
pub mod students;
pub mod tutors;
pub mod users;

use sqlx::error::ErrorKind;

use crate::schedule::{self, HoursCheck};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Duplicate(&'static str),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("a referenced record does not exist")]
    MissingReference,
    #[error("{entity} {id} is still referenced")]
    StillReferenced { entity: &'static str, id: i64 },
    #[error("cannot delete the only administrator")]
    LastAdmin,
    #[error("a password is required")]
    MissingPassword,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user is inactive")]
    Inactive,
    #[error("{0}")]
    Schedule(#[from] schedule::Error),
    #[error(
        "planned hours ({}) differ from the course duration ({}) by {} hours",
        .0.planned_hours, .0.course_hours, .0.difference
    )]
    HoursOutOfTolerance(HoursCheck),
    #[error("link must be a URL or an absolute path: {0}")]
    InvalidLink(String),
    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password hashing aborted: {0}")]
    HashTask(#[from] tokio::task::JoinError),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl Error {
    /// Folds constraint violations into input errors. Other database errors
    /// pass through.
    fn from_write(error: sqlx::Error, duplicate: &'static str) -> Self {
        match error.as_database_error().map(|db| db.kind()) {
            Some(ErrorKind::UniqueViolation) => Self::Duplicate(duplicate),
            Some(ErrorKind::ForeignKeyViolation) => Self::MissingReference,
            _ => Self::Sqlx(error),
        }
    }
}

fn default_active() -> bool {
    true
}

/// `DELETE FROM <table> WHERE id = ?`, reporting unknown ids.
async fn delete_by_id(
    pool: &sqlx::SqlitePool,
    table: &'static str,
    entity: &'static str,
    id: i64,
) -> Result<(), Error> {
    let sql = format!("DELETE FROM {table} WHERE id = ?");
    let result = sqlx::query(&sql)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|error| match error.as_database_error().map(|db| db.kind()) {
            Some(ErrorKind::ForeignKeyViolation) => Error::StillReferenced { entity, id },
            _ => Error::Sqlx(error),
        })?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound { entity, id });
    }
    Ok(())
}
