//! Students, tutors, user accounts and login

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState, Created, created, deleted};
use crate::{
    permissions::Permissions,
    store::{
        students::{self, Student, StudentInput},
        tutors::{self, Tutor, TutorInput},
        users::{self, User, UserInput},
    },
};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/usuarios", get(list_users).post(create_user))
        .route("/usuarios/{id}", put(update_user).delete(delete_user))
        .route("/alumnos", get(list_students).post(create_student))
        .route(
            "/alumnos/{id}",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/tutores", get(list_tutors).post(create_tutor))
        .route(
            "/tutores/{id}",
            get(get_tutor).put(update_tutor).delete(delete_tutor),
        )
}

#[derive(Deserialize)]
struct Login {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct Session {
    usuario: User,
    permisos: Permissions,
}

async fn login(State(state): State<AppState>, Json(login): Json<Login>) -> ApiResult<Session> {
    let usuario = users::authenticate(&state.pool, &login.email, &login.password).await?;
    let permisos = Permissions::for_role(&usuario.rol, &*state.allowed_roles);
    Ok(Json(Session { usuario, permisos }))
}

async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    Ok(Json(users::list(&state.pool).await?))
}

async fn create_user(State(state): State<AppState>, Json(input): Json<UserInput>) -> Created<User> {
    Ok(created(
        users::create(&state.pool, state.transformer(), &input).await?,
    ))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UserInput>,
) -> ApiResult<User> {
    Ok(Json(
        users::update(&state.pool, state.transformer(), id, &input).await?,
    ))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    users::delete(&state.pool, id).await?;
    Ok(deleted("user deleted"))
}

async fn list_students(State(state): State<AppState>) -> ApiResult<Vec<Student>> {
    Ok(Json(students::list(&state.pool).await?))
}

async fn get_student(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Student> {
    Ok(Json(students::get(&state.pool, id).await?))
}

async fn create_student(
    State(state): State<AppState>,
    Json(input): Json<StudentInput>,
) -> Created<Student> {
    Ok(created(students::create(&state.pool, &input).await?))
}

async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<StudentInput>,
) -> ApiResult<Student> {
    Ok(Json(students::update(&state.pool, id, &input).await?))
}

async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    students::delete(&state.pool, id).await?;
    Ok(deleted("student deleted"))
}

async fn list_tutors(State(state): State<AppState>) -> ApiResult<Vec<Tutor>> {
    Ok(Json(tutors::list(&state.pool).await?))
}

async fn get_tutor(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Tutor> {
    Ok(Json(tutors::get(&state.pool, id).await?))
}

async fn create_tutor(
    State(state): State<AppState>,
    Json(input): Json<TutorInput>,
) -> Created<Tutor> {
    Ok(created(tutors::create(&state.pool, &input).await?))
}

async fn update_tutor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TutorInput>,
) -> ApiResult<Tutor> {
    Ok(Json(tutors::update(&state.pool, id, &input).await?))
}

async fn delete_tutor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    tutors::delete(&state.pool, id).await?;
    Ok(deleted("tutor deleted"))
}
