//! Courses, their editions and student enrollments

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use chrono::NaiveDate;
use serde::Deserialize;

use super::{ApiResult, AppState, Created, created, deleted};
use crate::{
    schedule::HoursCheck,
    store::{
        courses::{self, Course, CourseInput, CourseOption},
        editions::{self, Edition, EditionInput, EditionOption},
        enrollments::{self, Enrollment, EnrollmentInput},
        students::{self, StudentOption},
        tutors::{self, TutorOption},
    },
};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/cursos", get(list_courses).post(create_course))
        .route("/cursos/{id}", put(update_course).delete(delete_course))
        .route("/edicionescursos", get(list_editions).post(create_edition))
        .route("/edicionescursos/horas", get(edition_hours))
        .route("/edicionescursos/selectores/cursos", get(course_options))
        .route("/edicionescursos/selectores/tutores", get(tutor_options))
        .route(
            "/edicionescursos/{id}",
            put(update_edition).delete(delete_edition),
        )
        .route(
            "/matriculasalumnos",
            get(list_enrollments).post(create_enrollment),
        )
        .route(
            "/matriculasalumnos/selectores/edicionescursos",
            get(edition_options),
        )
        .route("/matriculasalumnos/selectores/alumnos", get(student_options))
        .route(
            "/matriculasalumnos/{id}",
            put(update_enrollment).delete(delete_enrollment),
        )
}

async fn list_courses(State(state): State<AppState>) -> ApiResult<Vec<Course>> {
    Ok(Json(courses::list(&state.pool).await?))
}

async fn create_course(
    State(state): State<AppState>,
    Json(input): Json<CourseInput>,
) -> Created<Course> {
    Ok(created(courses::create(&state.pool, &input).await?))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CourseInput>,
) -> ApiResult<Course> {
    Ok(Json(courses::update(&state.pool, id, &input).await?))
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    courses::delete(&state.pool, id).await?;
    Ok(deleted("course deleted"))
}

async fn list_editions(State(state): State<AppState>) -> ApiResult<Vec<Edition>> {
    Ok(Json(editions::list(&state.pool).await?))
}

#[derive(Deserialize)]
struct HoursQuery {
    curso_id: i64,
    fecha_inicio: NaiveDate,
    fecha_fin: NaiveDate,
}

async fn edition_hours(
    State(state): State<AppState>,
    Query(query): Query<HoursQuery>,
) -> ApiResult<HoursCheck> {
    Ok(Json(
        editions::hours(&state.pool, query.curso_id, query.fecha_inicio, query.fecha_fin).await?,
    ))
}

async fn create_edition(
    State(state): State<AppState>,
    Json(input): Json<EditionInput>,
) -> Created<Edition> {
    Ok(created(editions::create(&state.pool, &input).await?))
}

async fn update_edition(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<EditionInput>,
) -> ApiResult<Edition> {
    Ok(Json(editions::update(&state.pool, id, &input).await?))
}

async fn delete_edition(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    editions::delete(&state.pool, id).await?;
    Ok(deleted("course edition deleted"))
}

async fn course_options(State(state): State<AppState>) -> ApiResult<Vec<CourseOption>> {
    Ok(Json(courses::options(&state.pool).await?))
}

async fn tutor_options(State(state): State<AppState>) -> ApiResult<Vec<TutorOption>> {
    Ok(Json(tutors::options(&state.pool).await?))
}

async fn list_enrollments(State(state): State<AppState>) -> ApiResult<Vec<Enrollment>> {
    Ok(Json(enrollments::list(&state.pool).await?))
}

async fn create_enrollment(
    State(state): State<AppState>,
    Json(input): Json<EnrollmentInput>,
) -> Created<Enrollment> {
    Ok(created(enrollments::create(&state.pool, &input).await?))
}

async fn update_enrollment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<EnrollmentInput>,
) -> ApiResult<Enrollment> {
    Ok(Json(enrollments::update(&state.pool, id, &input).await?))
}

async fn delete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    enrollments::delete(&state.pool, id).await?;
    Ok(deleted("enrollment deleted"))
}

async fn edition_options(State(state): State<AppState>) -> ApiResult<Vec<EditionOption>> {
    Ok(Json(editions::options(&state.pool).await?))
}

async fn student_options(State(state): State<AppState>) -> ApiResult<Vec<StudentOption>> {
    Ok(Json(students::options(&state.pool).await?))
}
