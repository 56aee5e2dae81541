use chrono::NaiveDate;

use super::{bootstrapped_db, count, transformer};
use crate::store::{
    Error,
    courses::{self, CourseInput},
    documents::{self, DocumentInput},
    editions::{self, EditionInput},
    enrollments::{self, EnrollmentInput},
    students::{self, StudentInput},
    tutors::{self, TutorInput},
    users::{self, UserInput},
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn student(email: &str) -> StudentInput {
    StudentInput {
        nombre: "María".into(),
        apellidos: Some("López".into()),
        dni: None,
        email: email.into(),
        tlf: None,
        grupo: Some("A".into()),
        activo: true,
        observaciones: None,
    }
}

fn tutor(email: &str) -> TutorInput {
    TutorInput {
        nombre: "Ana".into(),
        apellidos: Some("García".into()),
        dni: None,
        email: email.into(),
        tlf: None,
        especialidad: Some("Sistemas".into()),
        activo: true,
        observaciones: None,
    }
}

fn course(codigo: &str, hours: Option<i64>) -> CourseInput {
    CourseInput {
        codigo: codigo.into(),
        descripcion: format!("Curso {codigo}"),
        duracion_horas: hours,
        nivel: Some(1),
        activo: true,
        observaciones: None,
    }
}

fn user(email: &str, password: Option<&str>, rol: Option<&str>) -> UserInput {
    UserInput {
        email: email.into(),
        password: password.map(str::to_owned),
        rol: rol.map(str::to_owned),
        activo: true,
    }
}

#[tokio::test]
async fn bootstrap_is_repeatable() {
    let db = bootstrapped_db().await;
    let config = super::config();
    db.bootstrap(&config.transformer(), config.seed_admin.as_ref())
        .await
        .unwrap();
    assert_eq!(count(&db, "usuarios").await, 1);
    let listed = users::list(db.pool()).await.unwrap();
    assert_eq!(listed[0].email, "admin@admin.com");
    assert_eq!(listed[0].rol, "admin");
}

#[tokio::test]
async fn login() {
    let db = bootstrapped_db().await;
    let pool = db.pool();

    let admin = users::authenticate(pool, "admin@admin.com", "admin123")
        .await
        .unwrap();
    assert!(admin.ultima_entrada.is_some());

    assert!(matches!(
        users::authenticate(pool, "admin@admin.com", "wrong").await,
        Err(Error::InvalidCredentials)
    ));
    assert!(matches!(
        users::authenticate(pool, "nobody@example.com", "admin123").await,
        Err(Error::InvalidCredentials)
    ));

    let mut input = user("off@example.com", Some("secret"), Some("tutor"));
    input.activo = false;
    users::create(pool, &transformer(), &input).await.unwrap();
    assert!(matches!(
        users::authenticate(pool, "off@example.com", "secret").await,
        Err(Error::Inactive)
    ));
}

#[tokio::test]
async fn user_passwords_and_roles() {
    let db = bootstrapped_db().await;
    let pool = db.pool();
    let transformer = transformer();

    assert!(matches!(
        users::create(pool, &transformer, &user("x@example.com", None, None)).await,
        Err(Error::MissingPassword)
    ));
    let created = users::create(pool, &transformer, &user("x@example.com", Some("one"), None))
        .await
        .unwrap();
    assert_eq!(created.rol, "admin");
    assert!(matches!(
        users::create(pool, &transformer, &user("x@example.com", Some("two"), None)).await,
        Err(Error::Duplicate(_))
    ));

    // no password: the hash and the role stay
    let updated = users::update(
        pool,
        &transformer,
        created.id,
        &user("x@example.com", None, None),
    )
    .await
    .unwrap();
    assert_eq!(updated.rol, "admin");
    users::authenticate(pool, "x@example.com", "one").await.unwrap();

    users::update(
        pool,
        &transformer,
        created.id,
        &user("x@example.com", Some("two"), Some("tutor")),
    )
    .await
    .unwrap();
    users::authenticate(pool, "x@example.com", "two").await.unwrap();
    assert!(matches!(
        users::update(pool, &transformer, 999, &user("y@example.com", None, None)).await,
        Err(Error::NotFound { .. })
    ));
}

#[tokio::test]
async fn last_admin_cannot_be_deleted() {
    let db = bootstrapped_db().await;
    let pool = db.pool();
    let admin = users::list(pool).await.unwrap()[0].id;
    assert!(matches!(
        users::delete(pool, admin).await,
        Err(Error::LastAdmin)
    ));

    users::create(pool, &transformer(), &user("second@example.com", Some("pw"), Some("Admin")))
        .await
        .unwrap();
    users::delete(pool, admin).await.unwrap();
    assert_eq!(count(&db, "usuarios").await, 1);
    assert!(matches!(
        users::delete(pool, admin).await,
        Err(Error::NotFound { .. })
    ));
}

#[tokio::test]
async fn students_and_tutors() {
    let db = bootstrapped_db().await;
    let pool = db.pool();

    let maria = students::create(pool, &student("maria@example.com")).await.unwrap();
    assert_eq!(students::get(pool, maria.id).await.unwrap(), maria);
    assert!(matches!(
        students::create(pool, &student("maria@example.com")).await,
        Err(Error::Duplicate(_))
    ));

    let mut input = student("maria@example.com");
    input.activo = false;
    let updated = students::update(pool, maria.id, &input).await.unwrap();
    assert!(!updated.activo);
    assert!(students::options(pool).await.unwrap().is_empty());

    assert!(matches!(
        students::get(pool, 999).await,
        Err(Error::NotFound { entity: "student", id: 999 })
    ));
    assert!(matches!(
        students::update(pool, 999, &input).await,
        Err(Error::NotFound { .. })
    ));
    students::delete(pool, maria.id).await.unwrap();
    assert!(matches!(
        students::delete(pool, maria.id).await,
        Err(Error::NotFound { .. })
    ));

    let ana = tutors::create(pool, &tutor("ana@example.com")).await.unwrap();
    assert_eq!(ana.especialidad.as_deref(), Some("Sistemas"));
    let options = tutors::options(pool).await.unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].nombre, "Ana");
    assert!(matches!(
        tutors::create(pool, &tutor("ana@example.com")).await,
        Err(Error::Duplicate(_))
    ));
}

#[tokio::test]
async fn courses_and_editions() {
    let db = bootstrapped_db().await;
    let pool = db.pool();

    let rust = courses::create(pool, &course("RUST-1", Some(100))).await.unwrap();
    assert!(matches!(
        courses::create(pool, &course("RUST-1", Some(10))).await,
        Err(Error::Duplicate(_))
    ));
    let ana = tutors::create(pool, &tutor("ana@example.com")).await.unwrap();

    let january = EditionInput {
        curso_id: rust.id,
        activo: true,
        fecha_inicio: date("2025-01-06"),
        fecha_fin: date("2025-01-31"),
        tutor_id: Some(ana.id),
        maximo_alumnos: Some(20),
    };
    let edition = editions::create(pool, &january).await.unwrap();
    assert_eq!(edition.fecha_fin, date("2025-01-31"));
    assert!(matches!(
        editions::create(pool, &january).await,
        Err(Error::Duplicate(_))
    ));
    // updating an edition with its own dates is not a duplicate
    editions::update(pool, edition.id, &january).await.unwrap();

    let too_long = EditionInput {
        fecha_fin: date("2025-02-28"),
        ..january.clone()
    };
    let Err(Error::HoursOutOfTolerance(check)) = editions::create(pool, &too_long).await else {
        panic!("expected the hours rule to reject the edition");
    };
    assert_eq!(check.planned_hours, 200);

    let backwards = EditionInput {
        fecha_inicio: date("2025-02-01"),
        ..january.clone()
    };
    assert!(matches!(
        editions::create(pool, &backwards).await,
        Err(Error::Schedule(_))
    ));

    let orphan = EditionInput {
        curso_id: 999,
        ..january.clone()
    };
    assert!(matches!(
        editions::create(pool, &orphan).await,
        Err(Error::MissingReference)
    ));

    let preview = editions::hours(pool, rust.id, date("2025-01-06"), date("2025-01-10"))
        .await
        .unwrap();
    assert_eq!(preview.planned_hours, 25);
    assert!(!preview.within_tolerance);

    let options = editions::options(pool).await.unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].descripcion, "Curso RUST-1");
    assert_eq!(courses::options(pool).await.unwrap()[0].codigo, "RUST-1");

    assert!(matches!(
        courses::delete(pool, rust.id).await,
        Err(Error::StillReferenced { .. })
    ));
}

#[tokio::test]
async fn enrollments() {
    let db = bootstrapped_db().await;
    let pool = db.pool();
    let course = courses::create(pool, &course("SQL-1", None)).await.unwrap();
    let edition = editions::create(
        pool,
        &EditionInput {
            curso_id: course.id,
            activo: true,
            fecha_inicio: date("2025-03-03"),
            fecha_fin: date("2025-06-27"),
            tutor_id: None,
            maximo_alumnos: None,
        },
    )
    .await
    .unwrap();
    let maria = students::create(pool, &student("maria@example.com")).await.unwrap();

    let input = EnrollmentInput {
        ediciones_cursos_id: edition.id,
        activo: true,
        alumno_id: maria.id,
    };
    let enrollment = enrollments::create(pool, &input).await.unwrap();
    assert!(matches!(
        enrollments::create(pool, &input).await,
        Err(Error::Duplicate(_))
    ));
    enrollments::update(pool, enrollment.id, &input).await.unwrap();

    let missing = EnrollmentInput {
        alumno_id: 999,
        ..input.clone()
    };
    assert!(matches!(
        enrollments::create(pool, &missing).await,
        Err(Error::MissingReference)
    ));
    assert!(matches!(
        students::delete(pool, maria.id).await,
        Err(Error::StillReferenced { .. })
    ));

    enrollments::delete(pool, enrollment.id).await.unwrap();
    students::delete(pool, maria.id).await.unwrap();
    assert!(enrollments::list(pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn document_index() {
    let db = bootstrapped_db().await;
    let pool = db.pool();
    let input = |enlace: &str, tema: &str| DocumentInput {
        enlace: enlace.into(),
        activo: true,
        tema: tema.into(),
        curso: "Rust".into(),
        autor: "Ana".into(),
    };

    assert!(matches!(
        documents::create(pool, &input("tema1.pdf", "Tema 1")).await,
        Err(Error::InvalidLink(_))
    ));
    let first = documents::create(pool, &input("/uploads/pdfs/tema1.pdf", "Tema 1"))
        .await
        .unwrap();
    documents::create(pool, &input("https://example.com/tema2.pdf", "Tema 2"))
        .await
        .unwrap();
    let listed = documents::list(pool).await.unwrap();
    assert_eq!(
        listed.iter().map(|document| document.tema.as_str()).collect::<Vec<_>>(),
        ["Tema 2", "Tema 1"]
    );

    let updated = documents::update(pool, first.id, &input("/uploads/pdfs/t1.pdf", "Tema 1b"))
        .await
        .unwrap();
    assert_eq!(updated.enlace, "/uploads/pdfs/t1.pdf");
    documents::delete(pool, first.id).await.unwrap();
    assert_eq!(count(&db, "indice").await, 1);
}
