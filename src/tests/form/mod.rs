use sqlx::prelude::FromRow;

use super::{count, load_request, memory_db, processor};
use crate::form::{
    FieldDefinition, FieldType, FormRequest, RowValue, ddl, transform,
};

const REQUEST: &str = "src/tests/form/request.yaml";

#[derive(FromRow, Debug, PartialEq)]
struct CursoRow {
    id: i64,
    titulo: String,
    tutor_id: i64,
}

#[derive(FromRow, Debug)]
struct AlumnoRow {
    nombre: String,
    password: String,
    activo: bool,
    curso_id: i64,
}

#[tokio::test]
async fn tutor_course_student() {
    let db = memory_db().await;
    let request = load_request(REQUEST).await;
    let result = processor(&db).process(&request).await;
    assert!(result.success, "{result:?}");
    assert!(result.errors.is_none());

    let ids = result.generated_ids.unwrap();
    assert_eq!(
        ids.keys().collect::<Vec<_>>(),
        ["tutores", "cursos", "alumnos"]
    );

    let curso = sqlx::query_as::<_, CursoRow>(
        "SELECT id, titulo, CAST(tutorId AS INTEGER) AS tutor_id FROM cursos",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(
        curso,
        CursoRow {
            id: ids["cursos"],
            titulo: "Rust".into(),
            tutor_id: ids["tutores"],
        }
    );

    let alumno = sqlx::query_as::<_, AlumnoRow>(
        "SELECT nombre, password, activo, CAST(cursoId AS INTEGER) AS curso_id FROM alumnos",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(alumno.nombre, "María");
    assert!(alumno.activo);
    // the caller sent 999, the batch id wins
    assert_eq!(alumno.curso_id, ids["cursos"]);
    assert_ne!(alumno.password, "miPassword123");
    assert!(transform::verify("miPassword123", &alumno.password));
}

#[tokio::test]
async fn failure_on_third_table_rolls_back_everything() {
    let db = memory_db().await;
    sqlx::query(
        r#"
        CREATE TABLE alumnos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fecha_creacion TEXT DEFAULT CURRENT_TIMESTAMP,
            nombre VARCHAR(150),
            email VARCHAR(150) UNIQUE
        );
        INSERT INTO alumnos (nombre, email) VALUES ('Marta', 'maria@example.com');
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let request = load_request(REQUEST).await;
    let result = processor(&db).process(&request).await;
    assert!(!result.success);
    assert!(result.generated_ids.is_none());
    let errors = result.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("alumnos"), "{errors:?}");

    assert_eq!(count(&db, "tutores").await, 0);
    assert_eq!(count(&db, "cursos").await, 0);
    assert_eq!(count(&db, "alumnos").await, 1);
}

#[tokio::test]
async fn repeated_calls_do_not_change_the_schema() {
    let db = memory_db().await;
    let request = load_request(REQUEST).await;
    let processor = processor(&db);
    assert!(processor.process(&request).await.success);
    assert!(processor.process(&request).await.success);
    assert_eq!(count(&db, "alumnos").await, 2);

    let mut conn = db.pool().acquire().await.unwrap();
    let report = ddl::reconcile(&mut conn, &request.tables, &request.fields)
        .await
        .unwrap();
    assert!(report.is_unchanged(), "{report:?}");
}

#[tokio::test]
async fn new_fields_evolve_existing_tables() {
    let db = memory_db().await;
    let mut request = load_request(REQUEST).await;
    assert!(processor(&db).process(&request).await.success);

    request
        .fields
        .push(FieldDefinition::new("telefono", FieldType::ShortText, "tutores"));
    request
        .data
        .push(RowValue::new("telefono", "tutores", "600000000"));
    request.data.retain(|value| value.table != "alumnos");
    let result = processor(&db).process(&request).await;
    assert!(result.success, "{result:?}");

    let phones = sqlx::query_scalar::<_, Option<String>>(
        "SELECT telefono FROM tutores ORDER BY id ASC",
    )
    .fetch_all(db.pool())
    .await
    .unwrap();
    assert_eq!(phones, [None, Some("600000000".to_owned())]);
}

#[tokio::test]
async fn ids_only_for_tables_with_values() {
    let db = memory_db().await;
    let request = FormRequest {
        tables: vec!["tutores".into(), "cursos".into()],
        fields: vec![
            FieldDefinition::new("nombre", FieldType::ShortText, "tutores"),
            FieldDefinition::new("titulo", FieldType::ShortText, "cursos"),
        ],
        data: vec![RowValue::new("nombre", "tutores", "Ana")],
    };
    let result = processor(&db).process(&request).await;
    let ids = result.generated_ids.unwrap();
    assert_eq!(ids.keys().collect::<Vec<_>>(), ["tutores"]);
    assert_eq!(count(&db, "cursos").await, 0);
}

#[tokio::test]
async fn cycle_inserts_nothing() {
    let db = memory_db().await;
    let request = FormRequest {
        tables: vec!["a".into(), "b".into()],
        fields: vec![
            FieldDefinition::new("nombre", FieldType::Text, "a"),
            FieldDefinition::new("bRef", FieldType::Number, "a").references("b"),
            FieldDefinition::new("nombre", FieldType::Text, "b"),
            FieldDefinition::new("aRef", FieldType::Number, "b").references("a"),
        ],
        data: vec![
            RowValue::new("nombre", "a", "uno"),
            RowValue::new("nombre", "b", "dos"),
        ],
    };
    let result = processor(&db).process(&request).await;
    assert!(!result.success);
    let errors = result.errors.unwrap();
    assert!(errors[0].contains("circular dependency"), "{errors:?}");
    assert_eq!(count(&db, "a").await, 0);
    assert_eq!(count(&db, "b").await, 0);
}

#[tokio::test]
async fn invalid_input_touches_nothing() {
    let db = memory_db().await;
    let result = processor(&db).process(&FormRequest::default()).await;
    assert!(!result.success);
    assert_eq!(result.message, "Invalid form");
    assert_eq!(result.errors.unwrap().len(), 3);

    let request = FormRequest {
        tables: vec!["alumnos; DROP TABLE usuarios".into()],
        fields: vec![FieldDefinition::new("nombre", FieldType::Text, "alumnos")],
        data: vec![RowValue::new("nombre", "alumnos", "x")],
    };
    let result = processor(&db).process(&request).await;
    assert!(!result.success);
    let tables = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(tables, 0);
}

#[tokio::test]
async fn foreign_key_without_target_is_reported() {
    let db = memory_db().await;
    let mut responsable = FieldDefinition::new("responsable", FieldType::Number, "cursos");
    responsable.is_foreign_key = true;
    let request = FormRequest {
        tables: vec!["cursos".into()],
        fields: vec![responsable],
        data: vec![RowValue::new("responsable", "cursos", 1)],
    };
    let result = processor(&db).process(&request).await;
    assert!(!result.success);
    assert!(result.errors.unwrap()[0].contains("responsable"));

    // rejected before any DDL runs
    let mut conn = db.pool().acquire().await.unwrap();
    assert!(!ddl::table_exists(&mut conn, "cursos").await.unwrap());
}

#[tokio::test]
async fn batch_table_named_in_another_case_is_evolved() {
    let db = memory_db().await;
    sqlx::query(
        r#"
        CREATE TABLE cursos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titulo VARCHAR(150)
        );
        INSERT INTO cursos (titulo) VALUES ('SQL');
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let request = FormRequest {
        tables: vec!["Cursos".into()],
        fields: vec![
            FieldDefinition::new("titulo", FieldType::ShortText, "Cursos"),
            FieldDefinition::new("descripcion", FieldType::Text, "Cursos"),
        ],
        data: vec![
            RowValue::new("titulo", "Cursos", "Rust"),
            RowValue::new("descripcion", "Cursos", "Ownership y borrowing"),
        ],
    };
    let processor = processor(&db);
    for _ in 0..2 {
        let result = processor.process(&request).await;
        assert!(result.success, "{result:?}");
    }

    let descriptions = sqlx::query_scalar::<_, Option<String>>(
        "SELECT descripcion FROM cursos ORDER BY id ASC",
    )
    .fetch_all(db.pool())
    .await
    .unwrap();
    assert_eq!(
        descriptions,
        [
            None,
            Some("Ownership y borrowing".to_owned()),
            Some("Ownership y borrowing".to_owned()),
        ]
    );
}

async fn foreign_keys_of(db: &crate::db::Database, table: &str) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        r#"SELECT "from" || '->' || "table" FROM pragma_foreign_key_list(?) ORDER BY "from""#,
    )
    .bind(table)
    .fetch_all(db.pool())
    .await
    .unwrap()
}

#[tokio::test]
async fn detected_and_referenced_keys_get_constraints() {
    let db = memory_db().await;
    let mut request = load_request(REQUEST).await;
    let mut responsable = FieldDefinition::new("responsable", FieldType::Number, "cursos");
    responsable.referenced_table = Some("tutores".to_owned());
    request.fields.push(responsable);

    let result = processor(&db).process(&request).await;
    assert!(result.success, "{result:?}");
    let ids = result.generated_ids.unwrap();

    // cursoId is only matched by the naming convention
    assert_eq!(foreign_keys_of(&db, "alumnos").await, ["cursoId->cursos"]);
    assert_eq!(
        foreign_keys_of(&db, "cursos").await,
        ["responsable->tutores", "tutorId->tutores"]
    );

    let responsable = sqlx::query_scalar::<_, i64>(
        "SELECT CAST(responsable AS INTEGER) FROM cursos",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(responsable, ids["tutores"]);
}
