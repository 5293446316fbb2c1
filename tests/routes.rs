use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use course_api::{
    build_router,
    config::Config,
    database::{COURSES, DocumentStore, EVALUATIONS, PROFESSORS, Pagination, SECTIONS},
    error::StoreError,
    state::State,
};
use http_body_util::BodyExt;
use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Default)]
struct MemoryStore {
    collections: HashMap<String, Vec<Document>>,
    join_rows: Vec<Document>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl MemoryStore {
    fn with(mut self, collection: &str, documents: Vec<Document>) -> Self {
        self.collections.insert(collection.to_string(), documents);
        self
    }

    fn with_join_rows(mut self, rows: Vec<Document>) -> Self {
        self.join_rows = rows;
        self
    }

    fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    async fn check(&self) -> Result<(), StoreError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.failure {
            Some(message) => Err(StoreError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }

    fn matching(&self, collection: &str, filter: &Document) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| {
                        filter.iter().all(|(key, expected)| match document.get(key) {
                            Some(Bson::Array(values)) => values.contains(expected),
                            Some(value) => value == expected,
                            None => false,
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn aggregate(
        &self,
        _collection: &str,
        _pipeline: Vec<Document>,
    ) -> Result<Vec<Document>, StoreError> {
        self.check().await?;
        Ok(self.join_rows.clone())
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        page: Option<Pagination>,
    ) -> Result<Vec<Document>, StoreError> {
        self.check().await?;

        let documents = self.matching(collection, &filter);
        Ok(match page {
            Some(page) => documents
                .into_iter()
                .skip(page.skip as usize)
                .take(page.limit as usize)
                .collect(),
            None => documents,
        })
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.check().await?;
        Ok(self.matching(collection, &filter).into_iter().next())
    }
}

fn config(limit: i64, request_timeout: Duration) -> Config {
    Config {
        port: 0,
        mongodb_uri: "mongodb://unused".to_string(),
        database: "combinedDB".to_string(),
        limit,
        request_timeout,
    }
}

fn app(store: MemoryStore) -> Router {
    app_with(store, config(20, Duration::from_secs(30)))
}

fn app_with(store: MemoryStore, config: Config) -> Router {
    build_router(State::with_store(config, Arc::new(store)))
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, serde_json::from_slice(&bytes).unwrap())
}

fn course(id: ObjectId, subject: &str, number: &str) -> Document {
    doc! {
        "_id": id,
        "subject_prefix": subject,
        "course_number": number,
        "title": format!("{subject} {number}"),
    }
}

fn join_row(
    subject: &str,
    course: &str,
    session: &str,
    section: &str,
    professor: Option<(&str, &str)>,
) -> Document {
    let professor = match professor {
        Some((last, first)) => doc! { "first_name": first, "last_name": last },
        None => doc! {},
    };

    doc! {
        "subject_prefix": subject,
        "course_number": course,
        "academic_session": { "name": session },
        "section_number": section,
        "professor": professor,
    }
}

#[tokio::test]
async fn autocomplete_builds_nested_tree() {
    let store = MemoryStore::default().with_join_rows(vec![
        join_row("CS", "1337", "Fall24", "001", Some(("Smith", "J"))),
        join_row("CS", "1337", "Fall24", "001", Some(("Doe", "A"))),
        join_row("CS", "1337", "Spring25", "002", None),
        join_row("MATH", "2417", "Fall24", "901", Some(("Lee", "K"))),
    ]);

    let (status, body) = get(app(store), "/autocomplete/dag").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], 200);
    assert_eq!(body["message"], "success");

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["subject_prefix"], "CS");
    assert_eq!(data[1]["subject_prefix"], "MATH");

    let sessions = &data[0]["course_numbers"][0]["academic_sessions"];
    assert_eq!(sessions.as_array().unwrap().len(), 2);
    assert_eq!(
        sessions[0]["sections"][0]["professors"],
        json!([
            { "first_name": "J", "last_name": "Smith" },
            { "first_name": "A", "last_name": "Doe" },
        ])
    );
    assert_eq!(
        sessions[1]["sections"][0]["professors"],
        json!([{ "first_name": null, "last_name": null }])
    );
}

#[tokio::test]
async fn autocomplete_empty_store() {
    let (status, body) = get(app(MemoryStore::default()), "/autocomplete/dag").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn autocomplete_store_failure() {
    let (status, body) = get(
        app(MemoryStore::failing("connection refused")),
        "/autocomplete/dag",
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "status": 500, "message": "error", "data": "connection refused" })
    );
}

#[tokio::test]
async fn autocomplete_malformed_row_aborts() {
    let store = MemoryStore::default().with_join_rows(vec![
        join_row("CS", "1337", "Fall24", "001", None),
        doc! { "subject_prefix": "CS" },
    ]);

    let (status, body) = get(app(store), "/autocomplete/dag").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "error");
    assert!(body["data"].is_string());
}

#[tokio::test]
async fn store_timeout_is_an_error() {
    let app = app_with(
        MemoryStore::slow(Duration::from_secs(5)),
        config(20, Duration::from_millis(20)),
    );

    let (status, body) = get(app, "/autocomplete/dag").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["data"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn course_search_filters_and_pages() {
    let store = MemoryStore::default().with(
        COURSES,
        vec![
            course(ObjectId::new(), "CS", "1337"),
            course(ObjectId::new(), "MATH", "2417"),
            course(ObjectId::new(), "CS", "2336"),
            course(ObjectId::new(), "CS", "3345"),
        ],
    );
    let app = app_with(store, config(1, Duration::from_secs(30)));

    let (status, body) = get(app, "/course?subject_prefix=CS&offset=1&color=blue").await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["course_number"], "2336");
}

#[tokio::test]
async fn course_search_rejects_bad_offset() {
    let (status, body) = get(app(MemoryStore::default()), "/course?offset=abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert_eq!(body["message"], "error");
}

#[tokio::test]
async fn course_all_is_not_paged() {
    let courses = (0..3)
        .map(|n| course(ObjectId::new(), "CS", &format!("13{n}")))
        .collect();
    let app = app_with(
        MemoryStore::default().with(COURSES, courses),
        config(1, Duration::from_secs(30)),
    );

    let (status, body) = get(app, "/course/all").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn course_by_id_lookups() {
    let id = ObjectId::new();
    let store = MemoryStore::default().with(COURSES, vec![course(id, "CS", "1337")]);
    let app = app(store);

    let (status, body) = get(app.clone(), &format!("/course/{}", id.to_hex())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["_id"], id.to_hex());
    assert_eq!(body["data"]["title"], "CS 1337");

    let missing = ObjectId::new().to_hex();
    let (status, body) = get(app.clone(), &format!("/course/{missing}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"], "course not found");

    let (status, _) = get(app, "/course/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn section_search_matches_professor_id() {
    let professor = ObjectId::new();
    let store = MemoryStore::default().with(
        SECTIONS,
        vec![
            doc! { "_id": ObjectId::new(), "section_number": "001", "professors": [professor] },
            doc! { "_id": ObjectId::new(), "section_number": "002", "professors": [] },
        ],
    );

    let (status, body) = get(
        app(store),
        &format!("/section?professors={}", professor.to_hex()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["section_number"], "001");
    assert_eq!(data[0]["professors"][0], professor.to_hex());
}

#[tokio::test]
async fn section_evaluation_lookup() {
    let section = ObjectId::new();
    let store = MemoryStore::default()
        .with(SECTIONS, vec![doc! { "_id": section, "section_number": "001" }])
        .with(
            EVALUATIONS,
            vec![doc! { "_id": ObjectId::new(), "section": section, "responses": 12 }],
        );
    let app = app(store);

    let uri = format!("/section/{}/evaluation", section.to_hex());
    let (status, body) = get(app.clone(), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["section"], section.to_hex());
    assert_eq!(body["data"]["responses"], 12);

    let missing = ObjectId::new().to_hex();
    let (status, body) = get(app, &format!("/section/{missing}/evaluation")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"], "evaluation not found");
}

#[tokio::test]
async fn professor_routes() {
    let id = ObjectId::new();
    let store = MemoryStore::default().with(
        PROFESSORS,
        vec![
            doc! { "_id": id, "first_name": "Jane", "last_name": "Smith" },
            doc! { "_id": ObjectId::new(), "first_name": "John", "last_name": "Doe" },
        ],
    );
    let app = app(store);

    let (status, body) = get(app.clone(), "/professor?last_name=Smith").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = get(app.clone(), "/professor/all").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = get(app, &format!("/professor/{}", id.to_hex())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_name"], "Jane");
}

#[tokio::test]
async fn sparse_documents_do_not_fail_listings() {
    let store = MemoryStore::default()
        .with(
            PROFESSORS,
            vec![
                doc! { "_id": ObjectId::new(), "first_name": "Jane", "last_name": "Smith" },
                doc! { "_id": ObjectId::new(), "first_name": "A", "last_name": Bson::Null },
                doc! { "_id": ObjectId::new() },
            ],
        )
        .with(
            SECTIONS,
            vec![
                doc! { "_id": ObjectId::new(), "section_number": "001" },
                doc! { "_id": ObjectId::new(), "professors": Bson::Null },
            ],
        );
    let app = app(store);

    let (status, body) = get(app.clone(), "/professor/all").await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[1]["last_name"], Value::Null);
    assert_eq!(data[2]["first_name"], Value::Null);

    let (status, body) = get(app, "/section").await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[1]["section_number"], Value::Null);
    assert_eq!(data[1]["professors"], json!([]));
}

#[tokio::test]
async fn nested_ids_render_as_hex() {
    let id = ObjectId::new();
    let reference = ObjectId::new();
    let store = MemoryStore::default().with(
        COURSES,
        vec![doc! {
            "_id": id,
            "subject_prefix": "CS",
            "course_number": "2336",
            "prerequisites": { "type": "course", "class_reference": reference },
        }],
    );

    let (status, body) = get(app(store), &format!("/course/{}", id.to_hex())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["prerequisites"],
        json!({ "type": "course", "class_reference": reference.to_hex() })
    );
}

#[tokio::test]
async fn preflight_is_answered_by_cors() {
    for uri in ["/course", "/section", "/professor", "/autocomplete/dag"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .header("origin", "https://example.com")
            .header("access-control-request-method", "GET")
            .body(Body::empty())
            .unwrap();

        let response = app(MemoryStore::default()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        let methods = response.headers()["access-control-allow-methods"]
            .to_str()
            .unwrap();
        assert!(methods.contains("GET"));
        assert!(methods.contains("OPTIONS"));
    }
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let request = Request::builder()
        .uri("/autocomplete/dag")
        .header("origin", "https://example.com")
        .body(Body::empty())
        .unwrap();

    let response = app(MemoryStore::default()).oneshot(request).await.unwrap();

    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
