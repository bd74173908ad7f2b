use admissions_tracker::auth::{Auth, TokenVerifier};
use admissions_tracker::config::ClientOptions;
use admissions_tracker::error::Error;
use admissions_tracker::models::{NewApplication, NewParent, NewStudent, UniversityQuery};
use admissions_tracker::permissions::Role;
use admissions_tracker::store::{Store, SupabaseStore};
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> SupabaseStore {
    SupabaseStore::new(&server.uri(), "service-key", ClientOptions::default())
}

#[tokio::test]
async fn resolves_roles_through_the_role_table() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/user_roles"))
        .and(query_param("user_id", "eq.parent-user"))
        .and(query_param("select", "role"))
        .and(header("apikey", "service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "role": "parent" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/user_roles"))
        .and(query_param("user_id", "eq.new-user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store(&server);
    assert_eq!(store.resolve_role("parent-user").await.unwrap(), Some(Role::Parent));
    assert_eq!(store.resolve_role("new-user").await.unwrap(), None);
}

#[tokio::test]
async fn unique_violation_becomes_conflict() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/applications"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"applications_student_university_key\"",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = store(&server)
        .create_application(NewApplication {
            student_id: Uuid::new_v4(),
            university_id: Uuid::new_v4(),
            application_type: None,
            deadline: None,
            status: Default::default(),
            notes: None,
        })
        .await;

    match result {
        Err(Error::Conflict(message)) => {
            assert_eq!(message, "Application already exists for this university")
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn second_profile_for_a_user_is_a_conflict() {
    let server = MockServer::start().await;
    let duplicate = ResponseTemplate::new(409).set_body_json(json!({
        "code": "23505",
        "message": "duplicate key value violates unique constraint \"user_roles_pkey\"",
    }));

    Mock::given(method("POST"))
        .and(path("/rest/v1/parents"))
        .respond_with(duplicate.clone())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/students"))
        .respond_with(duplicate)
        .expect(1)
        .mount(&server)
        .await;

    let store = store(&server);
    let parent = store
        .create_parent(NewParent {
            user_id: "dual-user".into(),
            name: "Pat".into(),
            email: "pat@example.com".into(),
        })
        .await;
    match parent {
        Err(Error::Conflict(message)) => assert_eq!(message, "Profile already exists"),
        other => panic!("expected a conflict, got {other:?}"),
    }

    let student = store
        .create_student(NewStudent {
            user_id: "dual-user".into(),
            name: "Pat".into(),
            email: "pat@example.com".into(),
            graduation_year: None,
            gpa: None,
            sat_score: None,
            act_score: None,
            target_countries: None,
            intended_majors: None,
        })
        .await;
    match student {
        Err(Error::Conflict(message)) => assert_eq!(message, "Profile already exists"),
        other => panic!("expected a conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn deletes_through_the_transactional_function() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    let missing = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/delete_application"))
        .and(body_json(json!({ "application_id": id })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/delete_application"))
        .and(body_json(json!({ "application_id": missing })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
        .mount(&server)
        .await;
    // rows are never removed table by table
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let store = store(&server);
    store.delete_application(id).await.unwrap();
    assert!(matches!(
        store.delete_application(missing).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_delete_surfaces_the_backend_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/delete_application"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "deadlock detected" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let result = store(&server).delete_application(Uuid::new_v4()).await;
    assert!(matches!(result, Err(Error::Api { status: 500, .. })));
}

#[tokio::test]
async fn catalog_search_quotes_reserved_characters() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/universities"))
        .and(query_param(
            "or",
            "(name.ilike.\"*Washington, D.C.*\",city.ilike.\"*Washington, D.C.*\",state.ilike.\"*Washington, D.C.*\")",
        ))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "*/0")
                .set_body_json(json!([])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = store(&server)
        .universities(&UniversityQuery {
            search: Some("Washington, D.C.".into()),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn catalog_search_reads_the_exact_count() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/universities"))
        .and(query_param("acceptance_rate", "lte.0.1"))
        .and(query_param("order", "us_news_ranking.asc.nullslast"))
        .and(query_param("limit", "1"))
        .and(header("Prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Range", "0-0/4")
                .set_body_json(json!([{
                    "id": Uuid::new_v4(),
                    "name": "Princeton University",
                    "country": "USA",
                    "state": "NJ",
                    "city": "Princeton",
                    "us_news_ranking": 1,
                    "acceptance_rate": 0.04,
                    "application_system": "Common App",
                    "tuition_in_state": null,
                    "tuition_out_state": null,
                    "application_fee": 75,
                    "deadlines": { "regular_decision": "2026-01-01" },
                }])),
        )
        .mount(&server)
        .await;

    let page = store(&server)
        .universities(&UniversityQuery {
            max_acceptance_rate: Some(0.1),
            limit: 1,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Princeton University");
    assert_eq!(page.total, 4);
    assert!(page.has_more());
}

#[tokio::test]
async fn sign_up_accepts_both_response_shapes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_json(json!({
            "email": "with-session@example.com",
            "password": "password123",
            "data": { "role": "student" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token",
            "user": { "id": "user-1", "email": "with-session@example.com" },
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .and(body_json(json!({
            "email": "confirm@example.com",
            "password": "password123",
            "data": { "role": "parent" },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-2",
            "email": "confirm@example.com",
            "user_metadata": { "role": "parent" },
        })))
        .mount(&server)
        .await;

    let auth = Auth::new(&server.uri(), "anon-key", Client::new(), ClientOptions::default());

    let user = auth
        .sign_up("with-session@example.com", "password123", json!({ "role": "student" }))
        .await
        .unwrap();
    assert_eq!(user.id, "user-1");

    let user = auth
        .sign_up("confirm@example.com", "password123", json!({ "role": "parent" }))
        .await
        .unwrap();
    assert_eq!(user.id, "user-2");
    assert_eq!(user.user_metadata.get("role"), Some(&json!("parent")));
}

#[tokio::test]
async fn rejected_tokens_are_auth_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("Authorization", "Bearer good-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user-1",
            "email": "s@example.com",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("Authorization", "Bearer expired-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "token is expired" })))
        .mount(&server)
        .await;

    let auth = Auth::new(&server.uri(), "anon-key", Client::new(), ClientOptions::default());

    let user = auth.verify("good-token").await.unwrap();
    assert_eq!(user.id, "user-1");

    match auth.verify("expired-token").await {
        Err(Error::Auth(message)) => assert_eq!(message, "Invalid token"),
        other => panic!("expected an auth error, got {other:?}"),
    }
}

const SCHEMA: &str = include_str!("../migrations/0001_admissions.sql");

#[test]
fn schema_keeps_one_role_per_user() {
    assert!(SCHEMA.contains("create table if not exists user_roles (\n  user_id text primary key,"));
    assert!(!SCHEMA.contains("create or replace view user_roles"));
    assert!(SCHEMA.contains("after insert on students"));
    assert!(SCHEMA.contains("after insert on parents"));
}

#[test]
fn schema_cascades_requirements_with_their_application() {
    assert!(SCHEMA
        .contains("application_id uuid not null references applications (id) on delete cascade,"));
}
