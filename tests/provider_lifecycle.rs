use anyhow::{bail, Result};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::net::TcpListener;
use terraform_provider_duo::provider::{
    LifecycleRequest, LifecycleResponse, Provider, ProviderConfig,
};
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn provider_for(server: &MockServer) -> Result<Provider> {
    let config = ProviderConfig::new(
        "DIXXXXXXXXXXXXXXXXXX",
        SecretString::from("deadbeefdeadbeefdeadbeefdeadbeefdeadbeef".to_string()),
        server.uri(),
    );
    Ok(Provider::new(&config)?)
}

fn ok(response: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"stat": "OK", "response": response}))
}

fn fail(status: u16, code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "stat": "FAIL",
        "code": code,
        "message": message
    }))
}

fn jane(notes: &str) -> Value {
    json!({
        "user_id": "DU1",
        "username": "jane",
        "realname": "",
        "email": "jane@example.com",
        "status": "active",
        "notes": notes,
        "firstname": "",
        "lastname": "",
        "groups": [],
        "phones": []
    })
}

async fn request_count(server: &MockServer) -> Result<usize> {
    let Some(requests) = server.received_requests().await else {
        bail!("wiremock request recording is disabled");
    };
    Ok(requests.len())
}

fn summaries(response: &LifecycleResponse) -> Vec<&str> {
    response
        .diagnostics
        .iter()
        .map(|diagnostic| diagnostic.summary.as_str())
        .collect()
}

#[tokio::test]
async fn user_create_then_read_round_trips() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/v1/users"))
        .and(body_string("email=jane%40example.com&status=active&username=jane"))
        .respond_with(ok(jane("")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU1"))
        .respond_with(ok(jane("")))
        .mount(&server)
        .await;

    let provider = provider_for(&server)?;

    let created = provider
        .create(
            "duo_user",
            json!({"username": "jane", "email": "jane@example.com"}),
        )
        .await;
    assert!(!created.has_errors(), "{:?}", summaries(&created));
    assert_eq!(created.id(), Some("DU1"));

    let state = created.state.clone().unwrap_or_default();
    assert_eq!(state["username"], "jane");
    assert_eq!(state["status"], "active");
    assert_eq!(state["realname"], Value::Null);

    let read = provider.read("duo_user", state.clone()).await;
    assert_eq!(read.state, Some(state));
    Ok(())
}

#[tokio::test]
async fn user_with_every_field_round_trips() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    let remote = json!({
        "user_id": "DU2",
        "username": "jdoe",
        "realname": "Jane Doe",
        "email": "jdoe@example.com",
        "status": "bypass",
        "notes": "on call",
        "firstname": "Jane",
        "lastname": "Doe",
        "groups": [],
        "phones": []
    });

    Mock::given(method("POST"))
        .and(path("/admin/v1/users"))
        .and(body_string(
            "email=jdoe%40example.com&firstname=Jane&lastname=Doe&notes=on%20call\
             &realname=Jane%20Doe&status=bypass&username=jdoe",
        ))
        .respond_with(ok(remote.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU2"))
        .respond_with(ok(remote))
        .mount(&server)
        .await;

    let provider = provider_for(&server)?;
    let planned = json!({
        "username": "jdoe",
        "realname": "Jane Doe",
        "email": "jdoe@example.com",
        "status": "bypass",
        "notes": "on call",
        "firstname": "Jane",
        "lastname": "Doe"
    });

    let created = provider.create("duo_user", planned.clone()).await;
    assert!(!created.has_errors(), "{:?}", summaries(&created));

    let mut expected = planned;
    expected["id"] = json!("DU2");
    assert_eq!(created.state, Some(expected.clone()));

    let read = provider.read("duo_user", expected.clone()).await;
    assert_eq!(read.state, Some(expected));
    Ok(())
}

#[tokio::test]
async fn invalid_user_status_makes_no_remote_call() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    let response = provider_for(&server)?
        .create("duo_user", json!({"username": "jane", "status": "invalid"}))
        .await;

    assert!(response.has_errors());
    assert_eq!(
        response.diagnostics[0].attribute.as_deref(),
        Some("status")
    );
    assert_eq!(request_count(&server).await?, 0);
    Ok(())
}

#[tokio::test]
async fn user_delete_then_read_reports_gone() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/admin/v1/users/DU1"))
        .respond_with(ok(json!("")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU1"))
        .respond_with(fail(404, 40401, "Resource not found"))
        .mount(&server)
        .await;

    let provider = provider_for(&server)?;
    let state = json!({"id": "DU1", "username": "jane", "status": "active"});

    let deleted = provider.delete("duo_user", state.clone()).await;
    assert!(!deleted.has_errors());
    assert_eq!(deleted.state, None);

    let read = provider.read("duo_user", state).await;
    assert!(!read.has_errors());
    assert_eq!(read.id(), None);
    Ok(())
}

#[tokio::test]
async fn read_accepts_null_status_in_prior_state() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU1"))
        .respond_with(ok(jane("")))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider_for(&server)?
        .read(
            "duo_user",
            json!({"id": "DU1", "username": "jane", "status": null}),
        )
        .await;

    assert!(!response.has_errors(), "{:?}", summaries(&response));
    assert_eq!(
        response.state.as_ref().map(|state| state["status"].clone()),
        Some(json!("active"))
    );
    Ok(())
}

#[tokio::test]
async fn read_of_vanished_user_clears_id() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU1"))
        .respond_with(fail(404, 40401, "Resource not found"))
        .mount(&server)
        .await;

    let response = provider_for(&server)?
        .read("duo_user", json!({"id": "DU1", "username": "jane"}))
        .await;

    assert!(!response.has_errors());
    assert_eq!(response.id(), None);
    assert_eq!(
        response.state.as_ref().map(|state| state["id"].clone()),
        Some(Value::Null)
    );
    Ok(())
}

#[tokio::test]
async fn other_read_failures_are_errors() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/v1/groups/DG1"))
        .respond_with(fail(401, 40103, "Invalid signature in request credentials"))
        .mount(&server)
        .await;

    let response = provider_for(&server)?
        .read("duo_group", json!({"id": "DG1", "name": "ops"}))
        .await;

    assert!(response.has_errors());
    assert_eq!(
        summaries(&response),
        vec!["Unable to read group: FAIL, error: Invalid signature in request credentials"]
    );
    Ok(())
}

#[tokio::test]
async fn user_update_sends_only_changed_fields() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/v1/users/DU1"))
        .and(body_string("notes=second"))
        .respond_with(ok(jane("second")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU1"))
        .respond_with(ok(jane("second")))
        .mount(&server)
        .await;

    let prior = json!({
        "id": "DU1",
        "username": "jane",
        "email": "jane@example.com",
        "status": "active",
        "notes": "first"
    });
    let mut planned = prior.clone();
    planned["notes"] = json!("second");

    let response = provider_for(&server)?
        .update("duo_user", prior, planned)
        .await;

    assert!(!response.has_errors(), "{:?}", summaries(&response));
    assert_eq!(
        response.state.as_ref().map(|state| state["notes"].clone()),
        Some(json!("second"))
    );
    Ok(())
}

#[tokio::test]
async fn invalid_group_status_makes_no_remote_call() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    let response = provider_for(&server)?
        .create("duo_group", json!({"name": "ops", "status": "active"}))
        .await;

    assert!(response.has_errors());
    assert_eq!(
        response.diagnostics[0].attribute.as_deref(),
        Some("status")
    );
    assert_eq!(request_count(&server).await?, 0);
    Ok(())
}

#[tokio::test]
async fn group_delete_then_read_reports_gone() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/admin/v1/groups/DG1"))
        .respond_with(ok(json!("")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/v1/groups/DG1"))
        .respond_with(fail(404, 40401, "Resource not found"))
        .mount(&server)
        .await;

    let provider = provider_for(&server)?;
    let state = json!({"id": "DG1", "name": "ops", "status": "Active"});

    let deleted = provider.delete("duo_group", state.clone()).await;
    assert!(!deleted.has_errors());
    assert_eq!(deleted.state, None);

    let read = provider.read("duo_group", state).await;
    assert_eq!(read.id(), None);
    Ok(())
}

#[tokio::test]
async fn association_uses_composite_id() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/v1/users/u1/groups"))
        .and(body_string("group_id=g1"))
        .respond_with(ok(json!("")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/admin/v1/users/u1/groups/g1"))
        .respond_with(ok(json!("")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server)?;

    let created = provider
        .create(
            "duo_user_group_association",
            json!({"group_id": "g1", "user_id": "u1"}),
        )
        .await;
    assert_eq!(
        created.state,
        Some(json!({"id": "g1-u1", "group_id": "g1", "user_id": "u1"}))
    );

    let deleted = provider
        .delete("duo_user_group_association", json!({"id": "g1-u1"}))
        .await;
    assert!(!deleted.has_errors());
    Ok(())
}

#[tokio::test]
async fn association_remove_failure_names_group() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/admin/v1/users/u1/groups/g1"))
        .respond_with(fail(400, 40003, "Invalid request parameters"))
        .mount(&server)
        .await;

    let response = provider_for(&server)?
        .delete("duo_user_group_association", json!({"id": "g1-u1"}))
        .await;

    assert_eq!(
        summaries(&response),
        vec!["Unable to remove user from group: g1, error: Invalid request parameters"]
    );
    Ok(())
}

#[tokio::test]
async fn policy_create_sends_name_and_new_user_flag() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/policies"))
        .and(body_string("name=strict&new-user-policy-activated=deny"))
        .respond_with(ok(json!("POL1")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server)?;
    let planned = json!({
        "name": "strict",
        "new_user_policy": "deny",
        "require_lock": "true"
    });

    let created = provider.create("duo_policy", planned).await;
    assert!(!created.has_errors(), "{:?}", summaries(&created));
    assert_eq!(created.id(), Some("POL1"));

    let state = created.state.clone().unwrap_or_default();
    assert_eq!(state["require_lock"], "true");

    let read = provider.read("duo_policy", state.clone()).await;
    assert_eq!(read.state, Some(state.clone()));

    let deleted = provider.delete("duo_policy", state).await;
    assert!(!deleted.has_errors());
    assert_eq!(request_count(&server).await?, 1);
    Ok(())
}

#[tokio::test]
async fn user_data_source_reads_by_id() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU1"))
        .respond_with(ok(jane("hello")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU2"))
        .respond_with(fail(404, 40401, "Resource not found"))
        .mount(&server)
        .await;

    let provider = provider_for(&server)?;

    let request: LifecycleRequest = serde_json::from_value(json!({
        "kind": "data_source",
        "type_name": "duo_user",
        "operation": "read",
        "planned_state": {"user_id": "DU1"}
    }))?;
    let found = provider.handle(request).await;
    let state = found.state.clone().unwrap_or_default();
    assert_eq!(state["user_id"], "DU1");
    assert_eq!(state["notes"], "hello");

    let missing = provider
        .read_data_source("duo_user", json!({"user_id": "DU2"}))
        .await;
    assert!(missing.has_errors());
    Ok(())
}

#[tokio::test]
async fn import_reads_existing_user() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU1"))
        .respond_with(ok(jane("")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/v1/users/DU9"))
        .respond_with(fail(404, 40401, "Resource not found"))
        .mount(&server)
        .await;

    let provider = provider_for(&server)?;

    let imported = provider.import("duo_user", "DU1").await;
    assert_eq!(imported.id(), Some("DU1"));
    assert_eq!(
        imported.state.as_ref().map(|state| state["username"].clone()),
        Some(json!("jane"))
    );

    let missing = provider.import("duo_user", "DU9").await;
    assert!(missing.has_errors());
    Ok(())
}

#[tokio::test]
async fn create_failure_reports_duo_message() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/v1/users"))
        .respond_with(fail(400, 40003, "Duplicate username"))
        .mount(&server)
        .await;

    let response = provider_for(&server)?
        .create("duo_user", json!({"username": "jane"}))
        .await;

    assert_eq!(
        summaries(&response),
        vec!["Unable to create user: FAIL, error: Duplicate username"]
    );
    assert_eq!(response.state, None);
    Ok(())
}
