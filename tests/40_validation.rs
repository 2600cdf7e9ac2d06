mod common;

use common::{body_json, errors, TestApp};
use pm_api_rust::api::ids;
use pm_api_rust::schema::EntityKind;
use serde_json::json;

#[tokio::test]
async fn missing_client_is_not_found_and_nothing_is_written() {
    let app = TestApp::spawn().await;

    let envelope = app
        .mutate(
            Some(&app.admin_token),
            "createProject",
            json!({
                "name": "X",
                "description": "-",
                "cleiton_id": ids::encode(EntityKind::Cleiton, 999),
                "start_date": "2025-01-01",
                "estimated_end_date": "2025-02-01",
            }),
        )
        .await;
    assert_eq!(envelope, json!({ "project": null, "success": false, "errors": "Cleiton not found." }));

    let body = body_json(app.get("/api/data/projects", Some(&app.admin_token)).await).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn id_of_the_wrong_type_does_not_resolve() {
    let app = TestApp::spawn().await;
    let (_, project) = app.project_tree(&app.admin_token, "a@acme.com").await;
    assert_eq!(project["name"], "Website");

    let envelope = app
        .mutate(
            Some(&app.admin_token),
            "createTask",
            json!({ "title": "T", "due_date": "2025-02-01T12:00:00Z", "project_id": ids::encode(EntityKind::Report, 1) }),
        )
        .await;
    assert_eq!(errors(&envelope), "Project not found.");

    let envelope = app
        .mutate(Some(&app.admin_token), "updateProject", json!({ "id": "garbage", "name": "Y" }))
        .await;
    assert_eq!(errors(&envelope), "id: Invalid Project id.");
}

#[tokio::test]
async fn all_field_violations_are_reported_together() {
    let app = TestApp::spawn().await;

    let envelope = app
        .mutate(
            Some(&app.admin_token),
            "createCleiton",
            json!({ "name": "", "email": "nope", "phone": "0".repeat(25) }),
        )
        .await;
    assert_eq!(envelope["success"], false);

    let message = errors(&envelope);
    assert!(message.contains("name: This field is required."), "{}", message);
    assert!(message.contains("email: Enter a valid email address."), "{}", message);
    assert!(message.contains("phone: Ensure this value has at most 20 characters."), "{}", message);
}

#[tokio::test]
async fn unknown_and_server_assigned_fields_are_rejected() {
    let app = TestApp::spawn().await;
    let (_, project) = app.project_tree(&app.admin_token, "a@acme.com").await;

    let envelope = app
        .mutate(Some(&app.admin_token), "updateProject", json!({ "id": project["id"], "budget": 10 }))
        .await;
    assert_eq!(errors(&envelope), "Unknown field: budget.");

    let envelope = app
        .mutate(
            Some(&app.admin_token),
            "createCleiton",
            json!({ "id": 7, "name": "Acme", "email": "x@acme.com" }),
        )
        .await;
    assert_eq!(errors(&envelope), "id: This field is set by the server.");

    let envelope = app
        .mutate(Some(&app.admin_token), "updateProject", json!({ "name": "No target" }))
        .await;
    assert_eq!(errors(&envelope), "id: This field is required.");
}

#[tokio::test]
async fn end_date_must_not_precede_start() {
    let app = TestApp::spawn().await;
    let (_, project) = app.project_tree(&app.admin_token, "a@acme.com").await;

    let envelope = app
        .mutate(
            Some(&app.admin_token),
            "updateProject",
            json!({ "id": project["id"], "estimated_end_date": "2024-12-31" }),
        )
        .await;
    assert_eq!(errors(&envelope), "Estimated end date must not be before the start date.");
}

#[tokio::test]
async fn emails_are_unique() {
    let app = TestApp::spawn().await;
    app.create(&app.admin_token, "Cleiton", json!({ "name": "Acme", "email": "a@acme.com" }))
        .await;

    let envelope = app
        .mutate(
            Some(&app.admin_token),
            "createCleiton",
            json!({ "name": "Acme 2", "email": "a@acme.com" }),
        )
        .await;
    assert_eq!(errors(&envelope), "email: Cleiton with this email already exists.");

    let envelope = app
        .mutate(
            Some(&app.admin_token),
            "createAccount",
            json!({ "username": "ADMIN", "email": "other@example.com", "password": "long-enough-pass" }),
        )
        .await;
    assert_eq!(errors(&envelope), "username: Account with this username already exists.");
}

#[tokio::test]
async fn task_activity_must_share_the_project() {
    let app = TestApp::spawn().await;
    let (_, website) = app.project_tree(&app.admin_token, "a@acme.com").await;
    let (_, other) = app.project_tree(&app.admin_token, "b@acme.com").await;

    let activity = app
        .create(
            &app.admin_token,
            "Activity",
            json!({
                "name": "Design",
                "description": "-",
                "project_id": other["id"],
                "expected_completion_date": "2025-03-01",
            }),
        )
        .await;

    let envelope = app
        .mutate(
            Some(&app.admin_token),
            "createTask",
            json!({
                "title": "Copy",
                "due_date": "2025-02-01T12:00:00Z",
                "project_id": website["id"],
                "activity_id": activity["id"],
            }),
        )
        .await;
    assert_eq!(errors(&envelope), "Activity must belong to the task's project.");

    let task = app
        .create(
            &app.admin_token,
            "Task",
            json!({
                "title": "Copy",
                "due_date": "2025-02-01T12:00:00Z",
                "project_id": other["id"],
                "activity_id": activity["id"],
            }),
        )
        .await;
    assert_eq!(task["activity_id"], activity["id"]);
}

#[tokio::test]
async fn notification_needs_exactly_one_subject_of_its_client() {
    let app = TestApp::spawn().await;
    let (acme, website) = app.project_tree(&app.admin_token, "a@acme.com").await;
    let (globex, _) = app.project_tree(&app.admin_token, "g@globex.com").await;
    let report = app
        .create(
            &app.admin_token,
            "Report",
            json!({ "title": "Q1", "content": "-", "project_id": website["id"] }),
        )
        .await;

    let message = "A notification must be associated with exactly one entity.";

    let none = app
        .mutate(
            Some(&app.admin_token),
            "createNotification",
            json!({ "title": "Hi", "message": "-", "cleiton_id": acme["id"] }),
        )
        .await;
    assert_eq!(errors(&none), message);

    let two = app
        .mutate(
            Some(&app.admin_token),
            "createNotification",
            json!({
                "title": "Hi",
                "message": "-",
                "cleiton_id": acme["id"],
                "project_id": website["id"],
                "report_id": report["id"],
            }),
        )
        .await;
    assert_eq!(errors(&two), message);

    let foreign = app
        .mutate(
            Some(&app.admin_token),
            "createNotification",
            json!({ "title": "Hi", "message": "-", "cleiton_id": globex["id"], "report_id": report["id"] }),
        )
        .await;
    assert_eq!(errors(&foreign), "The notification subject must belong to the originating client.");

    let body = body_json(app.get("/api/data/notifications", Some(&app.admin_token)).await).await;
    assert_eq!(body["data"], json!([]));
}
