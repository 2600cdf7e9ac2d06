mod common;

use common::{body_json, errors, TestApp};
use serde_json::json;

#[tokio::test]
async fn non_owner_cannot_touch_another_client() {
    let app = TestApp::spawn().await;
    let (_, bob_token) = app.account("bob", false).await;

    let acme = app
        .create(&app.admin_token, "Cleiton", json!({ "name": "Acme", "email": "a@acme.com" }))
        .await;

    let envelope = app
        .mutate(Some(&bob_token), "updateCleiton", json!({ "id": acme["id"], "name": "Hacked" }))
        .await;
    assert_eq!(envelope, json!({ "cleiton": null, "success": false, "errors": "Permission denied." }));

    let stored = body_json(app.fetch("cleitons", &acme["id"]).await).await;
    assert_eq!(stored["data"]["name"], "Acme");

    let envelope = app
        .mutate(Some(&bob_token), "deleteCleiton", json!({ "id": acme["id"] }))
        .await;
    assert_eq!(errors(&envelope), "Permission denied.");
    assert_eq!(app.fetch("cleitons", &acme["id"]).await.status(), axum::http::StatusCode::OK);
}

#[tokio::test]
async fn other_users_projects_are_left_untouched() {
    let app = TestApp::spawn().await;
    let (_, alice_token) = app.account("alice", false).await;
    let (_, bob_token) = app.account("bob", false).await;

    let (_, project) = app.project_tree(&alice_token, "alice@client.com").await;
    let before = body_json(app.fetch("projects", &project["id"]).await).await["data"].clone();

    let envelope = app
        .mutate(
            Some(&bob_token),
            "updateProject",
            json!({ "id": project["id"], "name": "Taken over", "status": "on_hold" }),
        )
        .await;
    assert_eq!(envelope, json!({ "project": null, "success": false, "errors": "Permission denied." }));

    let envelope = app.mutate(Some(&bob_token), "deleteProject", json!({ "id": project["id"] })).await;
    assert_eq!(envelope, json!({ "success": false, "errors": "Permission denied." }));

    let after = body_json(app.fetch("projects", &project["id"]).await).await["data"].clone();
    assert_eq!(after, before);
}

#[tokio::test]
async fn owners_manage_their_own_tree() {
    let app = TestApp::spawn().await;
    let (_, bob_token) = app.account("bob", false).await;

    let (_, project) = app.project_tree(&bob_token, "bob@client.com").await;
    let task = app
        .create(
            &bob_token,
            "Task",
            json!({ "title": "Copy", "due_date": "2025-02-01T12:00:00Z", "project_id": project["id"] }),
        )
        .await;

    let envelope = app
        .mutate(Some(&bob_token), "updateTask", json!({ "id": task["id"], "completed": true }))
        .await;
    assert_eq!(envelope["success"], true, "{}", envelope);
    assert_eq!(envelope["task"]["completed"], true);

    let envelope = app.mutate(Some(&bob_token), "deleteTask", json!({ "id": task["id"] })).await;
    assert_eq!(envelope, json!({ "success": true, "errors": null }));
}

#[tokio::test]
async fn children_cannot_be_attached_to_foreign_parents() {
    let app = TestApp::spawn().await;
    let (_, bob_token) = app.account("bob", false).await;
    let (_, alice_token) = app.account("alice", false).await;

    let (_, alice_project) = app.project_tree(&alice_token, "alice@client.com").await;

    let envelope = app
        .mutate(
            Some(&bob_token),
            "createTask",
            json!({ "title": "Sneaky", "due_date": "2025-02-01T12:00:00Z", "project_id": alice_project["id"] }),
        )
        .await;
    assert_eq!(errors(&envelope), "Permission denied.");

    // Moving one's own project under someone else's client is denied too
    let (_, bob_project) = app.project_tree(&bob_token, "bob@client.com").await;
    let envelope = app
        .mutate(
            Some(&bob_token),
            "updateProject",
            json!({ "id": bob_project["id"], "cleiton_id": alice_project["cleiton_id"] }),
        )
        .await;
    assert_eq!(errors(&envelope), "Permission denied.");
}

#[tokio::test]
async fn plain_users_cannot_create_accounts_or_escalate() {
    let app = TestApp::spawn().await;
    let (bob_id, bob_token) = app.account("bob", false).await;

    let envelope = app
        .mutate(
            Some(&bob_token),
            "createAccount",
            json!({ "username": "mallory", "email": "m@example.com", "password": "long-enough-pass" }),
        )
        .await;
    assert_eq!(errors(&envelope), "Permission denied.");

    let envelope = app
        .mutate(Some(&bob_token), "updateAccount", json!({ "id": bob_id, "is_superuser": true }))
        .await;
    assert_eq!(errors(&envelope), "Permission denied.");

    let envelope = app
        .mutate(Some(&bob_token), "updateAccount", json!({ "id": bob_id, "phone_number": "+5511999998888" }))
        .await;
    assert_eq!(envelope["success"], true, "{}", envelope);
}

#[tokio::test]
async fn staff_restrictions() {
    let app = TestApp::spawn().await;
    let (_, staff_token) = app.account("sam", true).await;
    let (other_staff_id, _) = app.account("sue", true).await;
    let (bob_id, _) = app.account("bob", false).await;

    // Staff manage plain accounts and other people's data
    let envelope = app
        .mutate(Some(&staff_token), "updateAccount", json!({ "id": bob_id, "phone_number": "+5511999998888" }))
        .await;
    assert_eq!(envelope["success"], true, "{}", envelope);

    let acme = app
        .create(&app.admin_token, "Cleiton", json!({ "name": "Acme", "email": "a@acme.com" }))
        .await;
    let envelope = app
        .mutate(Some(&staff_token), "updateCleiton", json!({ "id": acme["id"], "phone": "555" }))
        .await;
    assert_eq!(envelope["success"], true, "{}", envelope);

    // but not superusers, other staff deletions, or role flags
    let envelope = app
        .mutate(Some(&staff_token), "updateAccount", json!({ "id": app.admin_id, "phone_number": "+5511999998888" }))
        .await;
    assert_eq!(errors(&envelope), "Permission denied.");

    let envelope = app
        .mutate(Some(&staff_token), "deleteAccount", json!({ "id": other_staff_id }))
        .await;
    assert_eq!(errors(&envelope), "Permission denied.");

    let envelope = app
        .mutate(Some(&staff_token), "updateAccount", json!({ "id": bob_id, "is_staff": true }))
        .await;
    assert_eq!(errors(&envelope), "Permission denied.");

    let envelope = app.mutate(Some(&staff_token), "deleteAccount", json!({ "id": bob_id })).await;
    assert_eq!(envelope["success"], true, "{}", envelope);
}

#[tokio::test]
async fn denial_precedes_validation() {
    let app = TestApp::spawn().await;
    let (_, bob_token) = app.account("bob", false).await;
    let acme = app
        .create(&app.admin_token, "Cleiton", json!({ "name": "Acme", "email": "a@acme.com" }))
        .await;

    // An invalid value does not reveal anything to a caller who may not write
    let envelope = app
        .mutate(Some(&bob_token), "updateCleiton", json!({ "id": acme["id"], "email": "not-an-email" }))
        .await;
    assert_eq!(errors(&envelope), "Permission denied.");
}
