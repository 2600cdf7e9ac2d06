#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use pm_api_rust::api::ids;
use pm_api_rust::app::{router, AppState};
use pm_api_rust::auth::{generate_jwt, Claims};
use pm_api_rust::database::bootstrap::ensure_superuser;
use pm_api_rust::database::{EntityStore, MemoryStore};
use pm_api_rust::schema::EntityKind;
use pm_api_rust::types::EntityId;

/// In-process server over a fresh in-memory store with one superuser
pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn EntityStore>,
    pub admin_id: EntityId,
    pub admin_token: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
        let admin_id = ensure_superuser(store.as_ref(), "admin", "admin@example.com", "admin-password")
            .await
            .expect("bootstrap superuser")
            .expect("fresh store has no admin");

        Self {
            router: router(AppState::new(store.clone())),
            store,
            admin_id,
            admin_token: token_for(admin_id, "admin"),
        }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("valid request"))
            .await
            .expect("router is infallible")
    }

    /// POST a body verbatim, for inputs `serde_json::Value` cannot express
    pub async fn post_raw(&self, uri: &str, token: Option<&str>, body: &'static str) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        self.router
            .clone()
            .oneshot(builder.body(Body::from(body)).expect("valid request"))
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.request(Method::GET, uri, token, None).await
    }

    /// Run a mutation; the transport status is always 200
    pub async fn mutate(&self, token: Option<&str>, name: &str, arguments: Value) -> Value {
        let response = self
            .request(Method::POST, &format!("/api/mutations/{}", name), token, Some(arguments))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "{} answered {}", name, response.status());
        body_json(response).await
    }

    /// Create an entity that must succeed; returns the entity object
    pub async fn create(&self, token: &str, type_name: &str, arguments: Value) -> Value {
        let envelope = self.mutate(Some(token), &format!("create{}", type_name), arguments).await;
        assert_eq!(envelope["success"], true, "create{} failed: {}", type_name, envelope);
        envelope[field_name(type_name)].clone()
    }

    /// Create an account as the superuser; returns its numeric id and a token
    pub async fn account(&self, username: &str, is_staff: bool) -> (EntityId, String) {
        let account = self
            .create(
                &self.admin_token,
                "Account",
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "correct-horse-battery",
                    "is_staff": is_staff,
                }),
            )
            .await;
        let id = numeric_id(&account["id"]);
        (id, token_for(id, username))
    }

    /// Client -> Project owned by the holder of `token`; returns both entities
    pub async fn project_tree(&self, token: &str, email: &str) -> (Value, Value) {
        let cleiton = self
            .create(token, "Cleiton", json!({ "name": "Acme", "email": email }))
            .await;
        let project = self
            .create(
                token,
                "Project",
                json!({
                    "name": "Website",
                    "description": "Relaunch",
                    "cleiton_id": cleiton["id"],
                    "start_date": "2025-01-01",
                    "estimated_end_date": "2025-06-30",
                }),
            )
            .await;
        (cleiton, project)
    }

    /// GET a record through the data API as the superuser
    pub async fn fetch(&self, table: &str, id: &Value) -> Response {
        let id = id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string());
        self.get(&format!("/api/data/{}/{}", table, id), Some(&self.admin_token)).await
    }
}

pub fn token_for(id: EntityId, username: &str) -> String {
    generate_jwt(&Claims::new(id, username)).expect("token")
}

pub fn numeric_id(value: &Value) -> EntityId {
    ids::decode(value).expect("decodable id").1
}

pub fn field_name(type_name: &str) -> &'static str {
    EntityKind::from_type_name(type_name).expect("known type").field_name()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("JSON body")
}

pub fn errors(envelope: &Value) -> &str {
    envelope["errors"].as_str().unwrap_or_default()
}
