// Thin HTTP client for a running server

use anyhow::{anyhow, Context};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use url::Url;

pub struct ApiClient {
    base_url: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid server URL {:?}", base_url))?;
        Ok(Self {
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
            http: reqwest::Client::new(),
        })
    }

    pub fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid request path {:?}", path))
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        let request = self.http.get(self.url(path)?);
        self.send(request).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        self.send(self.http.get(url)).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        let request = self.http.post(self.url(path)?).json(body);
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> anyhow::Result<Value> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.context("request failed")?;
        let status = response.status();
        let body: Value = response.json().await.context("response was not JSON")?;

        if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
            return Ok(body);
        }

        let message = body
            .get("message")
            .or_else(|| body.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        Err(anyhow!("{} ({})", message, status))
    }
}
