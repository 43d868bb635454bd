//! API client
//!
//! Thin wrappers over the server's JSON routes. The bearer token lives in
//! `localStorage` so a reload keeps the session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

const TOKEN_KEY: &str = "mindmap_token";

/// Error body returned by every failing route
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(rename = "error")]
    pub message: String,
    pub code: String,
}

impl ApiError {
    fn network(e: impl fmt::Display) -> Self {
        Self {
            message: e.to_string(),
            code: "NETWORK_ERROR".into(),
        }
    }

    pub fn needs_subscription(&self) -> bool {
        self.code == "SUBSCRIPTION_REQUIRED"
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.code == "UNAUTHENTICATED"
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AccessStatus {
    pub trial_ends_at: DateTime<Utc>,
    pub in_trial: bool,
    pub trial_days_left: u32,
    pub cancel_at_period_end: bool,
    pub has_access: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Me {
    pub user: User,
    pub access: AccessStatus,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    user: User,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MindMapSummary {
    pub id: String,
    pub title: String,
    pub language: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct OutlineNode {
    pub label: String,
    #[serde(default)]
    pub children: Vec<OutlineNode>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MindMap {
    pub id: String,
    pub title: String,
    pub outline: OutlineNode,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

/// Source of a generated map
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationInput {
    Text { text: String },
    Topic { topic: String, description: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct GenerationRequest {
    pub title: String,
    pub input: GenerationInput,
    pub language: String,
}

/// Rendered export ready to be offered as a download
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Export {
    pub file_name: String,
    pub href: String,
}

fn storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub fn token() -> Option<String> {
    storage().and_then(|s| s.get_item(TOKEN_KEY).ok().flatten())
}

fn store_token(token: Option<&str>) {
    if let Some(storage) = storage() {
        let _ = match token {
            Some(token) => storage.set_item(TOKEN_KEY, token),
            None => storage.remove_item(TOKEN_KEY),
        };
    }
}

pub fn origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into())
}

fn authorized(request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    match token() {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn send(request: reqwest::RequestBuilder) -> ApiResult<reqwest::Response> {
    let response = authorized(request).send().await.map_err(ApiError::network)?;
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error = response.json::<ApiError>().await.unwrap_or_else(|_| ApiError {
        message: format!("Request failed ({status})"),
        code: "HTTP_ERROR".into(),
    });
    if error.is_unauthenticated() {
        store_token(None);
    }
    Err(error)
}

async fn json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> ApiResult<T> {
    send(request).await?.json().await.map_err(ApiError::network)
}

pub async fn register(username: &str, email: &str, password: &str) -> ApiResult<User> {
    let body = serde_json::json!({
        "username": username,
        "email": email,
        "password": password,
    });
    let auth: AuthResponse = json(reqwest::Client::new().post("/api/auth/register").json(&body)).await?;
    store_token(Some(&auth.token));
    Ok(auth.user)
}

pub async fn login(username: &str, password: &str) -> ApiResult<User> {
    let body = serde_json::json!({
        "username": username,
        "password": password,
    });
    let auth: AuthResponse = json(reqwest::Client::new().post("/api/auth/login").json(&body)).await?;
    store_token(Some(&auth.token));
    Ok(auth.user)
}

pub async fn logout() {
    // the local token goes regardless of the server's answer
    let _ = send(reqwest::Client::new().post("/api/auth/logout")).await;
    store_token(None);
}

pub async fn me() -> ApiResult<Me> {
    json(reqwest::Client::new().get("/api/me")).await
}

pub async fn languages() -> ApiResult<Vec<Language>> {
    json(reqwest::Client::new().get("/api/languages")).await
}

pub async fn list_mindmaps() -> ApiResult<Vec<MindMapSummary>> {
    json(reqwest::Client::new().get("/api/mindmaps")).await
}

pub async fn get_mindmap(id: &str) -> ApiResult<MindMap> {
    json(reqwest::Client::new().get(format!("/api/mindmaps/{id}"))).await
}

pub async fn generate(request: &GenerationRequest) -> ApiResult<MindMap> {
    json(reqwest::Client::new().post("/api/mindmaps/generate").json(request)).await
}

pub async fn create_from_markdown(title: &str, markdown: &str, language: &str) -> ApiResult<MindMap> {
    let body = serde_json::json!({
        "title": title,
        "markdown": markdown,
        "language": language,
    });
    json(reqwest::Client::new().post("/api/mindmaps").json(&body)).await
}

pub async fn upload(file_name: String, bytes: Vec<u8>, title: &str, language: &str) -> ApiResult<MindMap> {
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("application/pdf")
        .map_err(ApiError::network)?;
    let form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("title", title.to_string())
        .text("language", language.to_string());
    json(reqwest::Client::new().post("/api/mindmaps/upload").multipart(form)).await
}

pub async fn delete_mindmap(id: &str) -> ApiResult<()> {
    send(reqwest::Client::new().delete(format!("/api/mindmaps/{id}"))).await?;
    Ok(())
}

/// Fetch an export and wrap it in a data URL for an `<a download>` link
pub async fn export(id: &str, format: &str) -> ApiResult<Export> {
    let response = send(reqwest::Client::new().get(format!("/api/mindmaps/{id}/export/{format}"))).await?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("text/plain")
        .to_string();
    let file_name = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(attachment_name)
        .unwrap_or_else(|| format!("mindmap.{format}"));
    let body = response.text().await.map_err(ApiError::network)?;

    Ok(Export {
        file_name,
        href: format!("data:{content_type},{}", String::from(js_sys::encode_uri_component(&body))),
    })
}

fn attachment_name(disposition: &str) -> Option<String> {
    let (_, name) = disposition.split_once("filename=")?;
    let name = name.trim_matches('"');
    (!name.is_empty()).then(|| name.to_string())
}

pub async fn subscription() -> ApiResult<Option<Subscription>> {
    json(reqwest::Client::new().get("/api/billing/subscription")).await
}

pub async fn subscribe() -> ApiResult<Subscription> {
    json(reqwest::Client::new().post("/api/billing/subscribe")).await
}

pub async fn cancel() -> ApiResult<Subscription> {
    let body = serde_json::json!({ "mode": "at_period_end" });
    json(reqwest::Client::new().post("/api/billing/cancel").json(&body)).await
}

pub async fn reactivate() -> ApiResult<Subscription> {
    json(reqwest::Client::new().post("/api/billing/reactivate")).await
}

/// Create a Stripe checkout session
pub async fn create_checkout() -> ApiResult<String> {
    let origin = origin();
    let body = serde_json::json!({
        "success_url": format!("{origin}/dashboard?checkout=success"),
        "cancel_url": format!("{origin}/pricing"),
    });

    #[derive(Deserialize)]
    struct CheckoutResponse {
        checkout_url: String,
    }

    let response: CheckoutResponse = json(reqwest::Client::new().post("/api/checkout").json(&body)).await?;
    Ok(response.checkout_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_name() {
        assert_eq!(
            attachment_name("attachment; filename=\"Rust.md\"").as_deref(),
            Some("Rust.md")
        );
        assert_eq!(attachment_name("attachment"), None);
        assert_eq!(attachment_name("attachment; filename=\"\""), None);
    }

    #[test]
    fn test_error_body_parses() {
        let error: ApiError =
            serde_json::from_str(r#"{"error":"Subscribe to keep generating","code":"SUBSCRIPTION_REQUIRED"}"#)
                .unwrap();
        assert!(error.needs_subscription());
        assert!(!error.is_unauthenticated());
        assert_eq!(error.to_string(), "Subscribe to keep generating");
    }

    #[test]
    fn test_generation_request_shape() {
        let request = GenerationRequest {
            title: "Rust".into(),
            input: GenerationInput::Topic {
                topic: "Rust".into(),
                description: "ownership".into(),
            },
            language: "en".into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["input"]["kind"], "topic");
        assert_eq!(value["input"]["description"], "ownership");
    }
}
