//! Remote API client
//!
//! All outbound calls go through [`ApiClient::request`], which attaches the
//! bearer token, encodes the body and turns non-2xx responses into
//! [`ApiError::Status`]. The actual HTTP stack sits behind
//! [`HttpTransport`]: `fetch` in the browser, a scripted fake in tests.
//! There is no retry, timeout or cancellation.

use crate::compress::CompressionSettings;
use crate::error::{ApiError, AuthError, CompressError};
use crate::intake::IncomingFile;
use crate::plan::Plan;
use crate::service::{AuthSession, RemoteService};
use crate::tools::ToolFeature;
use crate::user::User;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::cell::RefCell;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(name: &str, file: &IncomingFile) -> Self {
        Self {
            name: name.to_string(),
            value: FormValue::File {
                file_name: file.meta.name.clone(),
                mime_type: file.meta.mime_type.clone(),
                bytes: file.bytes.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    /// Server-supplied `error`/`message` field, else the status text
    pub fn error_message(&self) -> String {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: Option<String>,
            message: Option<String>,
        }

        if let Ok(body) = serde_json::from_slice::<ErrorBody>(&self.body) {
            if let Some(msg) = body.error.or(body.message).filter(|m| !m.is_empty()) {
                return msg;
            }
        }

        if !self.status_text.is_empty() {
            return self.status_text.clone();
        }
        format!("Server returned {}", self.status)
    }
}

#[async_trait(?Send)]
pub trait HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    user: User,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subscription {
    pub plan: Plan,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    subscription: Option<Subscription>,
}

impl SubscriptionResponse {
    fn plan(self) -> Option<Plan> {
        self.user
            .map(|u| u.plan)
            .or_else(|| self.subscription.map(|s| s.plan))
    }
}

pub struct ApiClient<T> {
    transport: T,
    base_url: String,
    token: RefCell<Option<String>>,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(transport: T, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RefCell::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Single request helper used by every endpoint
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<ApiResponse, ApiError> {
        let mut headers = Vec::new();
        if let Some(token) = self.token.borrow().as_deref() {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        if matches!(body, RequestBody::Json(_)) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        let request = ApiRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers,
            body,
        };

        debug!(method = method.as_str(), url = %request.url, "api request");
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            let message = response.error_message();
            warn!(status = response.status, %message, path, "api request failed");
            return Err(ApiError::Status {
                status: response.status,
                message,
            });
        }

        Ok(response)
    }

    async fn request_json<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<R, ApiError> {
        self.request(method, path, body).await?.json()
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        let response: UserResponse = self
            .request_json(Method::Get, "/api/auth/profile", RequestBody::Empty)
            .await?;
        Ok(response.user)
    }

    pub async fn subscription(&self) -> Result<Option<Subscription>, ApiError> {
        let response: SubscriptionResponse = self
            .request_json(Method::Get, "/api/subscriptions", RequestBody::Empty)
            .await?;
        Ok(response.subscription)
    }

    fn compression_fields(parts: &mut Vec<FormPart>, settings: CompressionSettings) {
        parts.push(FormPart::text("compressionLevel", settings.level.label()));
        parts.push(FormPart::text(
            "imageQuality",
            settings.image_quality.to_string(),
        ));
    }
}

#[async_trait(?Send)]
impl<T: HttpTransport> RemoteService for ApiClient<T> {
    fn authorize(&self, token: Option<String>) {
        *self.token.borrow_mut() = token;
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response: AuthResponse = self
            .request_json(
                Method::Post,
                "/api/auth/login",
                RequestBody::Json(json!({ "email": email, "password": password })),
            )
            .await?;
        Ok(AuthSession {
            user: response.user,
            token: response.token,
        })
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, AuthError> {
        let response: AuthResponse = self
            .request_json(
                Method::Post,
                "/api/auth/register",
                RequestBody::Json(json!({ "email": email, "password": password, "name": name })),
            )
            .await?;
        Ok(AuthSession {
            user: response.user,
            token: response.token,
        })
    }

    async fn compress(
        &self,
        file: &IncomingFile,
        settings: CompressionSettings,
    ) -> Result<Vec<u8>, CompressError> {
        let mut parts = vec![FormPart::file("file", file)];
        Self::compression_fields(&mut parts, settings);
        let response = self
            .request(Method::Post, "/api/compress", RequestBody::Multipart(parts))
            .await?;
        Ok(response.body)
    }

    async fn compress_bulk(
        &self,
        files: &[IncomingFile],
        settings: CompressionSettings,
    ) -> Result<Vec<u8>, CompressError> {
        let mut parts: Vec<FormPart> = files.iter().map(|f| FormPart::file("files", f)).collect();
        Self::compression_fields(&mut parts, settings);
        let response = self
            .request(
                Method::Post,
                "/api/compress/bulk",
                RequestBody::Multipart(parts),
            )
            .await?;
        Ok(response.body)
    }

    async fn run_tool(
        &self,
        tool: ToolFeature,
        files: &[IncomingFile],
    ) -> Result<Vec<u8>, ApiError> {
        let mut parts: Vec<FormPart> = files.iter().map(|f| FormPart::file("files", f)).collect();
        for (name, value) in tool.form_fields() {
            parts.push(FormPart::text(name, value));
        }
        let response = self
            .request(Method::Post, tool.endpoint(), RequestBody::Multipart(parts))
            .await?;
        Ok(response.body)
    }

    async fn change_plan(&self, plan: &Plan) -> Result<Plan, ApiError> {
        let response: SubscriptionResponse = self
            .request_json(
                Method::Post,
                "/api/subscriptions/create",
                RequestBody::Json(json!({ "plan": plan.label() })),
            )
            .await?;
        Ok(response.plan().unwrap_or_else(|| plan.clone()))
    }

    async fn cancel_subscription(&self) -> Result<Plan, ApiError> {
        let response: SubscriptionResponse = self
            .request_json(
                Method::Post,
                "/api/subscriptions/cancel",
                RequestBody::Empty,
            )
            .await?;
        Ok(response.plan().unwrap_or(Plan::Free))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use crate::compress::CompressionLevel;
    use crate::intake::PDF_MIME;

    fn client(transport: ScriptedTransport) -> ApiClient<ScriptedTransport> {
        ApiClient::new(transport, "https://api.example.test/")
    }

    #[tokio::test]
    async fn test_login_parses_user_and_token() {
        let api = client(ScriptedTransport::default().reply(
            200,
            "OK",
            br#"{"user":{"id":5,"name":"Ann","email":"ann@example.com","plan":"Pro Annual"},"token":"t0k"}"#,
        ));

        let session = api.login("ann@example.com", "pw").await.unwrap();
        assert_eq!(session.user.plan, Plan::ProAnnual);
        assert_eq!(session.token.as_deref(), Some("t0k"));

        let sent = api.transport().last();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.url, "https://api.example.test/api/auth/login");
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(sent.header("Authorization"), None);
        assert_eq!(
            sent.body,
            RequestBody::Json(json!({"email": "ann@example.com", "password": "pw"}))
        );
    }

    #[tokio::test]
    async fn test_bearer_token_attached_when_present() {
        let api = client(ScriptedTransport::default().reply(
            200,
            "OK",
            br#"{"user":{"id":1,"name":"A","email":"a@example.com","plan":"Free"}}"#,
        ));
        api.authorize(Some("secret".into()));

        api.profile().await.unwrap();
        assert_eq!(
            api.transport().last().header("Authorization"),
            Some("Bearer secret")
        );
    }

    #[tokio::test]
    async fn test_error_uses_server_error_field() {
        let api = client(ScriptedTransport::default().reply(
            401,
            "Unauthorized",
            br#"{"error":"Email or password is wrong"}"#,
        ));
        let err = api.login("x@example.com", "nope").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::Api(ApiError::Status {
                status: 401,
                message: "Email or password is wrong".into()
            })
        );
    }

    #[tokio::test]
    async fn test_error_falls_back_to_message_then_status_text() {
        let api = client(
            ScriptedTransport::default()
                .reply(400, "Bad Request", br#"{"message":"Missing plan"}"#)
                .reply(502, "Bad Gateway", b"<html>upstream</html>")
                .reply(500, "", b""),
        );

        let err = api.change_plan(&Plan::Pro).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing plan");

        let err = api.change_plan(&Plan::Pro).await.unwrap_err();
        assert_eq!(err.to_string(), "Bad Gateway");

        let err = api.change_plan(&Plan::Pro).await.unwrap_err();
        assert_eq!(err.to_string(), "Server returned 500");
    }

    #[tokio::test]
    async fn test_compress_sends_multipart_fields() {
        let api = client(ScriptedTransport::default().reply(200, "OK", b"%PDF-small"));
        let file = IncomingFile::new("doc.pdf", PDF_MIME, b"%PDF-big".to_vec());
        let settings = CompressionSettings {
            level: CompressionLevel::High,
            image_quality: 60,
        };

        let bytes = api.compress(&file, settings).await.unwrap();
        assert_eq!(bytes, b"%PDF-small");

        let sent = api.transport().last();
        assert_eq!(sent.url, "https://api.example.test/api/compress");
        let RequestBody::Multipart(parts) = sent.body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].name, "file");
        assert_eq!(parts[1], FormPart::text("compressionLevel", "high"));
        assert_eq!(parts[2], FormPart::text("imageQuality", "60"));
        assert_eq!(sent.headers.iter().filter(|(k, _)| k == "Content-Type").count(), 0);
    }

    #[tokio::test]
    async fn test_bulk_compress_repeats_files_field() {
        let api = client(ScriptedTransport::default().reply(200, "OK", b"PK"));
        let files = vec![
            IncomingFile::new("a.pdf", PDF_MIME, vec![1]),
            IncomingFile::new("b.pdf", PDF_MIME, vec![2]),
        ];
        api.compress_bulk(&files, CompressionSettings::default())
            .await
            .unwrap();

        let RequestBody::Multipart(parts) = api.transport().last().body else {
            panic!("expected multipart body");
        };
        assert_eq!(parts.iter().filter(|p| p.name == "files").count(), 2);
    }

    #[tokio::test]
    async fn test_server_compress_failure_is_wrapped() {
        let api = client(ScriptedTransport::default().reply(413, "Payload Too Large", b""));
        let file = IncomingFile::new("doc.pdf", PDF_MIME, vec![0; 4]);
        let err = api
            .compress(&file, CompressionSettings::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to compress PDF on server: Payload Too Large"
        );
    }

    #[tokio::test]
    async fn test_network_error_passes_through() {
        let api = client(ScriptedTransport::default().fail(ApiError::Network("offline".into())));
        let err = api.subscription().await.unwrap_err();
        assert_eq!(err, ApiError::Network("offline".into()));
    }

    #[tokio::test]
    async fn test_plan_change_prefers_returned_user() {
        let api = client(
            ScriptedTransport::default()
                .reply(
                    200,
                    "OK",
                    br#"{"user":{"id":1,"name":"A","email":"a@example.com","plan":"Pro Monthly"}}"#,
                )
                .reply(200, "OK", br#"{"subscription":{"plan":"Free","status":"canceled"}}"#)
                .reply(200, "OK", b"{}"),
        );

        assert_eq!(api.change_plan(&Plan::Pro).await.unwrap(), Plan::ProMonthly);
        assert_eq!(api.cancel_subscription().await.unwrap(), Plan::Free);
        assert_eq!(api.change_plan(&Plan::Business).await.unwrap(), Plan::Business);
    }

    #[tokio::test]
    async fn test_invalid_json_is_reported() {
        let api = client(ScriptedTransport::default().reply(200, "OK", b"not json"));
        let err = api.profile().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
