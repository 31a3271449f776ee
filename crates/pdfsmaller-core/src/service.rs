//! Remote service seam
//!
//! [`RemoteService`] is what the controller talks to. Production builds
//! use [`crate::api::ApiClient`]; [`DemoService`] answers locally with
//! fixed credentials and is only selected in demo mode or tests.

use crate::compress::{compress_pdf, CompressionSettings};
use crate::error::{ApiError, AuthError, CompressError};
use crate::intake::IncomingFile;
use crate::plan::Plan;
use crate::tools::ToolFeature;
use crate::user::User;
use async_trait::async_trait;
use std::cell::Cell;
use tracing::info;

/// Successful sign-in or registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: User,
    pub token: Option<String>,
}

#[async_trait(?Send)]
pub trait RemoteService {
    /// Set or clear the bearer token used for later calls
    fn authorize(&self, _token: Option<String>) {}

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn register(&self, email: &str, password: &str, name: &str)
        -> Result<AuthSession, AuthError>;

    async fn compress(
        &self,
        file: &IncomingFile,
        settings: CompressionSettings,
    ) -> Result<Vec<u8>, CompressError>;

    async fn compress_bulk(
        &self,
        files: &[IncomingFile],
        settings: CompressionSettings,
    ) -> Result<Vec<u8>, CompressError>;

    async fn run_tool(&self, tool: ToolFeature, files: &[IncomingFile])
        -> Result<Vec<u8>, ApiError>;

    /// Subscribe to `plan`; returns the plan now in effect
    async fn change_plan(&self, plan: &Plan) -> Result<Plan, ApiError>;

    /// Cancel the paid plan; returns the plan now in effect
    async fn cancel_subscription(&self) -> Result<Plan, ApiError>;
}

pub const DEMO_PASSWORD: &str = "password";
pub const DEMO_FREE_EMAIL: &str = "demo@example.com";
pub const DEMO_PRO_EMAIL: &str = "pro@example.com";

/// Local stand-in for the API
///
/// Compression runs the real lopdf fallback so reported sizes are measured.
/// Bulk and tool calls are not available offline.
#[derive(Debug)]
pub struct DemoService {
    next_id: Cell<u64>,
}

impl DemoService {
    /// `seed_ms` is the timestamp used for the first registered id
    pub fn new(seed_ms: u64) -> Self {
        Self {
            next_id: Cell::new(seed_ms),
        }
    }

    fn allocate_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

#[async_trait(?Send)]
impl RemoteService for DemoService {
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = match (email, password) {
            (DEMO_FREE_EMAIL, DEMO_PASSWORD) => User::new(1, "Demo User", email, Plan::Free),
            (DEMO_PRO_EMAIL, DEMO_PASSWORD) => User::new(2, "Pro User", email, Plan::Pro),
            _ => return Err(AuthError::InvalidCredentials),
        };
        info!(user_id = %user.id, plan = %user.plan, "demo login");
        Ok(AuthSession { user, token: None })
    }

    async fn register(
        &self,
        email: &str,
        _password: &str,
        name: &str,
    ) -> Result<AuthSession, AuthError> {
        let user = User::new(self.allocate_id(), name, email, Plan::Free);
        Ok(AuthSession { user, token: None })
    }

    async fn compress(
        &self,
        file: &IncomingFile,
        settings: CompressionSettings,
    ) -> Result<Vec<u8>, CompressError> {
        let (bytes, _) = compress_pdf(&file.bytes, settings.level, |_| {})?;
        Ok(bytes)
    }

    async fn compress_bulk(
        &self,
        _files: &[IncomingFile],
        _settings: CompressionSettings,
    ) -> Result<Vec<u8>, CompressError> {
        Err(CompressError::Server(unavailable("Bulk compression")))
    }

    async fn run_tool(
        &self,
        tool: ToolFeature,
        _files: &[IncomingFile],
    ) -> Result<Vec<u8>, ApiError> {
        Err(unavailable(tool.display_name()))
    }

    async fn change_plan(&self, plan: &Plan) -> Result<Plan, ApiError> {
        Ok(plan.clone())
    }

    async fn cancel_subscription(&self) -> Result<Plan, ApiError> {
        Ok(Plan::Free)
    }
}

fn unavailable(what: &str) -> ApiError {
    ApiError::Status {
        status: 503,
        message: format!("{} is not available in demo mode", what),
    }
}
