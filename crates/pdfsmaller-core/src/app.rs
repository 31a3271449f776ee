//! Application controller
//!
//! `App` owns the session store, the page state and the toast list. It is
//! constructed explicitly and handed the remote service per call, so tests
//! can swap in fakes.
//!
//! Every async operation is also exposed as a `begin_*` / `finish_*` pair.
//! The browser client uses those so it never holds a `RefCell` borrow of
//! the app across an await point.

use crate::api::Subscription;
use crate::compress::{
    CompressionLevel, CompressionPass, CompressionSettings, PROGRESS_LOADED, PROGRESS_SAVED,
};
use crate::config::ClientConfig;
use crate::error::{ApiError, AppError, AuthError, CompressError, IntakeError};
use crate::intake::{self, BulkIntake, FileMeta, IncomingFile};
use crate::notify::{NotificationCenter, NotificationLevel};
use crate::plan::Plan;
use crate::result::CompressionResult;
use crate::service::{AuthSession, RemoteService};
use crate::session::SessionStore;
use crate::state::{AppState, Tab};
use crate::storage::KeyValueStore;
use crate::tools::ToolFeature;
use crate::user::User;
use crate::view::ViewModel;
use std::collections::hash_map::Entry;
use std::future::Future;
use tracing::{debug, info, warn};

const COMPRESS_FAILED: &str = "An error occurred during compression. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Login,
    Register,
}

impl AuthKind {
    fn success_message(&self) -> &'static str {
        match self {
            AuthKind::Login => "Successfully signed in!",
            AuthKind::Register => "Account created successfully!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressRoute {
    /// lopdf in the page
    Local,
    /// Single file on the API
    Server,
    /// Many files on the API
    Bulk,
}

/// Snapshot of everything a compression run needs, detached from `App`
#[derive(Debug, Clone)]
pub struct CompressJob {
    pub route: CompressRoute,
    pub files: Vec<IncomingFile>,
    pub settings: CompressionSettings,
    pub started_at_ms: f64,
    /// `AppState::generation` when the job began
    pub generation: u64,
}

impl CompressJob {
    pub fn original_size(&self) -> u64 {
        self.files.iter().map(|f| f.size()).sum()
    }

    /// Run the job; `progress` receives percentages as work advances
    ///
    /// The local route awaits `pause()` between batches so a single-threaded
    /// host gets control back. Pass `|| std::future::ready(())` where there
    /// is nothing to yield to.
    pub async fn run<R, P, F>(
        &self,
        service: &R,
        mut progress: impl FnMut(u8),
        mut pause: P,
    ) -> Result<Vec<u8>, CompressError>
    where
        R: RemoteService + ?Sized,
        P: FnMut() -> F,
        F: Future<Output = ()>,
    {
        progress(40);
        match self.route {
            CompressRoute::Local => {
                let file = self.first()?;
                pause().await;
                let mut pass = CompressionPass::start(&file.bytes, self.settings.level)?;
                progress(PROGRESS_LOADED);
                while !pass.is_done() {
                    progress(pass.step());
                    pause().await;
                }
                let (bytes, _) = pass.finish()?;
                progress(PROGRESS_SAVED);
                Ok(bytes)
            }
            CompressRoute::Server => service.compress(self.first()?, self.settings).await,
            CompressRoute::Bulk => service.compress_bulk(&self.files, self.settings).await,
        }
    }

    fn first(&self) -> Result<&IncomingFile, CompressError> {
        self.files
            .first()
            .ok_or_else(|| CompressError::Parse("no input file".into()))
    }
}

#[derive(Debug, Clone)]
pub struct ToolJob {
    pub tool: ToolFeature,
    pub files: Vec<IncomingFile>,
    pub started_at_ms: f64,
    pub generation: u64,
}

impl ToolJob {
    pub async fn run<R: RemoteService + ?Sized>(&self, service: &R) -> Result<Vec<u8>, ApiError> {
        service.run_tool(self.tool, &self.files).await
    }
}

pub struct App<S> {
    config: ClientConfig,
    session: SessionStore<S>,
    user: Option<User>,
    state: AppState,
    notifications: NotificationCenter,
}

impl<S: KeyValueStore> App<S> {
    /// Build the app and restore any persisted session
    pub fn new(config: ClientConfig, store: S) -> Self {
        let session = SessionStore::new(store);
        let user = session.load().unwrap_or_else(|e| {
            warn!(error = %e, "could not read session, starting signed out");
            None
        });
        let notifications = NotificationCenter::new(config.toast);

        Self {
            config,
            session,
            user,
            state: AppState::new(),
            notifications,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_pro(&self) -> bool {
        crate::plan::is_pro(self.user.as_ref())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    /// Hand the persisted token (if any) to the service
    pub fn restore_token<R: RemoteService + ?Sized>(&self, service: &R) {
        match self.session.token() {
            Ok(token) => service.authorize(token),
            Err(e) => warn!(error = %e, "could not read stored token"),
        }
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>, now_ms: f64) -> u64 {
        self.notifications.prune(now_ms);
        self.notifications.push(level, message, now_ms)
    }

    pub fn view(&self, now_ms: f64) -> ViewModel {
        ViewModel::from_app(self, now_ms)
    }

    // ---------------------------------------------------------------
    // Authentication
    // ---------------------------------------------------------------

    pub async fn login<R: RemoteService + ?Sized>(
        &mut self,
        service: &R,
        email: &str,
        password: &str,
        now_ms: f64,
    ) -> Result<User, AppError> {
        let outcome = service.login(email, password).await;
        self.complete_auth(service, outcome, AuthKind::Login, now_ms)
    }

    pub async fn register<R: RemoteService + ?Sized>(
        &mut self,
        service: &R,
        email: &str,
        password: &str,
        name: &str,
        now_ms: f64,
    ) -> Result<User, AppError> {
        let outcome = service.register(email, password, name).await;
        self.complete_auth(service, outcome, AuthKind::Register, now_ms)
    }

    /// Apply the result of a login or registration call
    pub fn complete_auth<R: RemoteService + ?Sized>(
        &mut self,
        service: &R,
        outcome: Result<AuthSession, AuthError>,
        kind: AuthKind,
        now_ms: f64,
    ) -> Result<User, AppError> {
        let session = match outcome {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, ?kind, "authentication failed");
                self.notify(NotificationLevel::Error, e.to_string(), now_ms);
                return Err(e.into());
            }
        };

        self.session.save(&session.user)?;
        self.session.save_token(session.token.as_deref())?;
        service.authorize(session.token);

        info!(user_id = %session.user.id, plan = %session.user.plan, ?kind, "signed in");
        let user = session.user;
        self.user = Some(user.clone());
        self.enforce_plan_gates();
        self.notify(NotificationLevel::Success, kind.success_message(), now_ms);
        Ok(user)
    }

    /// Replace the cached user with the server's copy
    ///
    /// A 401 means the stored token is no longer accepted; the session is
    /// dropped without a toast.
    pub fn apply_profile(&mut self, outcome: Result<User, ApiError>) -> Result<(), AppError> {
        let user = match outcome {
            Ok(user) => user,
            Err(ApiError::Status { status: 401, .. }) => {
                info!("stored session rejected, signing out");
                self.session.clear()?;
                self.user = None;
                self.enforce_plan_gates();
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "profile refresh failed");
                return Err(e.into());
            }
        };

        self.session.save(&user)?;
        debug!(user_id = %user.id, plan = %user.plan, "profile refreshed");
        self.user = Some(user);
        self.enforce_plan_gates();
        Ok(())
    }

    /// Bring the cached plan in line with `GET /api/subscriptions`
    ///
    /// Silent: the plan changed elsewhere, not through this page. A missing
    /// subscription leaves the user as is.
    pub fn apply_subscription(
        &mut self,
        outcome: Result<Option<Subscription>, ApiError>,
    ) -> Result<Option<Plan>, AppError> {
        let subscription = outcome.map_err(|e| {
            warn!(error = %e, "subscription refresh failed");
            AppError::from(e)
        })?;
        let Some(subscription) = subscription else {
            return Ok(None);
        };
        let Some(user) = self.user.as_mut() else {
            return Err(AppError::NotSignedIn);
        };

        debug!(plan = %subscription.plan, status = %subscription.status, "subscription read");
        if user.plan != subscription.plan {
            info!(from = %user.plan, to = %subscription.plan, "plan changed on server");
            user.plan = subscription.plan.clone();
            self.session.save(user)?;
            self.enforce_plan_gates();
        }
        Ok(Some(subscription.plan))
    }

    pub fn logout<R: RemoteService + ?Sized>(&mut self, service: &R, now_ms: f64) -> Result<(), AppError> {
        self.session.clear()?;
        service.authorize(None);
        self.user = None;
        self.state.reset();
        info!("signed out");
        self.notify(NotificationLevel::Success, "Signed out successfully", now_ms);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Subscription
    // ---------------------------------------------------------------

    pub async fn upgrade<R: RemoteService + ?Sized>(
        &mut self,
        service: &R,
        plan: Plan,
        now_ms: f64,
    ) -> Result<Plan, AppError> {
        self.require_user(now_ms)?;
        let outcome = if plan.is_pro() {
            service.change_plan(&plan).await
        } else {
            service.cancel_subscription().await
        };
        self.complete_plan_change(outcome, now_ms)
    }

    pub async fn downgrade<R: RemoteService + ?Sized>(
        &mut self,
        service: &R,
        now_ms: f64,
    ) -> Result<Plan, AppError> {
        self.require_user(now_ms)?;
        let outcome = service.cancel_subscription().await;
        self.complete_plan_change(outcome, now_ms)
    }

    /// Check a plan change may start; the caller then runs the service call
    pub fn require_user(&mut self, now_ms: f64) -> Result<(), AppError> {
        if self.user.is_none() {
            self.notify(NotificationLevel::Error, AppError::NotSignedIn.to_string(), now_ms);
            return Err(AppError::NotSignedIn);
        }
        Ok(())
    }

    /// Mutate the stored user's plan in place after a subscription call
    pub fn complete_plan_change(
        &mut self,
        outcome: Result<Plan, ApiError>,
        now_ms: f64,
    ) -> Result<Plan, AppError> {
        let plan = match outcome {
            Ok(plan) => plan,
            Err(e) => {
                self.notify(NotificationLevel::Error, e.to_string(), now_ms);
                return Err(e.into());
            }
        };

        let Some(user) = self.user.as_mut() else {
            return Err(AppError::NotSignedIn);
        };
        user.plan = plan.clone();
        self.session.save(user)?;
        info!(plan = %plan, "plan changed");

        self.enforce_plan_gates();
        let message = if plan.is_pro() {
            format!("Upgraded to {} plan.", plan)
        } else {
            format!("Switched to {} plan.", plan)
        };
        self.notify(NotificationLevel::Success, message, now_ms);
        Ok(plan)
    }

    /// Turn off anything the current plan does not allow
    fn enforce_plan_gates(&mut self) {
        if self.is_pro() {
            return;
        }
        self.state.bulk_mode = false;
        self.state.server_processing = false;
        self.state.bulk_files.clear();
        if self.state.current_tab.requires_pro() {
            self.state.current_tab = Tab::Compress;
        }
    }

    // ---------------------------------------------------------------
    // Navigation and toggles
    // ---------------------------------------------------------------

    pub fn switch_tab(&mut self, tab: Tab, now_ms: f64) -> Result<(), AppError> {
        if tab.requires_pro() && !self.is_pro() {
            self.redirect_to_pricing(AppError::ProRequired.to_string(), now_ms);
            return Err(AppError::ProRequired);
        }
        debug!(tab = tab.key(), "switch tab");
        self.state.current_tab = tab;
        Ok(())
    }

    fn redirect_to_pricing(&mut self, message: String, now_ms: f64) {
        self.notify(NotificationLevel::Error, message, now_ms);
        self.state.current_tab = Tab::Pricing;
    }

    pub fn set_bulk_mode(&mut self, enabled: bool, now_ms: f64) -> Result<(), AppError> {
        if enabled && !self.is_pro() {
            self.state.bulk_mode = false;
            self.redirect_to_pricing("Bulk mode is a Pro feature.".into(), now_ms);
            return Err(AppError::ProRequired);
        }
        self.state.bulk_mode = enabled;
        Ok(())
    }

    pub fn set_server_processing(&mut self, enabled: bool, now_ms: f64) -> Result<(), AppError> {
        if enabled && !self.is_pro() {
            self.state.server_processing = false;
            self.redirect_to_pricing("Server processing is a Pro feature.".into(), now_ms);
            return Err(AppError::ProRequired);
        }
        self.state.server_processing = enabled;
        Ok(())
    }

    pub fn set_compression_level(&mut self, level: CompressionLevel) {
        self.state.settings.level = level;
    }

    pub fn set_image_quality(&mut self, quality: u8) {
        self.state.settings = self.state.settings.with_image_quality(quality);
    }

    // ---------------------------------------------------------------
    // File intake
    // ---------------------------------------------------------------

    fn single_ceiling(&self) -> u64 {
        self.config.limits.single_ceiling(self.is_pro())
    }

    /// Check metadata before the browser reads the file's bytes
    pub fn validate_file(&mut self, meta: &FileMeta, now_ms: f64) -> Result<(), AppError> {
        let ceiling = if self.state.bulk_mode {
            self.config.limits.bulk_file_bytes
        } else {
            self.single_ceiling()
        };
        intake::validate(meta, ceiling).map_err(|e| self.reject(e, now_ms))
    }

    fn reject(&mut self, error: IntakeError, now_ms: f64) -> AppError {
        warn!(error = %error, "file rejected");
        match error {
            IntakeError::BulkRequiresPro => self.redirect_to_pricing(error.to_string(), now_ms),
            _ => {
                self.notify(NotificationLevel::Error, error.to_string(), now_ms);
            }
        }
        error.into()
    }

    pub fn select_file(&mut self, file: IncomingFile, now_ms: f64) -> Result<(), AppError> {
        intake::validate(&file.meta, self.single_ceiling()).map_err(|e| self.reject(e, now_ms))?;

        debug!(name = %file.meta.name, size = file.meta.size, "file selected");
        self.state.selected_file = Some(file);
        self.state.results.clear();
        self.state.progress = None;
        Ok(())
    }

    /// Entry point for a picker or drop with any number of files
    pub fn select_files(&mut self, files: Vec<IncomingFile>, now_ms: f64) -> Result<BulkIntake, AppError> {
        if files.len() > 1 && !self.is_pro() {
            return Err(self.reject(IntakeError::BulkRequiresPro, now_ms));
        }

        if self.state.bulk_mode || files.len() > 1 {
            let outcome = self.add_bulk_files(files, now_ms)?;
            if outcome.added > 0 {
                self.state.bulk_mode = true;
            }
            return Ok(outcome);
        }

        match files.into_iter().next() {
            Some(file) => {
                self.select_file(file, now_ms)?;
                Ok(BulkIntake {
                    added: 1,
                    ..BulkIntake::default()
                })
            }
            None => Ok(BulkIntake::default()),
        }
    }

    pub fn add_bulk_files(&mut self, files: Vec<IncomingFile>, now_ms: f64) -> Result<BulkIntake, AppError> {
        if !self.is_pro() {
            return Err(self.reject(IntakeError::BulkRequiresPro, now_ms));
        }

        let limits = self.config.limits;
        let outcome = intake::append_bulk(
            &mut self.state.bulk_files,
            files,
            limits.bulk_file_bytes,
            limits.bulk_max_files,
        )
        .map_err(|e| self.reject(e, now_ms))?;

        if let Some((name, error)) = outcome.rejected.first() {
            let message = format!("{}: {}", name, error);
            self.notify(NotificationLevel::Error, message, now_ms);
        }
        if outcome.duplicates > 0 {
            let message = format!("Skipped {} duplicate file(s).", outcome.duplicates);
            self.notify(NotificationLevel::Info, message, now_ms);
        }
        if outcome.added > 0 {
            self.state.results.clear();
            self.state.progress = None;
        }
        Ok(outcome)
    }

    pub fn remove_bulk_file(&mut self, index: usize) -> Option<IncomingFile> {
        if index < self.state.bulk_files.len() {
            Some(self.state.bulk_files.remove(index))
        } else {
            None
        }
    }

    pub fn clear_files(&mut self) {
        self.state.selected_file = None;
        self.state.bulk_files.clear();
    }

    /// "New file" button
    pub fn new_file(&mut self) {
        self.state.clear_work();
    }

    // ---------------------------------------------------------------
    // Compression
    // ---------------------------------------------------------------

    pub fn begin_compress(&mut self, now_ms: f64) -> Result<CompressJob, AppError> {
        if self.state.is_processing {
            return Err(AppError::Busy);
        }
        if !self.state.has_files() {
            return Err(AppError::NoFile);
        }

        let pro = self.is_pro();
        let route = if self.state.bulk_mode {
            if !pro {
                return Err(self.reject(IntakeError::BulkRequiresPro, now_ms));
            }
            CompressRoute::Bulk
        } else if self.state.server_processing && pro {
            CompressRoute::Server
        } else {
            CompressRoute::Local
        };

        let files = self.state.active_files().into_iter().cloned().collect();
        self.state.is_processing = true;
        self.state.progress = Some(20);
        self.state.started_at_ms = Some(now_ms);
        self.state.results.remove(&Tab::Compress);
        debug!(?route, "compression started");

        Ok(CompressJob {
            route,
            files,
            settings: self.state.settings,
            started_at_ms: now_ms,
            generation: self.state.generation,
        })
    }

    /// Move the bar for the job started in `generation`
    pub fn set_progress(&mut self, generation: u64, percent: u8) {
        if self.state.is_processing && generation == self.state.generation {
            self.state.progress = Some(percent.min(100));
        }
    }

    /// Outcomes of jobs started before a logout or "new file" are dropped
    fn check_current(&self, generation: u64) -> Result<(), AppError> {
        if generation != self.state.generation {
            debug!(
                job = generation,
                current = self.state.generation,
                "discarding outcome of abandoned job"
            );
            return Err(AppError::Superseded);
        }
        Ok(())
    }

    /// Record a finished run; the processing flag is cleared on every path
    /// except a superseded job, which leaves state untouched
    pub fn finish_compress(
        &mut self,
        job: &CompressJob,
        outcome: Result<Vec<u8>, CompressError>,
        now_ms: f64,
    ) -> Result<&CompressionResult, AppError> {
        self.check_current(job.generation)?;
        self.state.is_processing = false;
        self.state.started_at_ms = None;

        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, route = ?job.route, "compression failed");
                self.state.progress = None;
                let message = match &e {
                    CompressError::Server(_) => e.to_string(),
                    _ => COMPRESS_FAILED.to_string(),
                };
                self.notify(NotificationLevel::Error, message, now_ms);
                return Err(e.into());
            }
        };

        let elapsed = (now_ms - job.started_at_ms).max(0.0) as u64;
        let source = job.files.first().map(|f| f.name()).unwrap_or("document.pdf");
        let mut result = CompressionResult::new(source, job.original_size(), bytes, elapsed);
        let message = if job.route == CompressRoute::Bulk {
            result = result.with_download_name("compressed_files.zip", "application/zip");
            format!("Compressed {} files.", job.files.len())
        } else {
            "PDF compressed successfully!".to_string()
        };

        info!(
            route = ?job.route,
            original = result.original_size,
            compressed = result.compressed_size,
            elapsed_ms = elapsed,
            "compression finished"
        );
        self.state.progress = Some(100);
        self.notify(NotificationLevel::Success, message, now_ms);
        Ok(self.store_result(Tab::Compress, result))
    }

    fn store_result(&mut self, tab: Tab, result: CompressionResult) -> &CompressionResult {
        match self.state.results.entry(tab) {
            Entry::Occupied(mut slot) => {
                slot.insert(result);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(result),
        }
    }

    pub async fn compress<R: RemoteService + ?Sized>(
        &mut self,
        service: &R,
        mut clock: impl FnMut() -> f64,
    ) -> Result<&CompressionResult, AppError> {
        let job = self.begin_compress(clock())?;
        let mut last = None;
        let outcome = job
            .run(service, |p| last = Some(p), || std::future::ready(()))
            .await;
        if let Some(p) = last {
            self.set_progress(job.generation, p);
        }
        self.finish_compress(&job, outcome, clock())
    }

    // ---------------------------------------------------------------
    // Server tools
    // ---------------------------------------------------------------

    pub fn begin_tool(&mut self, tool: ToolFeature, now_ms: f64) -> Result<ToolJob, AppError> {
        if !self.is_pro() {
            self.redirect_to_pricing(AppError::ProRequired.to_string(), now_ms);
            return Err(AppError::ProRequired);
        }
        if self.state.is_processing {
            return Err(AppError::Busy);
        }
        if !self.state.has_files() {
            return Err(AppError::NoFile);
        }

        let files = self.state.active_files().into_iter().cloned().collect();
        self.state.is_processing = true;
        self.state.progress = Some(20);
        self.state.results.remove(&tool.tab());
        Ok(ToolJob {
            tool,
            files,
            started_at_ms: now_ms,
            generation: self.state.generation,
        })
    }

    pub fn finish_tool(
        &mut self,
        job: &ToolJob,
        outcome: Result<Vec<u8>, ApiError>,
        now_ms: f64,
    ) -> Result<&CompressionResult, AppError> {
        self.check_current(job.generation)?;
        self.state.is_processing = false;

        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(e) => {
                self.state.progress = None;
                self.notify(NotificationLevel::Error, e.to_string(), now_ms);
                return Err(e.into());
            }
        };

        let source = job.files.first().map(|f| f.name()).unwrap_or("document.pdf");
        let (name, mime) = job.tool.output_for(source);
        let original: u64 = job.files.iter().map(|f| f.size()).sum();
        let elapsed = (now_ms - job.started_at_ms).max(0.0) as u64;
        let result = CompressionResult::new(source, original, bytes, elapsed).with_download_name(name, mime);

        self.state.progress = Some(100);
        let message = format!(
            "Processing {} file(s) for {}.",
            job.files.len(),
            job.tool.display_name()
        );
        self.notify(NotificationLevel::Success, message, now_ms);

        Ok(self.store_result(job.tool.tab(), result))
    }

    pub async fn run_tool<R: RemoteService + ?Sized>(
        &mut self,
        service: &R,
        tool: ToolFeature,
        now_ms: f64,
    ) -> Result<&CompressionResult, AppError> {
        let job = self.begin_tool(tool, now_ms)?;
        let outcome = job.run(service).await;
        self.finish_tool(&job, outcome, now_ms)
    }

    pub fn download(&self, tab: Tab) -> Option<&CompressionResult> {
        self.state.result(tab)
    }
}
