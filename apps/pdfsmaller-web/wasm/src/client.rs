//! JavaScript-facing client
//!
//! `PdfSmallerClient` owns the app, the remote backend and the renderer.
//! Page glue forwards DOM events to its methods and never keeps state of
//! its own. Async methods borrow the app only to start and to finish a
//! job, never across an await.

use crate::dom::Renderer;
use crate::storage::BrowserStore;
use crate::transport::{bytes_to_blob, FetchTransport};
use async_trait::async_trait;
use gloo_timers::future::TimeoutFuture;
use pdfsmaller_core::intake;
use pdfsmaller_core::{
    ApiClient, ApiError, App, AppError, AuthError, AuthKind, AuthSession, ClientConfig,
    CompressError, CompressionLevel, CompressionSettings, DemoService, FileMeta, IncomingFile,
    KeyValueStore, Plan, RemoteService, Tab, ToolFeature,
};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{File, FileList, HtmlAnchorElement, Url};

fn now_ms() -> f64 {
    js_sys::Date::now()
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Production API or the offline demo, picked once from config
pub enum Backend {
    Api(ApiClient<FetchTransport>),
    Demo(DemoService),
}

impl Backend {
    pub fn from_config(config: &ClientConfig) -> Self {
        if config.demo_mode {
            Backend::Demo(DemoService::new(now_ms() as u64))
        } else {
            Backend::Api(ApiClient::new(FetchTransport, &config.api_base_url))
        }
    }
}

#[async_trait(?Send)]
impl RemoteService for Backend {
    fn authorize(&self, token: Option<String>) {
        match self {
            Backend::Api(api) => api.authorize(token),
            Backend::Demo(demo) => demo.authorize(token),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        match self {
            Backend::Api(api) => api.login(email, password).await,
            Backend::Demo(demo) => demo.login(email, password).await,
        }
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, AuthError> {
        match self {
            Backend::Api(api) => api.register(email, password, name).await,
            Backend::Demo(demo) => demo.register(email, password, name).await,
        }
    }

    async fn compress(
        &self,
        file: &IncomingFile,
        settings: CompressionSettings,
    ) -> Result<Vec<u8>, CompressError> {
        match self {
            Backend::Api(api) => api.compress(file, settings).await,
            Backend::Demo(demo) => demo.compress(file, settings).await,
        }
    }

    async fn compress_bulk(
        &self,
        files: &[IncomingFile],
        settings: CompressionSettings,
    ) -> Result<Vec<u8>, CompressError> {
        match self {
            Backend::Api(api) => api.compress_bulk(files, settings).await,
            Backend::Demo(demo) => demo.compress_bulk(files, settings).await,
        }
    }

    async fn run_tool(
        &self,
        tool: ToolFeature,
        files: &[IncomingFile],
    ) -> Result<Vec<u8>, ApiError> {
        match self {
            Backend::Api(api) => api.run_tool(tool, files).await,
            Backend::Demo(demo) => demo.run_tool(tool, files).await,
        }
    }

    async fn change_plan(&self, plan: &Plan) -> Result<Plan, ApiError> {
        match self {
            Backend::Api(api) => api.change_plan(plan).await,
            Backend::Demo(demo) => demo.change_plan(plan).await,
        }
    }

    async fn cancel_subscription(&self) -> Result<Plan, ApiError> {
        match self {
            Backend::Api(api) => api.cancel_subscription().await,
            Backend::Demo(demo) => demo.cancel_subscription().await,
        }
    }
}

struct Shared {
    app: RefCell<App<BrowserStore>>,
    backend: Backend,
    renderer: Option<Renderer>,
    /// Fire time of the toast repaint already scheduled
    pending_repaint: Cell<Option<f64>>,
}

impl Shared {
    fn render(&self) {
        let Some(renderer) = &self.renderer else {
            return;
        };
        let view = self.app.borrow().view(now_ms());
        if let Err(e) = renderer.render(&view) {
            warn!(error = ?e, "render failed");
        }
    }
}

/// Repaint now and again whenever a toast is due to change phase
fn refresh(shared: &Rc<Shared>) {
    shared.render();
    let next = shared.app.borrow().notifications().next_change_ms(now_ms());
    if let Some(at) = next {
        schedule_repaint(shared, at);
    }
}

fn schedule_repaint(shared: &Rc<Shared>, at: f64) {
    if matches!(shared.pending_repaint.get(), Some(pending) if pending <= at) {
        return;
    }
    shared.pending_repaint.set(Some(at));

    let delay = (at - now_ms()).max(0.0).ceil() as u32;
    let shared = Rc::clone(shared);
    spawn_local(async move {
        TimeoutFuture::new(delay).await;
        if shared.pending_repaint.get() == Some(at) {
            shared.pending_repaint.set(None);
        }
        refresh(&shared);
    });
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IntakeSummary {
    added: usize,
    duplicates: usize,
    rejected: Vec<String>,
}

#[wasm_bindgen]
pub struct PdfSmallerClient {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl PdfSmallerClient {
    /// `config` is an optional object matching `ClientConfig`
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PdfSmallerClient, JsValue> {
        let config: ClientConfig = if config.is_undefined() || config.is_null() {
            ClientConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?
        };
        crate::logging::init(&config.log_level);

        let backend = Backend::from_config(&config);
        let store = BrowserStore::open();
        info!(
            demo = config.demo_mode,
            persistent = store.is_persistent(),
            "client starting"
        );

        let app = App::new(config, store);
        app.restore_token(&backend);

        let renderer = match Renderer::new() {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = ?e, "no document, rendering disabled");
                None
            }
        };

        let shared = Rc::new(Shared {
            app: RefCell::new(app),
            backend,
            renderer,
            pending_repaint: Cell::new(None),
        });
        refresh(&shared);
        Ok(PdfSmallerClient { shared })
    }

    pub fn render(&self) {
        refresh(&self.shared);
    }

    /// Current view-model as a plain object
    pub fn view(&self) -> Result<JsValue, JsValue> {
        let view = self.shared.app.borrow().view(now_ms());
        serde_wasm_bindgen::to_value(&view)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = isPro)]
    pub fn is_pro(&self) -> bool {
        self.shared.app.borrow().is_pro()
    }

    #[wasm_bindgen(js_name = currentUser)]
    pub fn current_user(&self) -> Result<JsValue, JsValue> {
        let app = self.shared.app.borrow();
        match app.user() {
            Some(user) => serde_wasm_bindgen::to_value(user).map_err(js_error),
            None => Ok(JsValue::NULL),
        }
    }

    // ---------------------------------------------------------------
    // Auth
    // ---------------------------------------------------------------

    pub async fn login(&self, email: String, password: String) -> Result<JsValue, JsValue> {
        let outcome = self.shared.backend.login(&email, &password).await;
        self.finish_auth(outcome, AuthKind::Login)
    }

    pub async fn register(
        &self,
        email: String,
        password: String,
        name: String,
    ) -> Result<JsValue, JsValue> {
        let outcome = self.shared.backend.register(&email, &password, &name).await;
        self.finish_auth(outcome, AuthKind::Register)
    }

    /// Re-read the signed-in user from the API; no-op in demo mode
    #[wasm_bindgen(js_name = refreshProfile)]
    pub async fn refresh_profile(&self) -> Result<(), JsValue> {
        let Backend::Api(api) = &self.shared.backend else {
            return Ok(());
        };
        if api.token().is_none() {
            return Ok(());
        }

        let outcome = api.profile().await;
        let result = self.shared.app.borrow_mut().apply_profile(outcome);
        refresh(&self.shared);
        result.map_err(js_error)
    }

    /// Re-read the plan from `GET /api/subscriptions`; no-op in demo mode
    /// or when signed out
    #[wasm_bindgen(js_name = refreshSubscription)]
    pub async fn refresh_subscription(&self) -> Result<JsValue, JsValue> {
        let Backend::Api(api) = &self.shared.backend else {
            return Ok(JsValue::NULL);
        };
        if api.token().is_none() || self.shared.app.borrow().user().is_none() {
            return Ok(JsValue::NULL);
        }

        let outcome = api.subscription().await;
        let result = self.shared.app.borrow_mut().apply_subscription(outcome);
        refresh(&self.shared);
        match result.map_err(js_error)? {
            Some(plan) => Ok(JsValue::from_str(plan.label())),
            None => Ok(JsValue::NULL),
        }
    }

    pub fn logout(&self) -> Result<(), JsValue> {
        let result = self
            .shared
            .app
            .borrow_mut()
            .logout(&self.shared.backend, now_ms());
        refresh(&self.shared);
        result.map_err(js_error)
    }

    /// Subscribe to a paid plan by its display label, e.g. "Pro Monthly"
    pub async fn upgrade(&self, plan_label: String) -> Result<(), JsValue> {
        let plan = Plan::from_label(&plan_label);
        if let Plan::Unrecognized(label) = &plan {
            return Err(JsValue::from_str(&format!("Unknown plan: {}", label)));
        }
        self.change_plan(Some(plan)).await
    }

    pub async fn downgrade(&self) -> Result<(), JsValue> {
        self.change_plan(None).await
    }

    // ---------------------------------------------------------------
    // Navigation and settings
    // ---------------------------------------------------------------

    /// Returns false when the tab is locked (the page moves to pricing)
    #[wasm_bindgen(js_name = switchTab)]
    pub fn switch_tab(&self, key: &str) -> Result<bool, JsValue> {
        let tab = Tab::from_key(key).ok_or_else(|| JsValue::from_str(&format!("Unknown tab: {}", key)))?;
        let switched = self.shared.app.borrow_mut().switch_tab(tab, now_ms()).is_ok();
        refresh(&self.shared);
        Ok(switched)
    }

    #[wasm_bindgen(js_name = setBulkMode)]
    pub fn set_bulk_mode(&self, enabled: bool) -> bool {
        let ok = self.shared.app.borrow_mut().set_bulk_mode(enabled, now_ms()).is_ok();
        refresh(&self.shared);
        ok
    }

    #[wasm_bindgen(js_name = setServerProcessing)]
    pub fn set_server_processing(&self, enabled: bool) -> bool {
        let ok = self
            .shared
            .app
            .borrow_mut()
            .set_server_processing(enabled, now_ms())
            .is_ok();
        refresh(&self.shared);
        ok
    }

    #[wasm_bindgen(js_name = setCompressionLevel)]
    pub fn set_compression_level(&self, level: &str) {
        self.shared
            .app
            .borrow_mut()
            .set_compression_level(CompressionLevel::from_label(level));
        refresh(&self.shared);
    }

    #[wasm_bindgen(js_name = setImageQuality)]
    pub fn set_image_quality(&self, quality: u8) {
        self.shared.app.borrow_mut().set_image_quality(quality);
        refresh(&self.shared);
    }

    // ---------------------------------------------------------------
    // Files
    // ---------------------------------------------------------------

    /// Take files from a picker or drop; only files that pass the
    /// metadata check are read into memory
    #[wasm_bindgen(js_name = selectFiles)]
    pub async fn select_files(&self, files: FileList) -> Result<JsValue, JsValue> {
        let handles: Vec<File> = (0..files.length()).filter_map(|i| files.get(i)).collect();
        let (ceiling, gated) = intake_plan(&self.shared.app.borrow(), handles.len());

        let mut incoming = Vec::with_capacity(handles.len());
        for file in &handles {
            let meta = FileMeta::new(&file.name(), &file.type_(), file.size() as u64);
            let bytes = if !gated && intake::validate(&meta, ceiling).is_ok() {
                read_file(file).await?
            } else {
                Vec::new()
            };
            incoming.push(IncomingFile { meta, bytes });
        }

        let result = self.shared.app.borrow_mut().select_files(incoming, now_ms());
        refresh(&self.shared);
        let outcome = result.map_err(js_error)?;
        debug!(added = outcome.added, duplicates = outcome.duplicates, "files taken");

        let summary = IntakeSummary {
            added: outcome.added,
            duplicates: outcome.duplicates,
            rejected: outcome
                .rejected
                .iter()
                .map(|(name, e)| format!("{}: {}", name, e))
                .collect(),
        };
        serde_wasm_bindgen::to_value(&summary).map_err(js_error)
    }

    #[wasm_bindgen(js_name = removeBulkFile)]
    pub fn remove_bulk_file(&self, index: usize) -> bool {
        let removed = self.shared.app.borrow_mut().remove_bulk_file(index).is_some();
        refresh(&self.shared);
        removed
    }

    #[wasm_bindgen(js_name = clearFiles)]
    pub fn clear_files(&self) {
        self.shared.app.borrow_mut().clear_files();
        refresh(&self.shared);
    }

    #[wasm_bindgen(js_name = newFile)]
    pub fn new_file(&self) {
        self.shared.app.borrow_mut().new_file();
        refresh(&self.shared);
    }

    // ---------------------------------------------------------------
    // Work
    // ---------------------------------------------------------------

    pub async fn compress(&self) -> Result<(), JsValue> {
        let job = self.shared.app.borrow_mut().begin_compress(now_ms());
        refresh(&self.shared);
        let job = job.map_err(js_error)?;

        let shared = Rc::clone(&self.shared);
        let generation = job.generation;
        let outcome = job
            .run(
                &self.shared.backend,
                move |percent| {
                    shared.app.borrow_mut().set_progress(generation, percent);
                    shared.render();
                },
                // a macrotask boundary, so the progress bar paints between batches
                || TimeoutFuture::new(0),
            )
            .await;

        let result = self
            .shared
            .app
            .borrow_mut()
            .finish_compress(&job, outcome, now_ms())
            .map(|_| ());
        refresh(&self.shared);
        result.map_err(js_error)
    }

    /// Run a server tool by key ("word", "excel", "ocr", "summarize", "translate")
    #[wasm_bindgen(js_name = runTool)]
    pub async fn run_tool(&self, key: String) -> Result<(), JsValue> {
        let tool = ToolFeature::from_key(&key)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown tool: {}", key)))?;

        let job = self.shared.app.borrow_mut().begin_tool(tool, now_ms());
        refresh(&self.shared);
        let job = job.map_err(js_error)?;

        let outcome = job.run(&self.shared.backend).await;
        let result = self
            .shared
            .app
            .borrow_mut()
            .finish_tool(&job, outcome, now_ms())
            .map(|_| ());
        refresh(&self.shared);
        result.map_err(js_error)
    }

    /// Save the current tab's result through a temporary object URL
    pub fn download(&self) -> Result<(), JsValue> {
        let app = self.shared.app.borrow();
        let tab = app.state().current_tab;
        let result = app
            .download(tab)
            .ok_or_else(|| js_error(AppError::NoFile))?;

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or("No document")?;
        let blob = bytes_to_blob(&result.payload, &result.mime_type)?;
        let url = Url::create_object_url_with_blob(&blob)?;

        let anchor: HtmlAnchorElement = document
            .create_element("a")?
            .dyn_into()
            .map_err(|_| JsValue::from_str("Failed to create link"))?;
        anchor.set_href(&url);
        anchor.set_download(&result.download_name);
        anchor.click();
        Url::revoke_object_url(&url)?;

        info!(name = %result.download_name, size = result.compressed_size, "download");
        Ok(())
    }
}

impl PdfSmallerClient {
    fn finish_auth(
        &self,
        outcome: Result<AuthSession, AuthError>,
        kind: AuthKind,
    ) -> Result<JsValue, JsValue> {
        let result = self
            .shared
            .app
            .borrow_mut()
            .complete_auth(&self.shared.backend, outcome, kind, now_ms());
        refresh(&self.shared);
        let user = result.map_err(js_error)?;
        serde_wasm_bindgen::to_value(&user).map_err(js_error)
    }

    async fn change_plan(&self, plan: Option<Plan>) -> Result<(), JsValue> {
        let ready = self.shared.app.borrow_mut().require_user(now_ms());
        if let Err(e) = ready {
            refresh(&self.shared);
            return Err(js_error(e));
        }

        let outcome = match plan.filter(Plan::is_pro) {
            Some(plan) => self.shared.backend.change_plan(&plan).await,
            None => self.shared.backend.cancel_subscription().await,
        };
        let result = self
            .shared
            .app
            .borrow_mut()
            .complete_plan_change(outcome, now_ms())
            .map(|_| ());
        refresh(&self.shared);
        result.map_err(js_error)
    }
}

/// Metadata ceiling for a pick of `count` files, and whether the app will
/// refuse the batch outright so no bytes should be read
fn intake_plan<S: KeyValueStore>(app: &App<S>, count: usize) -> (u64, bool) {
    let limits = app.config().limits;
    let ceiling = if count > 1 || app.state().bulk_mode {
        limits.bulk_file_bytes
    } else {
        limits.single_ceiling(app.is_pro())
    };
    (ceiling, count > 1 && !app.is_pro())
}

async fn read_file(file: &File) -> Result<Vec<u8>, JsValue> {
    let buffer = JsFuture::from(file.array_buffer()).await?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfsmaller_core::{MemoryStore, SessionStore, User};

    fn app_for(plan: Option<Plan>) -> App<Rc<MemoryStore>> {
        let store = Rc::new(MemoryStore::new());
        if let Some(plan) = plan {
            SessionStore::new(Rc::clone(&store))
                .save(&User::new(7, "Sam", "sam@example.com", plan))
                .unwrap();
        }
        App::new(ClientConfig::demo(), store)
    }

    #[test]
    fn test_free_multi_pick_is_not_read() {
        let app = app_for(None);
        let (_, gated) = intake_plan(&app, 3);
        assert!(gated);
        let (ceiling, gated) = intake_plan(&app, 1);
        assert!(!gated);
        assert_eq!(ceiling, app.config().limits.free_single_bytes);
    }

    #[test]
    fn test_pro_multi_pick_uses_bulk_ceiling() {
        let app = app_for(Some(Plan::Pro));
        let (ceiling, gated) = intake_plan(&app, 3);
        assert!(!gated);
        assert_eq!(ceiling, app.config().limits.bulk_file_bytes);
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn demo_client() -> PdfSmallerClient {
        let config = js_sys::Object::new();
        js_sys::Reflect::set(&config, &"demoMode".into(), &JsValue::TRUE).unwrap();
        PdfSmallerClient::new(config.into()).unwrap()
    }

    #[wasm_bindgen_test]
    async fn test_demo_login_and_logout() {
        let client = demo_client();
        let _ = client.logout();

        client
            .login("pro@example.com".into(), "password".into())
            .await
            .unwrap();
        assert!(client.is_pro());
        assert!(client.set_bulk_mode(true));

        client.logout().unwrap();
        assert!(!client.is_pro());
        assert!(client.current_user().unwrap().is_null());
    }

    #[wasm_bindgen_test]
    async fn test_bad_credentials_rejected() {
        let client = demo_client();
        let _ = client.logout();
        let err = client
            .login("demo@example.com".into(), "nope".into())
            .await
            .unwrap_err();
        assert_eq!(err.as_string().as_deref(), Some("Invalid credentials."));
    }

    #[wasm_bindgen_test]
    fn test_locked_tab_redirects() {
        let client = demo_client();
        let _ = client.logout();
        assert!(!client.switch_tab("ocr").unwrap());
        assert!(client.switch_tab("nope").is_err());
    }
}
