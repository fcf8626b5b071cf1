use crate::config::Config;
use crate::error::{ConsoleError, ConsoleResult, ErrorClass};
use crate::export::{Delivery, Exporter, ReportKind};
use crate::forms::{self, FormFields};
use crate::gateway::{Gateway, RequestOptions, Transport};
use crate::import::{ImportMode, ImportPipeline, ImportState, Preview};
use crate::modal::{Modal, ModalHandle};
use crate::models::{EntityId, LoginResponse, Movie, User, UserSummary};
use crate::render::{modals, pages, text::escape};
use crate::router::NavOutcome;
use crate::sequence::Sequence;
use crate::session::SessionHolder;
use crate::settings::{ConsoleSettings, SettingsStore};
use crate::store::LocalStore;
use crate::surface::{Region, Surface};
use crate::tables::{DeleteOutcome, TableController};
use crate::toast::Toasts;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Pause between a successful bulk upload and closing its modal, so the
/// result toast is seen against the preview.
pub const IMPORT_CLOSE_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved,
    /// The form's modal had already been replaced or closed.
    Ignored,
}

/// Everything a running console owns. Created at startup, dropped at logout;
/// controllers reach shared state only through it.
pub struct Console {
    pub(crate) config: Config,
    pub(crate) session: Arc<SessionHolder>,
    pub(crate) gateway: Arc<Gateway>,
    pub(crate) surface: Arc<dyn Surface>,
    pub(crate) toasts: Arc<Toasts>,
    pub(crate) modal: Modal,
    pub(crate) movies: TableController<Movie>,
    pub(crate) users: TableController<User>,
    pub(crate) settings: SettingsStore,
    pub(crate) navigation: Sequence,
    import: tokio::sync::Mutex<ImportPipeline>,
    import_modal: Mutex<Option<ModalHandle>>,
    exporter: Exporter,
    current_page: Mutex<Option<String>>,
}

impl Console {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        store: Arc<dyn LocalStore>,
        surface: Arc<dyn Surface>,
    ) -> Self {
        let session = Arc::new(SessionHolder::new(
            store.clone(),
            surface.clone(),
            &config.login_url,
        ));
        let gateway = Arc::new(Gateway::new(
            &config.api_base_url,
            transport,
            session.clone(),
        ));
        let toasts = Arc::new(Toasts::new(surface.clone()));
        let settings = SettingsStore::new(store);

        Self {
            movies: TableController::new(
                gateway.clone(),
                surface.clone(),
                toasts.clone(),
                settings.clone(),
            ),
            users: TableController::new(
                gateway.clone(),
                surface.clone(),
                toasts.clone(),
                settings.clone(),
            ),
            exporter: Exporter::new(
                gateway.clone(),
                session.clone(),
                surface.clone(),
                toasts.clone(),
            ),
            modal: Modal::new(surface.clone()),
            import: tokio::sync::Mutex::new(ImportPipeline::new()),
            import_modal: Mutex::new(None),
            navigation: Sequence::new(),
            current_page: Mutex::new(None),
            config,
            session,
            gateway,
            surface,
            toasts,
            settings,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionHolder {
        &self.session
    }

    pub fn movies(&self) -> &TableController<Movie> {
        &self.movies
    }

    pub fn users(&self) -> &TableController<User> {
        &self.users
    }

    pub fn settings(&self) -> ConsoleSettings {
        self.settings.load()
    }

    pub fn current_page(&self) -> Option<String> {
        self.current_page.lock().ok().and_then(|p| p.clone())
    }

    pub(crate) fn set_current_page(&self, page_id: &str) {
        if let Ok(mut guard) = self.current_page.lock() {
            *guard = Some(page_id.to_string());
        }
    }

    pub async fn import_state(&self) -> ImportState {
        self.import.lock().await.state().clone()
    }

    /// Entry point once the page loads. Stops with `Unauthorized` (after the
    /// redirect) when no session exists.
    pub async fn start(&self) -> ConsoleResult<NavOutcome> {
        let session = self.session.require_authenticated()?;
        self.surface
            .set_region(Region::UserBadge, pages::user_badge(session.user.as_ref()));
        Ok(self.navigate("dashboard").await)
    }

    pub async fn login(&self, email: &str, password: &str) -> ConsoleResult<UserSummary> {
        let response: LoginResponse = self
            .gateway
            .request_data(
                "/admin/login",
                RequestOptions::post(json!({ "email": email, "password": password })),
            )
            .await
            .inspect_err(|e| self.report(&format!("Login failed: {}", e), e))?;

        if !response.user.is_admin {
            let err = ConsoleError::Forbidden("Admin access required".to_string());
            self.toasts.error(&err.to_string());
            return Err(err);
        }

        self.session.begin(&response.token, response.user.clone())?;
        self.surface
            .set_region(Region::UserBadge, pages::user_badge(Some(&response.user)));
        self.toasts.success(&format!("Welcome back, {}", response.user.name));
        Ok(response.user)
    }

    pub async fn logout(&self) {
        info!("Logging out");
        self.modal.close();
        self.import.lock().await.cancel();
        self.navigation.invalidate();
        self.movies.invalidate();
        self.users.invalidate();
        self.session.invalidate();
    }

    /// Inline row controls: `view`, `edit` and `delete` on `movies` or `users`.
    pub async fn dispatch_action(
        &self,
        resource: &str,
        action: &str,
        id: &str,
    ) -> ConsoleResult<()> {
        let id = EntityId::parse(id);
        match (resource, action) {
            ("movies", "view") => self.view_movie(&id).await.map(|_| ()),
            ("movies", "edit") => self.open_movie_form(Some(&id)).await.map(|_| ()),
            ("movies", "delete") => self.movies.delete(&id).await.map(|_| ()),
            ("users", "view") => self.view_user(&id).await.map(|_| ()),
            ("users", "edit") => self.open_user_form(&id).await.map(|_| ()),
            ("users", "delete") => self.users.delete(&id).await.map(|_| ()),
            _ => Err(ConsoleError::Validation(format!(
                "Unknown action '{}' on {}",
                action, resource
            ))),
        }
    }

    pub async fn delete_movie(&self, id: &EntityId) -> ConsoleResult<DeleteOutcome> {
        self.movies.delete(id).await
    }

    pub async fn delete_user(&self, id: &EntityId) -> ConsoleResult<DeleteOutcome> {
        self.users.delete(id).await
    }

    pub async fn search(&self, resource: &str, term: &str) -> ConsoleResult<()> {
        match resource {
            "movies" => self.movies.search(term).await.map(|_| ()),
            "users" => self.users.search(term).await.map(|_| ()),
            other => Err(ConsoleError::Validation(format!("No table named {}", other))),
        }
    }

    pub async fn go_to_page(&self, resource: &str, page: u32) -> ConsoleResult<()> {
        match resource {
            "movies" => {
                let search = self.movies.search_term();
                self.movies.load(page, &search).await.map(|_| ())
            }
            "users" => {
                let search = self.users.search_term();
                self.users.load(page, &search).await.map(|_| ())
            }
            other => Err(ConsoleError::Validation(format!("No table named {}", other))),
        }
    }

    /// Create form when `id` is `None`.
    pub async fn open_movie_form(&self, id: Option<&EntityId>) -> ConsoleResult<ModalHandle> {
        let markup = match id {
            Some(id) => {
                let movie = self
                    .movies
                    .fetch_one(id)
                    .await
                    .inspect_err(|e| self.report(&format!("Could not load movie: {}", e), e))?;
                modals::movie_form(Some(&movie))
            }
            None => modals::movie_form(None),
        };
        Ok(self.modal.show(markup))
    }

    pub async fn view_movie(&self, id: &EntityId) -> ConsoleResult<ModalHandle> {
        let movie = self
            .movies
            .fetch_one(id)
            .await
            .inspect_err(|e| self.report(&format!("Could not load movie: {}", e), e))?;
        Ok(self.modal.show(modals::movie_detail(&movie)))
    }

    pub async fn open_user_form(&self, id: &EntityId) -> ConsoleResult<ModalHandle> {
        let user = self
            .users
            .fetch_one(id)
            .await
            .inspect_err(|e| self.report(&format!("Could not load user: {}", e), e))?;
        Ok(self.modal.show(modals::user_form(&user)))
    }

    pub async fn view_user(&self, id: &EntityId) -> ConsoleResult<ModalHandle> {
        let user = self
            .users
            .fetch_one(id)
            .await
            .inspect_err(|e| self.report(&format!("Could not load user: {}", e), e))?;
        Ok(self.modal.show(modals::user_detail(&user)))
    }

    /// POST without an id, PUT with one. The table is re-fetched after every
    /// successful save.
    pub async fn submit_movie_form(
        &self,
        handle: ModalHandle,
        id: Option<&EntityId>,
        fields: &FormFields,
    ) -> ConsoleResult<SubmitOutcome> {
        if !self.modal.is_current(handle) {
            return Ok(SubmitOutcome::Ignored);
        }
        let payload = forms::movie_payload(fields)
            .inspect_err(|e| self.notify_error(e))?;
        let body = to_body(&payload)?;
        let (path, options, verb) = match id {
            Some(id) => (
                format!("/admin/movies/{}", urlencoding::encode(&id.to_string())),
                RequestOptions::put(body),
                "updated",
            ),
            None => ("/admin/movies".to_string(), RequestOptions::post(body), "created"),
        };

        self.gateway
            .request(&path, options)
            .await
            .inspect_err(|e| self.report(&format!("Failed to save movie: {}", e), e))?;
        info!("Movie {} {}", payload.title, verb);
        self.toasts.success(&format!("Movie {} successfully", verb));
        self.modal.close_if_current(handle);
        if let Err(e) = self.movies.reload().await {
            warn!("Reload after save failed: {}", e);
        }
        Ok(SubmitOutcome::Saved)
    }

    pub async fn submit_user_form(
        &self,
        handle: ModalHandle,
        id: &EntityId,
        fields: &FormFields,
    ) -> ConsoleResult<SubmitOutcome> {
        if !self.modal.is_current(handle) {
            return Ok(SubmitOutcome::Ignored);
        }
        let payload = forms::user_payload(fields)
            .inspect_err(|e| self.notify_error(e))?;
        let body = to_body(&payload)?;
        self.gateway
            .request(
                &format!("/admin/users/{}", urlencoding::encode(&id.to_string())),
                RequestOptions::put(body),
            )
            .await
            .inspect_err(|e| self.report(&format!("Failed to save user: {}", e), e))?;
        self.toasts.success("User updated successfully");
        self.modal.close_if_current(handle);
        if let Err(e) = self.users.reload().await {
            warn!("Reload after save failed: {}", e);
        }
        Ok(SubmitOutcome::Saved)
    }

    /// Every exit from a modal lands here. Any import in progress is dropped.
    pub async fn close_modal(&self) {
        self.modal.close();
        self.import.lock().await.cancel();
        if let Ok(mut guard) = self.import_modal.lock() {
            *guard = None;
        }
    }

    pub async fn open_bulk_upload(&self) -> ModalHandle {
        let mut pipeline = self.import.lock().await;
        pipeline.cancel();
        self.surface.set_region(Region::ImportPreview, String::new());
        let handle = self.modal.show(modals::upload_modal(pipeline.mode()));
        if let Ok(mut guard) = self.import_modal.lock() {
            *guard = Some(handle);
        }
        handle
    }

    pub async fn select_import_mode(&self, mode: ImportMode) {
        self.import.lock().await.select_mode(mode);
        self.surface.set_region(Region::ImportPreview, String::new());
    }

    pub async fn load_import_file(&self, file_name: &str, contents: &[u8]) -> ConsoleResult<Preview> {
        let result = self.import.lock().await.load_file(file_name, contents);
        self.show_preview(result.map(Some)).map(|p| p.unwrap_or_else(empty_preview))
    }

    /// `Ok(None)` when the text was cleared.
    pub async fn load_import_text(&self, text: &str) -> ConsoleResult<Option<Preview>> {
        let result = self.import.lock().await.load_manual(text);
        self.show_preview(result)
    }

    fn show_preview(
        &self,
        result: Result<Option<Preview>, crate::import::ImportError>,
    ) -> ConsoleResult<Option<Preview>> {
        match result {
            Ok(Some(preview)) => {
                self.surface
                    .set_region(Region::ImportPreview, modals::import_preview(&preview));
                Ok(Some(preview))
            }
            Ok(None) => {
                self.surface.set_region(Region::ImportPreview, String::new());
                Ok(None)
            }
            Err(err) => {
                self.surface.set_region(
                    Region::ImportPreview,
                    format!(r#"<p class="error">{}</p>"#, escape(&err.to_string())),
                );
                self.toasts.error(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Sends the whole accepted batch in one request. A failure keeps the
    /// batch so the upload can be retried as is.
    pub async fn submit_import(&self) -> ConsoleResult<usize> {
        let mut pipeline = self.import.lock().await;
        let movies = pipeline.begin_submit()?;
        let sent = movies.len();

        let result = self
            .gateway
            .request("/admin/movies/bulk", RequestOptions::post(json!({ "movies": movies })))
            .await;
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                pipeline.submit_failed();
                drop(pipeline);
                self.report(&format!("Upload failed: {}", err), &err);
                return Err(err);
            }
        };

        let added = added_count(&value).unwrap_or(sent);
        pipeline.complete(added);
        drop(pipeline);
        info!("Bulk upload added {} of {} movies", added, sent);
        self.toasts.success(&format!("Successfully added {} movies", added));

        tokio::time::sleep(IMPORT_CLOSE_DELAY).await;
        let handle = self.import_modal.lock().ok().and_then(|mut g| g.take());
        if let Some(handle) = handle {
            self.modal.close_if_current(handle);
        }
        if let Err(e) = self.movies.reload().await {
            warn!("Reload after bulk upload failed: {}", e);
        }
        Ok(added)
    }

    pub async fn export(&self, report: ReportKind) -> ConsoleResult<Delivery> {
        self.exporter.export(report).await
    }

    pub async fn submit_settings(&self, fields: &FormFields) -> ConsoleResult<ConsoleSettings> {
        let settings = ConsoleSettings::from_form(fields)
            .inspect_err(|e| self.notify_error(e))?;
        self.settings
            .save(&settings)
            .inspect_err(|e| self.notify_error(e))?;
        info!("Settings saved ({} items per page)", settings.items_per_page);
        self.toasts.success("Settings saved");
        Ok(settings)
    }

    fn notify_error(&self, err: &ConsoleError) {
        self.toasts.error(&err.to_string());
    }

    /// Unauthorized needs no toast: the session has already redirected.
    fn report(&self, message: &str, err: &ConsoleError) {
        if err.class() != ErrorClass::Authentication {
            self.toasts.error(message);
        }
    }
}

fn to_body<T: serde::Serialize>(payload: &T) -> ConsoleResult<Value> {
    serde_json::to_value(payload).map_err(|e| ConsoleError::Validation(e.to_string()))
}

fn empty_preview() -> Preview {
    Preview {
        rows: Vec::new(),
        accepted: 0,
        discarded: 0,
    }
}

/// The bulk endpoint has answered with `{added}`, `{count}` or the created
/// rows, with or without the envelope.
fn added_count(value: &Value) -> Option<usize> {
    let data = value.get("data").unwrap_or(value);
    match data {
        Value::Array(rows) => Some(rows.len()),
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::Object(map) => ["added", "count", "inserted"]
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(|v| match v {
                Value::Array(rows) => Some(rows.len()),
                other => other.as_u64().map(|n| n as usize),
            })
            .or_else(|| {
                value
                    .get("added")
                    .or_else(|| value.get("count"))
                    .and_then(Value::as_u64)
                    .map(|n| n as usize)
            }),
        _ => None,
    }
}
