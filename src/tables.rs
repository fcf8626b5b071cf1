use crate::error::{ConsoleResult, ErrorClass};
use crate::gateway::{Gateway, RequestOptions};
use crate::models::{EntityId, ListPage, Movie, User};
use crate::render::{self, pages};
use crate::sequence::Sequence;
use crate::settings::SettingsStore;
use crate::surface::{Region, Surface};
use crate::toast::{Severity, Toasts};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// An entity the console lists in a table.
pub trait TableEntity: DeserializeOwned + Clone + Send + Sync + 'static {
    const RESOURCE: &'static str;
    const SINGULAR: &'static str;
    const COLUMNS: usize;

    fn id(&self) -> &EntityId;
    fn label(&self) -> &str;
    fn row(&self) -> String;

    /// UI-level restriction only; the backend enforces its own rules.
    fn deletable(&self) -> bool {
        true
    }
}

impl TableEntity for Movie {
    const RESOURCE: &'static str = "movies";
    const SINGULAR: &'static str = "movie";
    const COLUMNS: usize = pages::MOVIE_COLUMNS.len();

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn row(&self) -> String {
        render::tables::movie_row(self)
    }
}

impl TableEntity for User {
    const RESOURCE: &'static str = "users";
    const SINGULAR: &'static str = "user";
    const COLUMNS: usize = pages::USER_COLUMNS.len();

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn row(&self) -> String {
        render::tables::user_row(self)
    }

    fn deletable(&self) -> bool {
        !self.is_admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied(usize),
    /// A newer load was issued while this one was in flight.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Declined,
    Refused,
}

#[derive(Debug)]
struct TableState<E> {
    items: Vec<E>,
    page: u32,
    total_pages: u32,
    total: u64,
    search: String,
}

/// Server-side listing with a local cache that is only ever replaced by a
/// fresh fetch, never patched.
pub struct TableController<E> {
    gateway: Arc<Gateway>,
    surface: Arc<dyn Surface>,
    toasts: Arc<Toasts>,
    settings: SettingsStore,
    sequence: Sequence,
    state: Mutex<TableState<E>>,
}

impl<E: TableEntity> TableController<E> {
    pub fn new(
        gateway: Arc<Gateway>,
        surface: Arc<dyn Surface>,
        toasts: Arc<Toasts>,
        settings: SettingsStore,
    ) -> Self {
        Self {
            gateway,
            surface,
            toasts,
            settings,
            sequence: Sequence::new(),
            state: Mutex::new(TableState {
                items: Vec::new(),
                page: 1,
                total_pages: 1,
                total: 0,
                search: String::new(),
            }),
        }
    }

    pub fn list_path(page: u32, search: &str, limit: u32) -> String {
        let mut path = format!("/admin/{}?page={}&limit={}", E::RESOURCE, page.max(1), limit);
        let search = search.trim();
        if !search.is_empty() {
            path.push_str("&search=");
            path.push_str(&urlencoding::encode(search));
        }
        path
    }

    fn item_path(id: &EntityId) -> String {
        format!(
            "/admin/{}/{}",
            E::RESOURCE,
            urlencoding::encode(&id.to_string())
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TableState<E>> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub async fn load(&self, page: u32, search: &str) -> ConsoleResult<LoadOutcome> {
        let ticket = self.sequence.issue();
        let path = Self::list_path(page, search, self.settings.page_size());
        let result = self
            .gateway
            .request_data::<ListPage<E>>(&path, RequestOptions::get())
            .await;

        if !self.sequence.is_current(ticket) {
            debug!("Discarding stale {} load for page {}", E::RESOURCE, page);
            return Ok(LoadOutcome::Stale);
        }

        match result {
            Ok(list) => {
                let count = list.items.len();
                {
                    let mut state = self.lock();
                    state.items = list.items;
                    state.page = list.page;
                    state.total_pages = list.total_pages;
                    state.total = list.total;
                    state.search = search.trim().to_string();
                }
                info!("Loaded {} {} (page {})", count, E::RESOURCE, page);
                self.render();
                Ok(LoadOutcome::Applied(count))
            }
            Err(err) => {
                warn!("Failed to load {}: {}", E::RESOURCE, err);
                self.surface.set_region(
                    Region::TableBody(E::RESOURCE),
                    format!(
                        r#"<tr class="error-row"><td colspan="{}">{}</td></tr>"#,
                        E::COLUMNS,
                        render::text::escape(&err.to_string())
                    ),
                );
                if err.class() != ErrorClass::Authentication {
                    self.toasts.error(&format!("Failed to load {}: {}", E::RESOURCE, err));
                }
                Err(err)
            }
        }
    }

    /// Every keystroke goes back to the server; there is no local filtering.
    pub async fn search(&self, term: &str) -> ConsoleResult<LoadOutcome> {
        self.load(1, term).await
    }

    pub async fn reload(&self) -> ConsoleResult<LoadOutcome> {
        let (page, search) = {
            let state = self.lock();
            (state.page, state.search.clone())
        };
        self.load(page, &search).await
    }

    pub fn render(&self) {
        let state = self.lock();
        let rows: Vec<String> = state.items.iter().map(E::row).collect();
        let empty = format!("No {} found", E::RESOURCE);
        self.surface.set_region(
            Region::TableBody(E::RESOURCE),
            render::tables::table_body(&rows, E::COLUMNS, &empty),
        );
        self.surface.set_region(
            Region::Pagination(E::RESOURCE),
            render::tables::pagination(E::RESOURCE, state.page, state.total_pages, state.total),
        );
    }

    /// Outstanding loads will be dropped on completion.
    pub fn invalidate(&self) {
        self.sequence.invalidate();
    }

    pub fn search_term(&self) -> String {
        self.lock().search.clone()
    }

    pub fn current_page(&self) -> u32 {
        self.lock().page
    }

    pub fn items(&self) -> Vec<E> {
        self.lock().items.clone()
    }

    pub fn find(&self, id: &EntityId) -> Option<E> {
        self.lock().items.iter().find(|e| e.id() == id).cloned()
    }

    /// Cached copy if listed, otherwise fetched.
    pub async fn fetch_one(&self, id: &EntityId) -> ConsoleResult<E> {
        if let Some(entity) = self.find(id) {
            return Ok(entity);
        }
        self.gateway
            .request_data::<E>(&Self::item_path(id), RequestOptions::get())
            .await
    }

    /// Resolves the entity first (cache, then backend) so the deletable
    /// check holds for rows that are not on the current page.
    pub async fn delete(&self, id: &EntityId) -> ConsoleResult<DeleteOutcome> {
        let entity = match self.fetch_one(id).await {
            Ok(entity) => entity,
            Err(err) => {
                if err.class() != ErrorClass::Authentication {
                    self.toasts
                        .error(&format!("Could not load {} {}: {}", E::SINGULAR, id, err));
                }
                return Err(err);
            }
        };
        if !entity.deletable() {
            self.toasts.show(
                &format!("{} cannot be deleted", entity.label()),
                Severity::Warning,
            );
            return Ok(DeleteOutcome::Refused);
        }
        let label = format!("\"{}\"", entity.label());
        if !self
            .surface
            .confirm(&format!("Are you sure you want to delete {}?", label))
        {
            debug!("Delete of {} {} declined", E::SINGULAR, id);
            return Ok(DeleteOutcome::Declined);
        }

        if let Err(err) = self
            .gateway
            .request(&Self::item_path(id), RequestOptions::delete())
            .await
        {
            if err.class() != ErrorClass::Authentication {
                self.toasts
                    .error(&format!("Failed to delete {}: {}", E::SINGULAR, err));
            }
            return Err(err);
        }

        info!("Deleted {} {}", E::SINGULAR, id);
        self.toasts.success(&format!("Deleted {}", label));
        if let Err(e) = self.reload().await {
            warn!("Reload after delete failed: {}", e);
        }
        Ok(DeleteOutcome::Deleted)
    }
}
