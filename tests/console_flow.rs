use moviemind_console::config::Config;
use moviemind_console::console::SubmitOutcome;
use moviemind_console::export::{Delivery, ReportKind};
use moviemind_console::forms::FormFields;
use moviemind_console::gateway::{HttpRequest, HttpResponse, Transport};
use moviemind_console::import::{ImportError, ImportMode, ImportState};
use moviemind_console::models::EntityId;
use moviemind_console::router::{NavOutcome, Page};
use moviemind_console::store::{LocalStore, MemoryStore, SETTINGS_KEY, TOKEN_KEY};
use moviemind_console::surface::{HeadlessSurface, Region};
use moviemind_console::tables::{DeleteOutcome, LoadOutcome};
use moviemind_console::{Console, ConsoleError, ConsoleResult};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BASE: &str = "http://backend.test/api";
const TOKEN: &str = "secret-token";

#[derive(Clone)]
struct Reply {
    status: u16,
    body: String,
    headers: Vec<(String, String)>,
    delay: Duration,
}

impl Reply {
    fn json(value: Value) -> Self {
        Self::status(200, &value.to_string())
    }

    fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: Vec::new(),
            delay: Duration::ZERO,
        }
    }

    fn delayed(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Canned backend. The most recently registered rule whose method matches and
/// whose needle occurs in the request path wins.
struct FakeBackend {
    rules: Mutex<Vec<(Method, String, Reply)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            rules: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn on(&self, method: Method, needle: &str, reply: Reply) {
        self.rules
            .lock()
            .unwrap()
            .push((method, needle.to_string(), reply));
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// "METHOD /path?query" for every request so far.
    fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.url.trim_start_matches(BASE)))
            .collect()
    }

    fn count(&self, method: Method) -> usize {
        self.requests().iter().filter(|r| r.method == method).count()
    }

    fn last_body(&self, method: Method) -> Value {
        let body = self
            .requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method)
            .and_then(|r| r.body)
            .expect("no request body recorded");
        serde_json::from_str(&body).unwrap()
    }
}

#[async_trait::async_trait]
impl Transport for FakeBackend {
    async fn send(&self, request: HttpRequest) -> ConsoleResult<HttpResponse> {
        let path = request.url.trim_start_matches(BASE).to_string();
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(method, needle, _)| *method == request.method && path.contains(needle.as_str()))
            .map(|(_, _, reply)| reply.clone())
            .unwrap_or_else(|| Reply::status(404, r#"{"success":false,"error":"no route"}"#));
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        Ok(HttpResponse {
            status: reply.status,
            headers: reply.headers,
            body: reply.body.into_bytes(),
        })
    }
}

struct Harness {
    console: Console,
    backend: Arc<FakeBackend>,
    surface: Arc<HeadlessSurface>,
    store: Arc<MemoryStore>,
}

fn harness_with(store: MemoryStore) -> Harness {
    let backend = FakeBackend::new();
    let surface = Arc::new(HeadlessSurface::new());
    let store = Arc::new(store);
    let console = Console::new(
        Config::new(BASE),
        backend.clone(),
        store.clone(),
        surface.clone(),
    );
    Harness {
        console,
        backend,
        surface,
        store,
    }
}

fn logged_in() -> Harness {
    harness_with(MemoryStore::with_entry(TOKEN_KEY, TOKEN))
}

fn movie(id: i64, title: &str) -> Value {
    json!({ "id": id, "title": title, "year": 1999, "genres": "Drama", "rating": 7.5 })
}

fn ok(data: Value) -> Reply {
    Reply::json(json!({ "success": true, "data": data }))
}

fn table_body(h: &Harness, resource: &'static str) -> String {
    h.surface.region(Region::TableBody(resource)).unwrap_or_default()
}

#[tokio::test(start_paused = true)]
async fn empty_listing_renders_one_no_results_row() {
    let h = logged_in();
    h.backend.on(Method::GET, "/admin/movies", ok(json!([])));

    assert_eq!(h.console.navigate("movies").await, NavOutcome::Rendered(Page::Movies));

    let body = table_body(&h, "movies");
    assert_eq!(body.matches("<tr").count(), 1);
    assert!(body.contains("No movies found"));
}

#[tokio::test(start_paused = true)]
async fn imported_string_numbers_do_not_break_the_listing() {
    let h = logged_in();
    h.backend.on(
        Method::GET,
        "/admin/movies",
        ok(json!([
            { "id": 1, "title": "Alien", "year": 1979 },
            { "id": 2, "title": "Heat", "year": "1995", "rating": "8.3" },
            { "id": 3, "title": "Up", "year": "n/a" }
        ])),
    );

    assert_eq!(h.console.movies().load(1, "").await.unwrap(), LoadOutcome::Applied(3));

    let body = table_body(&h, "movies");
    assert!(!body.contains("error-row"));
    assert!(body.contains("<td>Heat</td><td>1995</td>"));
    assert!(body.contains("<td>8.3</td>"));
    assert!(body.contains("<td>Up</td><td>-</td>"));
}

#[tokio::test(start_paused = true)]
async fn listing_uses_page_size_from_settings() {
    let store = MemoryStore::with_entry(TOKEN_KEY, TOKEN);
    store.set(SETTINGS_KEY, r#"{"itemsPerPage": 5}"#).unwrap();
    let h = harness_with(store);
    h.backend.on(
        Method::GET,
        "/admin/movies",
        ok(json!({ "movies": [movie(1, "Alien")], "page": 2, "totalPages": 3, "total": 11 })),
    );

    h.console.go_to_page("movies", 2).await.unwrap();

    assert_eq!(h.backend.calls(), vec!["GET /admin/movies?page=2&limit=5"]);
    let pagination = h.surface.region(Region::Pagination("movies")).unwrap();
    assert!(pagination.contains("11"));
    assert_eq!(h.console.movies().current_page(), 2);
}

#[tokio::test(start_paused = true)]
async fn requests_carry_bearer_token_and_json_content_type() {
    let h = logged_in();
    h.backend.on(Method::GET, "/admin/stats", ok(json!({ "totalMovies": 3 })));

    h.console.navigate("dashboard").await;

    let request = &h.backend.requests()[0];
    let header = |name: &str| {
        request
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    };
    assert_eq!(header("authorization").as_deref(), Some("Bearer secret-token"));
    assert_eq!(header("content-type").as_deref(), Some("application/json"));
}

#[tokio::test(start_paused = true)]
async fn declined_delete_sends_nothing() {
    let h = logged_in();
    h.backend
        .on(Method::GET, "/admin/movies", ok(json!([movie(7, "Alien")])));
    h.console.navigate("movies").await;
    h.surface.answer_confirmations(false);
    let before = h.backend.requests().len();

    h.console
        .dispatch_action("movies", "delete", "7")
        .await
        .unwrap();

    assert_eq!(h.surface.confirmations().len(), 1);
    assert_eq!(h.backend.requests().len(), before);
    assert_eq!(h.backend.count(Method::DELETE), 0);
}

#[tokio::test(start_paused = true)]
async fn confirmed_delete_reloads_from_backend() {
    let h = logged_in();
    h.backend
        .on(Method::GET, "/admin/movies", ok(json!([movie(7, "Alien")])));
    h.backend
        .on(Method::DELETE, "/admin/movies/7", Reply::json(json!({ "success": true })));
    h.console.navigate("movies").await;
    // Backend state after the delete.
    h.backend.on(Method::GET, "/admin/movies", ok(json!([])));

    let outcome = h.console.delete_movie(&EntityId::Number(7)).await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(h.surface.confirmations()[0].contains("\"Alien\""));
    let calls = h.backend.calls();
    let n = calls.len();
    assert_eq!(calls[n - 2], "DELETE /admin/movies/7");
    assert!(calls[n - 1].starts_with("GET /admin/movies?page=1"));
    assert!(table_body(&h, "movies").contains("No movies found"));
    assert!(h.console.movies().items().is_empty());
}

#[tokio::test(start_paused = true)]
async fn admin_users_cannot_be_deleted() {
    let h = logged_in();
    h.backend.on(
        Method::GET,
        "/admin/users",
        ok(json!([
            { "id": 1, "name": "Root", "email": "root@example.com", "isAdmin": true },
            { "id": 2, "name": "Ann", "email": "ann@example.com", "isAdmin": false, "isActive": false }
        ])),
    );
    h.console.navigate("users").await;

    assert_eq!(table_body(&h, "users").matches(r#"data-action="delete""#).count(), 1);

    let outcome = h.console.delete_user(&EntityId::Number(1)).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Refused);
    assert!(h.surface.confirmations().is_empty());
    assert_eq!(h.backend.count(Method::DELETE), 0);
}

#[tokio::test(start_paused = true)]
async fn admin_off_the_current_page_is_still_refused() {
    let h = logged_in();
    h.backend.on(
        Method::GET,
        "/admin/users/1",
        ok(json!({ "id": 1, "name": "Root", "email": "root@example.com", "isAdmin": true })),
    );

    h.console.dispatch_action("users", "delete", "1").await.unwrap();

    assert_eq!(h.backend.calls(), vec!["GET /admin/users/1"]);
    assert!(h.surface.confirmations().is_empty());
    assert_eq!(h.backend.count(Method::DELETE), 0);
}

#[tokio::test(start_paused = true)]
async fn delete_stands_when_the_reload_fails() {
    let h = logged_in();
    h.backend
        .on(Method::GET, "/admin/movies", ok(json!([movie(7, "Alien")])));
    h.backend
        .on(Method::DELETE, "/admin/movies/7", Reply::json(json!({ "success": true })));
    h.console.navigate("movies").await;
    h.backend
        .on(Method::GET, "/admin/movies", Reply::status(503, "listing down"));

    let outcome = h.console.delete_movie(&EntityId::Number(7)).await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert_eq!(h.backend.count(Method::DELETE), 1);
    assert!(table_body(&h, "movies").contains("error-row"));
}

#[tokio::test(start_paused = true)]
async fn create_and_update_always_refetch_the_table() {
    let h = logged_in();
    h.backend
        .on(Method::GET, "/admin/movies", ok(json!([movie(7, "Alien")])));
    h.backend
        .on(Method::POST, "/admin/movies", ok(movie(8, "Heat")));
    h.backend
        .on(Method::PUT, "/admin/movies/7", ok(movie(7, "Aliens")));
    h.console.navigate("movies").await;

    let handle = h.console.open_movie_form(None).await.unwrap();
    let fields = FormFields::from_pairs([("title", "Heat"), ("year", "1995")]);
    let saved = h
        .console
        .submit_movie_form(handle, None, &fields)
        .await
        .unwrap();
    assert_eq!(saved, SubmitOutcome::Saved);
    assert_eq!(
        h.backend.last_body(Method::POST),
        json!({ "title": "Heat", "year": 1995, "genres": "" })
    );
    assert!(h.backend.calls().last().unwrap().starts_with("GET /admin/movies?"));
    assert!(h.surface.overlay().is_none());
    assert!(!h.surface.scroll_locked());

    // Listed movies are edited from the cache, no extra fetch.
    let id = EntityId::Number(7);
    let gets_before = h.backend.count(Method::GET);
    let handle = h.console.open_movie_form(Some(&id)).await.unwrap();
    assert_eq!(h.backend.count(Method::GET), gets_before);
    assert!(h.surface.overlay().unwrap().contains(r#"value="Alien""#));

    let fields = FormFields::from_pairs([("title", "Aliens"), ("year", "1986")]);
    h.console
        .submit_movie_form(handle, Some(&id), &fields)
        .await
        .unwrap();
    let calls = h.backend.calls();
    let n = calls.len();
    assert_eq!(calls[n - 2], "PUT /admin/movies/7");
    assert!(calls[n - 1].starts_with("GET /admin/movies?"));
}

#[tokio::test(start_paused = true)]
async fn invalid_form_keeps_modal_open_and_sends_nothing() {
    let h = logged_in();
    let handle = h.console.open_movie_form(None).await.unwrap();

    let err = h
        .console
        .submit_movie_form(handle, None, &FormFields::from_pairs([("title", "")]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Validation(_)));
    assert!(h.surface.overlay().is_some());
    assert!(h.backend.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn user_edit_never_sends_email() {
    let h = logged_in();
    h.backend.on(
        Method::GET,
        "/admin/users/2",
        ok(json!({ "id": 2, "name": "Ann", "email": "ann@example.com" })),
    );
    h.backend
        .on(Method::PUT, "/admin/users/2", Reply::json(json!({ "success": true })));
    h.backend.on(Method::GET, "/admin/users?", ok(json!([])));

    let id = EntityId::Number(2);
    let handle = h.console.open_user_form(&id).await.unwrap();
    let fields = FormFields::from_pairs([("name", "Ann B"), ("isActive", "on")]);
    h.console.submit_user_form(handle, &id, &fields).await.unwrap();

    assert_eq!(
        h.backend.last_body(Method::PUT),
        json!({ "name": "Ann B", "isAdmin": false, "isActive": true })
    );
    assert!(h.backend.calls().last().unwrap().starts_with("GET /admin/users?"));
}

#[tokio::test(start_paused = true)]
async fn replaced_modal_ignores_its_old_form() {
    let h = logged_in();
    let handle = h.console.open_movie_form(None).await.unwrap();
    h.console.open_bulk_upload().await;

    let outcome = h
        .console
        .submit_movie_form(handle, None, &FormFields::from_pairs([("title", "X")]))
        .await
        .unwrap();

    assert_eq!(outcome, SubmitOutcome::Ignored);
    assert!(h.backend.requests().is_empty());
    let overlay = h.surface.overlay().unwrap();
    assert!(overlay.contains("Bulk Upload Movies"));
    assert!(!overlay.contains("Add Movie"));
}

#[tokio::test(start_paused = true)]
async fn unauthorized_response_ends_session() {
    let h = logged_in();
    h.backend.on(Method::GET, "/admin/stats", Reply::status(401, ""));

    let outcome = h.console.navigate("dashboard").await;

    assert_eq!(outcome, NavOutcome::ErrorPanel);
    assert_eq!(h.store.get(TOKEN_KEY), None);
    assert_eq!(h.surface.redirects(), vec!["/login.html"]);
    assert!(h.console.session().current().is_none());
}

#[tokio::test(start_paused = true)]
async fn unauthorized_export_invalidates_without_fallback() {
    let h = logged_in();
    h.backend
        .on(Method::GET, "/admin/export/movies", Reply::status(401, "expired"));

    let err = h.console.export(ReportKind::Movies).await.unwrap_err();

    assert!(matches!(err, ConsoleError::Unauthorized));
    assert_eq!(h.store.get(TOKEN_KEY), None);
    assert_eq!(h.surface.redirects(), vec!["/login.html"]);
    assert!(h.surface.hidden_requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unauthorized_table_load_ends_session() {
    let h = logged_in();
    h.backend.on(Method::GET, "/admin/users", Reply::status(401, ""));

    let err = h.console.users().load(1, "").await.unwrap_err();

    assert!(matches!(err, ConsoleError::Unauthorized));
    assert_eq!(h.store.get(TOKEN_KEY), None);
    assert_eq!(h.surface.redirects().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn only_one_toast_is_ever_visible() {
    let h = logged_in();
    let bad = FormFields::from_pairs([("itemsPerPage", "500")]);
    let good = FormFields::from_pairs([("itemsPerPage", "50"), ("defaultExport", "users")]);

    assert!(h.console.submit_settings(&bad).await.is_err());
    h.console.submit_settings(&good).await.unwrap();

    let toasts = h.surface.toasts();
    assert_eq!(toasts.len(), 1);
    assert!(toasts[0].contains("Settings saved"));
    assert_eq!(h.console.settings().items_per_page, 50);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(h.surface.toasts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn bulk_upload_sends_only_titled_records() {
    let h = logged_in();
    h.backend.on(
        Method::POST,
        "/admin/movies/bulk",
        Reply::json(json!({ "success": true, "data": { "added": 2 } })),
    );
    h.backend.on(Method::GET, "/admin/movies", ok(json!([])));

    h.console.open_bulk_upload().await;
    h.console.select_import_mode(ImportMode::Manual).await;
    let preview = h
        .console
        .load_import_text(r#"[{"title":"A"},{"name":""},{"Name":"B"},{}]"#)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(preview.accepted, 2);
    assert_eq!(preview.discarded, 2);

    let added = h.console.submit_import().await.unwrap();

    assert_eq!(added, 2);
    assert_eq!(
        h.backend.last_body(Method::POST),
        json!({ "movies": [{ "title": "A" }, { "Name": "B" }] })
    );
    assert_eq!(h.console.import_state().await, ImportState::Completed { added: 2 });
    assert!(h.surface.overlay().is_none());
    assert!(h.backend.calls().last().unwrap().starts_with("GET /admin/movies?"));
}

#[tokio::test(start_paused = true)]
async fn manual_entry_skips_malformed_lines() {
    let h = logged_in();
    h.console.open_bulk_upload().await;
    h.console.select_import_mode(ImportMode::Manual).await;

    let preview = h
        .console
        .load_import_text("{\"title\":\"A\"}\nnotjson\n{\"title\":\"B\"}")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(preview.accepted, 2);
    assert_eq!(preview.discarded, 1);
    let panel = h.surface.region(Region::ImportPreview).unwrap();
    assert!(panel.contains("<strong>2</strong> movies ready"));
    assert!(panel.contains("1 invalid records skipped"));
}

#[tokio::test(start_paused = true)]
async fn csv_file_is_checked_before_parsing() {
    let h = logged_in();
    h.console.open_bulk_upload().await;

    let err = h
        .console
        .load_import_file("movies.json", b"title\nAlien\n")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConsoleError::Import(ImportError::WrongExtension { expected: ".csv" })
    ));

    let preview = h
        .console
        .load_import_file("movies.csv", b" Title , Year\n\"Alien\",1979\n,\n")
        .await
        .unwrap();
    assert_eq!(preview.accepted, 1);
    assert_eq!(preview.rows[0].title.as_deref(), Some("Alien"));
    assert_eq!(preview.rows[0].year.as_deref(), Some("1979"));
}

#[tokio::test(start_paused = true)]
async fn preview_titles_follow_the_same_key_rules_as_acceptance() {
    let h = logged_in();
    h.console.open_bulk_upload().await;
    h.console.select_import_mode(ImportMode::Manual).await;

    let preview = h
        .console
        .load_import_text(r#"[{"NAME":"Up"},{" Title ":"Heat"}]"#)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(preview.accepted, 2);
    let titles: Vec<_> = preview.rows.iter().map(|r| r.title.as_deref()).collect();
    assert_eq!(titles, vec![Some("Up"), Some("Heat")]);
    let panel = h.surface.region(Region::ImportPreview).unwrap();
    assert!(panel.contains("<td>Up</td>"));
    assert!(panel.contains(r#"data-action="submit-import""#));
}

#[tokio::test(start_paused = true)]
async fn failed_bulk_upload_keeps_batch_for_retry() {
    let h = logged_in();
    h.backend
        .on(Method::POST, "/admin/movies/bulk", Reply::status(500, "database down"));
    h.console.open_bulk_upload().await;
    h.console.select_import_mode(ImportMode::Json).await;
    h.console
        .load_import_file("batch.json", br#"[{"title":"A"},{"title":"B"}]"#)
        .await
        .unwrap();

    let err = h.console.submit_import().await.unwrap_err();
    assert!(matches!(err, ConsoleError::Http { status: 500, .. }));
    assert_eq!(h.console.import_state().await, ImportState::Previewed);
    assert!(h.surface.overlay().is_some());
    let first = h.backend.last_body(Method::POST);

    h.backend.on(
        Method::POST,
        "/admin/movies/bulk",
        Reply::json(json!({ "success": true, "count": 2 })),
    );
    h.backend.on(Method::GET, "/admin/movies", ok(json!([])));
    assert_eq!(h.console.submit_import().await.unwrap(), 2);
    assert_eq!(h.backend.last_body(Method::POST), first);
}

#[tokio::test(start_paused = true)]
async fn closing_modal_discards_import() {
    let h = logged_in();
    h.console.open_bulk_upload().await;
    h.console.select_import_mode(ImportMode::Manual).await;
    h.console
        .load_import_text(r#"{"title":"A"}"#)
        .await
        .unwrap();

    h.console.close_modal().await;

    assert_eq!(h.console.import_state().await, ImportState::Idle);
    let err = h.console.submit_import().await.unwrap_err();
    assert!(matches!(err, ConsoleError::Import(ImportError::NotReady)));
    assert_eq!(h.backend.count(Method::POST), 0);
}

#[tokio::test(start_paused = true)]
async fn clearing_manual_text_resets_pipeline() {
    let h = logged_in();
    h.console.select_import_mode(ImportMode::Manual).await;
    h.console
        .load_import_text(r#"{"title":"A"}"#)
        .await
        .unwrap();

    assert_eq!(h.console.load_import_text("   ").await.unwrap(), None);
    assert_eq!(h.console.import_state().await, ImportState::Idle);
    assert_eq!(h.surface.region(Region::ImportPreview).as_deref(), Some(""));
}

#[tokio::test(start_paused = true)]
async fn unknown_page_renders_placeholder() {
    let h = logged_in();

    let outcome = h.console.navigate("billing-reports").await;

    assert_eq!(outcome, NavOutcome::NotFound);
    assert_eq!(
        h.surface.region(Region::PageTitle).as_deref(),
        Some("Billing Reports")
    );
    assert!(h.surface.region(Region::Content).unwrap().contains("Page not found"));
    assert!(h.backend.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn content_errors_render_inline_panel() {
    let h = logged_in();
    h.backend.on(
        Method::GET,
        "/admin/quiz/analytics",
        Reply::json(json!({ "success": false, "error": "Analytics offline" })),
    );

    let outcome = h.console.navigate("quiz-analytics").await;

    assert_eq!(outcome, NavOutcome::ErrorPanel);
    let content = h.surface.region(Region::Content).unwrap();
    assert!(content.contains("error-panel"));
    assert!(content.contains("Analytics offline"));
    assert_eq!(h.store.get(TOKEN_KEY).as_deref(), Some(TOKEN));
}

#[tokio::test(start_paused = true)]
async fn analytics_page_renders_snapshot() {
    let h = logged_in();
    h.backend.on(
        Method::GET,
        "/admin/quiz/analytics",
        ok(json!({
            "totalQuizzes": 12,
            "uniqueUsers": 4,
            "avgPerUser": 3.0,
            "topGenres": [{ "genre": "Drama", "count": 8 }],
            "recentQuizzes": []
        })),
    );

    assert_eq!(
        h.console.navigate("quiz-analytics").await,
        NavOutcome::Rendered(Page::QuizAnalytics)
    );
    let content = h.surface.region(Region::Content).unwrap();
    assert!(content.contains("Drama"));
    assert!(content.contains("3.0"));
    assert_eq!(h.console.current_page().as_deref(), Some("quiz-analytics"));
}

#[tokio::test(start_paused = true)]
async fn slower_navigation_does_not_clobber_newer_page() {
    let h = logged_in();
    h.backend.on(
        Method::GET,
        "/admin/stats",
        ok(json!({ "totalMovies": 3 })).delayed(100),
    );

    let (first, second) = tokio::join!(
        h.console.navigate("dashboard"),
        h.console.navigate("export")
    );

    assert_eq!(first, NavOutcome::Stale);
    assert_eq!(second, NavOutcome::Rendered(Page::Export));
    let content = h.surface.region(Region::Content).unwrap();
    assert!(content.contains("exports"));
    assert!(!content.contains("stat-card"));
    assert_eq!(h.surface.region(Region::PageTitle).as_deref(), Some("Export"));
}

#[tokio::test(start_paused = true)]
async fn stale_search_results_are_discarded() {
    let h = logged_in();
    h.backend.on(
        Method::GET,
        "search=zz",
        ok(json!([movie(1, "Zodiac")])).delayed(100),
    );
    h.backend
        .on(Method::GET, "search=alien", ok(json!([movie(2, "Alien")])));

    let (first, second) = tokio::join!(
        h.console.movies().search("zz"),
        h.console.movies().search("alien")
    );

    assert_eq!(first.unwrap(), LoadOutcome::Stale);
    assert_eq!(second.unwrap(), LoadOutcome::Applied(1));
    let body = table_body(&h, "movies");
    assert!(body.contains("Alien"));
    assert!(!body.contains("Zodiac"));
    assert_eq!(h.console.movies().search_term(), "alien");
}

#[tokio::test(start_paused = true)]
async fn export_downloads_with_header_filename() {
    let h = logged_in();
    let csv = "id,title\n1,Alien\n";
    h.backend.on(
        Method::GET,
        "/admin/export/movies",
        Reply::status(200, csv)
            .header("Content-Type", "text/csv")
            .header("Content-Disposition", r#"attachment; filename="movies_2024.csv""#),
    );

    let delivery = h.console.export(ReportKind::Movies).await.unwrap();

    assert_eq!(
        delivery,
        Delivery::Downloaded {
            filename: "movies_2024.csv".to_string(),
            bytes: csv.len()
        }
    );
    let downloads = h.surface.downloads();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].1, csv.as_bytes());
    assert!(h.surface.hidden_requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn export_without_header_uses_default_name() {
    let h = logged_in();
    h.backend
        .on(Method::GET, "/admin/export/quizzes", Reply::status(200, "a,b\n"));

    match h.console.export(ReportKind::Quizzes).await.unwrap() {
        Delivery::Downloaded { filename, .. } => {
            assert!(filename.starts_with("quizzes_export_"));
            assert!(filename.ends_with(".csv"));
        }
        other => panic!("unexpected delivery {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn export_falls_back_to_hidden_request() {
    let h = logged_in();
    h.backend
        .on(Method::GET, "/admin/export/users", Reply::status(500, "boom"));

    let delivery = h.console.export(ReportKind::Users).await.unwrap();

    let expected = format!("{}/admin/export/users?token={}", BASE, TOKEN);
    assert_eq!(delivery, Delivery::Assumed { url: expected.clone() });
    assert_eq!(h.surface.hidden_requests(), vec![expected]);
    assert!(h.surface.downloads().is_empty());
    assert!(h.surface.toasts().is_empty());

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    let toasts = h.surface.toasts();
    assert_eq!(toasts.len(), 1);
    assert!(toasts[0].contains("Export started"));
}

#[tokio::test(start_paused = true)]
async fn forbidden_export_skips_fallback() {
    let h = logged_in();
    h.backend
        .on(Method::GET, "/admin/export/users", Reply::status(403, ""));

    let err = h.console.export(ReportKind::Users).await.unwrap_err();

    assert!(matches!(err, ConsoleError::Forbidden(_)));
    assert!(h.surface.hidden_requests().is_empty());
    assert!(h.surface.toasts()[0].contains("permission"));
    assert_eq!(h.store.get(TOKEN_KEY).as_deref(), Some(TOKEN));
}

#[tokio::test(start_paused = true)]
async fn start_without_token_redirects_before_any_request() {
    let h = harness_with(MemoryStore::new());

    let err = h.console.start().await.unwrap_err();

    assert!(matches!(err, ConsoleError::Unauthorized));
    assert_eq!(h.surface.redirects(), vec!["/login.html"]);
    assert!(h.backend.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn login_admits_only_admins() {
    let h = harness_with(MemoryStore::new());
    h.backend.on(
        Method::POST,
        "/admin/login",
        ok(json!({ "token": "t-1", "user": { "name": "Bob", "email": "bob@example.com", "isAdmin": false } })),
    );

    let err = h.console.login("bob@example.com", "pw").await.unwrap_err();
    assert!(matches!(err, ConsoleError::Forbidden(_)));
    assert_eq!(h.store.get(TOKEN_KEY), None);

    h.backend.on(
        Method::POST,
        "/admin/login",
        ok(json!({ "token": "t-2", "user": { "name": "Ada", "email": "ada@example.com", "isAdmin": true } })),
    );
    let user = h.console.login("ada@example.com", "pw").await.unwrap();
    assert_eq!(user.name, "Ada");
    assert_eq!(h.store.get(TOKEN_KEY).as_deref(), Some("t-2"));
    assert!(h.surface.region(Region::UserBadge).unwrap().contains("Ada"));
    assert_eq!(
        h.backend.last_body(Method::POST),
        json!({ "email": "ada@example.com", "password": "pw" })
    );
}

#[tokio::test(start_paused = true)]
async fn logout_clears_session_and_overlay() {
    let h = logged_in();
    h.console.open_bulk_upload().await;

    h.console.logout().await;

    assert_eq!(h.store.get(TOKEN_KEY), None);
    assert!(h.surface.overlay().is_none());
    assert_eq!(h.surface.redirects(), vec!["/login.html"]);
}

#[tokio::test(start_paused = true)]
async fn unknown_row_action_is_rejected() {
    let h = logged_in();
    let err = h
        .console
        .dispatch_action("movies", "archive", "1")
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Validation(_)));
    assert!(h.backend.requests().is_empty());
}
