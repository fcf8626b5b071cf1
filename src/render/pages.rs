use super::text::{escape, or_dash, short_date};
use crate::error::ConsoleError;
use crate::models::{DashboardStats, QuizAnalytics, UserSummary};
use crate::settings::ConsoleSettings;

fn stat_card(label: &str, value: impl std::fmt::Display) -> String {
    format!(
        r#"<div class="stat-card"><span class="stat-value">{}</span><span class="stat-label">{}</span></div>"#,
        value,
        escape(label)
    )
}

pub fn dashboard(stats: &DashboardStats) -> String {
    format!(
        concat!(
            r#"<section class="dashboard"><div class="stats-grid">{}{}{}{}</div>"#,
            r#"<div class="quick-actions"><button data-page="movies">Manage Movies</button>"#,
            r#"<button data-page="users">Manage Users</button>"#,
            r#"<button data-page="quiz-analytics">Quiz Analytics</button></div></section>"#
        ),
        stat_card("Movies", stats.total_movies),
        stat_card("Users", stats.total_users),
        stat_card("Active Users", stats.active_users),
        stat_card("Quizzes Taken", stats.total_quizzes),
    )
}

fn table_page(resource: &str, columns: &[&str], toolbar: &str) -> String {
    let head: String = columns
        .iter()
        .map(|c| format!("<th>{}</th>", escape(c)))
        .collect();
    format!(
        concat!(
            r#"<section class="table-page"><div class="toolbar">"#,
            r#"<input type="search" id="{res}-search" data-resource="{res}" placeholder="Search {res}...">{toolbar}</div>"#,
            r#"<table class="data-table"><thead><tr>{head}</tr></thead>"#,
            r#"<tbody id="{res}-table-body"><tr><td colspan="{cols}">Loading...</td></tr></tbody></table>"#,
            r#"<div id="{res}-pagination"></div></section>"#
        ),
        res = resource,
        toolbar = toolbar,
        head = head,
        cols = columns.len(),
    )
}

pub fn movies_page() -> String {
    table_page(
        "movies",
        &MOVIE_COLUMNS,
        concat!(
            r#"<button data-action="add-movie" class="btn-primary">Add Movie</button>"#,
            r#"<button data-action="bulk-upload">Bulk Upload</button>"#,
            r#"<button data-action="export" data-report="movies">Export CSV</button>"#
        ),
    )
}

pub fn users_page() -> String {
    table_page(
        "users",
        &USER_COLUMNS,
        r#"<button data-action="export" data-report="users">Export CSV</button>"#,
    )
}

pub const MOVIE_COLUMNS: [&str; 8] = [
    "ID", "Title", "Year", "Genres", "Rating", "Runtime", "Director", "Actions",
];
pub const USER_COLUMNS: [&str; 7] = ["ID", "Name", "Email", "Role", "Status", "Joined", "Actions"];

pub fn quiz_analytics(snapshot: &QuizAnalytics) -> String {
    let max = snapshot
        .top_genres
        .iter()
        .map(|g| g.count)
        .max()
        .unwrap_or(0)
        .max(1);
    let bars: String = snapshot
        .top_genres
        .iter()
        .map(|g| {
            format!(
                r#"<div class="bar-row"><span class="bar-label">{}</span><div class="bar" style="width: {}%"></div><span class="bar-count">{}</span></div>"#,
                escape(&g.genre),
                g.count * 100 / max,
                g.count
            )
        })
        .collect();
    let genres_block = if bars.is_empty() {
        r#"<p class="muted">No genre data yet</p>"#.to_string()
    } else {
        bars
    };

    let recent: String = snapshot
        .recent_quizzes
        .iter()
        .map(|q| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                or_dash(q.user_name.as_deref()),
                or_dash(Some(q.genres.join(", "))),
                or_dash(q.recommendations),
                or_dash(q.created_at.as_deref().map(short_date)),
            )
        })
        .collect();
    let recent_body = if recent.is_empty() {
        r#"<tr class="empty-row"><td colspan="4">No quizzes yet</td></tr>"#.to_string()
    } else {
        recent
    };

    format!(
        concat!(
            r#"<section class="analytics"><div class="stats-grid">{}{}{}</div>"#,
            r#"<h3>Top Genres</h3><div class="bar-chart">{}</div>"#,
            "<h3>Recent Quizzes</h3><table><thead><tr><th>User</th><th>Genres</th>",
            "<th>Recommendations</th><th>Date</th></tr></thead><tbody>{}</tbody></table>",
            r#"<button data-action="export" data-report="quizzes">Export CSV</button></section>"#
        ),
        stat_card("Total Quizzes", snapshot.total_quizzes),
        stat_card("Unique Users", snapshot.unique_users),
        stat_card("Avg per User", format!("{:.1}", snapshot.avg_per_user)),
        genres_block,
        recent_body,
    )
}

pub fn export_page() -> String {
    let cards: String = [
        ("movies", "Movies", "Full movie catalogue"),
        ("users", "Users", "Accounts with role and status"),
        ("quizzes", "Quiz Results", "Every completed quiz"),
    ]
    .iter()
    .map(|(report, label, hint)| {
        format!(
            r#"<div class="export-card"><h3>{}</h3><p>{}</p><button data-action="export" data-report="{}">Download CSV</button></div>"#,
            label, hint, report
        )
    })
    .collect();
    format!(r#"<section class="exports">{}</section>"#, cards)
}

pub fn settings_page(settings: &ConsoleSettings) -> String {
    let export_option = |value: &str| {
        format!(
            r#"<option value="{v}"{s}>{v}</option>"#,
            v = value,
            s = if settings.default_export == value { " selected" } else { "" }
        )
    };
    format!(
        concat!(
            r#"<form id="settings-form" class="settings">"#,
            r#"<label for="siteName">Site name</label><input id="siteName" name="siteName" type="text" value="{name}">"#,
            r#"<label for="itemsPerPage">Items per page</label><input id="itemsPerPage" name="itemsPerPage" type="number" min="1" max="100" value="{per_page}">"#,
            r#"<label for="defaultExport">Default export</label><select id="defaultExport" name="defaultExport">{o1}{o2}{o3}</select>"#,
            r#"<label class="checkbox"><input name="notificationsEnabled" type="checkbox"{notify}> Notifications</label>"#,
            r#"<button type="submit" class="btn-primary">Save Settings</button></form>"#
        ),
        name = escape(&settings.site_name),
        per_page = settings.items_per_page,
        o1 = export_option("movies"),
        o2 = export_option("users"),
        o3 = export_option("quizzes"),
        notify = if settings.notifications_enabled { " checked" } else { "" },
    )
}

pub fn user_badge(user: Option<&UserSummary>) -> String {
    match user {
        Some(u) => format!(
            r#"<span class="user-badge">{}</span><button data-action="logout">Logout</button>"#,
            escape(&u.name)
        ),
        None => r#"<button data-action="logout">Logout</button>"#.to_string(),
    }
}

pub fn not_found(page_id: &str) -> String {
    format!(
        r#"<section class="placeholder"><h2>Page not found</h2><p>No page named "{}".</p></section>"#,
        escape(page_id)
    )
}

pub fn error_panel(err: &ConsoleError) -> String {
    format!(
        r#"<div class="error-panel"><h3>Something went wrong</h3><p>{}</p><button data-action="retry">Retry</button></div>"#,
        escape(&err.to_string())
    )
}
