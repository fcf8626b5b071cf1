use crate::console::Console;
use crate::error::ConsoleResult;
use crate::gateway::RequestOptions;
use crate::models::{DashboardStats, QuizAnalytics};
use crate::render::{pages, text::title_case};
use crate::surface::Region;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Dashboard,
    Movies,
    Users,
    QuizAnalytics,
    Export,
    Settings,
}

static PAGES: Lazy<HashMap<&'static str, Page>> = Lazy::new(|| {
    HashMap::from([
        ("dashboard", Page::Dashboard),
        ("movies", Page::Movies),
        ("users", Page::Users),
        ("quiz-analytics", Page::QuizAnalytics),
        ("export", Page::Export),
        ("settings", Page::Settings),
    ])
});

impl Page {
    pub fn from_id(page_id: &str) -> Option<Self> {
        PAGES.get(page_id.trim()).copied()
    }

    pub fn id(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Movies => "movies",
            Page::Users => "users",
            Page::QuizAnalytics => "quiz-analytics",
            Page::Export => "export",
            Page::Settings => "settings",
        }
    }
}

/// Heading shown for a page id, e.g. "quiz-analytics" -> "Quiz Analytics".
pub fn page_title(page_id: &str) -> String {
    title_case(page_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Rendered(Page),
    NotFound,
    /// Content production failed; an error panel was rendered instead.
    ErrorPanel,
    /// A later navigation started before this one finished.
    Stale,
}

impl Console {
    /// Never fails: unknown ids get a placeholder and content errors become
    /// an inline panel.
    pub async fn navigate(&self, page_id: &str) -> NavOutcome {
        let ticket = self.navigation.issue();
        self.movies.invalidate();
        self.users.invalidate();
        self.set_current_page(page_id);
        self.surface
            .set_region(Region::PageTitle, page_title(page_id));

        let Some(page) = Page::from_id(page_id) else {
            warn!("Unknown page '{}'", page_id);
            self.surface
                .set_region(Region::Content, pages::not_found(page_id));
            return NavOutcome::NotFound;
        };

        let content = self.page_content(page).await;
        if !self.navigation.is_current(ticket) {
            debug!("Dropping stale render of {}", page.id());
            return NavOutcome::Stale;
        }

        match content {
            Ok(html) => {
                self.surface.set_region(Region::Content, html);
                info!("Rendered {}", page.id());
                self.after_render(page).await;
                NavOutcome::Rendered(page)
            }
            Err(err) => {
                warn!("Failed to render {}: {}", page.id(), err);
                self.surface
                    .set_region(Region::Content, pages::error_panel(&err));
                NavOutcome::ErrorPanel
            }
        }
    }

    async fn page_content(&self, page: Page) -> ConsoleResult<String> {
        match page {
            Page::Dashboard => {
                let stats: DashboardStats = self
                    .gateway
                    .request_data("/admin/stats", RequestOptions::get())
                    .await?;
                Ok(pages::dashboard(&stats))
            }
            Page::Movies => Ok(pages::movies_page()),
            Page::Users => Ok(pages::users_page()),
            Page::QuizAnalytics => {
                let snapshot: QuizAnalytics = self
                    .gateway
                    .request_data("/admin/quiz/analytics", RequestOptions::get())
                    .await?;
                Ok(pages::quiz_analytics(&snapshot))
            }
            Page::Export => Ok(pages::export_page()),
            Page::Settings => Ok(pages::settings_page(&self.settings.load())),
        }
    }

    /// Table loads report their own failures.
    async fn after_render(&self, page: Page) {
        let loaded: ConsoleResult<_> = match page {
            Page::Movies => self.movies.load(1, "").await.map(|_| ()),
            Page::Users => self.users.load(1, "").await.map(|_| ()),
            _ => Ok(()),
        };
        if let Err(err) = loaded {
            debug!("Initial load for {} failed: {}", page.id(), err);
        }
    }
}
