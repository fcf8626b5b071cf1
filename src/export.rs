use crate::error::{ConsoleError, ConsoleResult};
use crate::gateway::Gateway;
use crate::session::SessionHolder;
use crate::surface::Surface;
use crate::toast::{Severity, Toasts};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Delay before the fallback channel reports its assumed success.
pub const FALLBACK_NOTICE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Movies,
    Users,
    Quizzes,
}

impl ReportKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "movies" => Some(ReportKind::Movies),
            "users" => Some(ReportKind::Users),
            "quizzes" | "quiz" => Some(ReportKind::Quizzes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Movies => "movies",
            ReportKind::Users => "users",
            ReportKind::Quizzes => "quizzes",
        }
    }

    pub fn path(&self) -> String {
        format!("/admin/export/{}", self.as_str())
    }
}

/// How an export left the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Primary channel: bytes received and handed to the surface.
    Downloaded { filename: String, bytes: usize },
    /// Fallback channel. The request went out through a hidden frame and its
    /// outcome cannot be observed; success is assumed, not known.
    Assumed { url: String },
}

pub struct Exporter {
    gateway: Arc<Gateway>,
    session: Arc<SessionHolder>,
    surface: Arc<dyn Surface>,
    toasts: Arc<Toasts>,
    notice_delay: Duration,
}

impl Exporter {
    pub fn new(
        gateway: Arc<Gateway>,
        session: Arc<SessionHolder>,
        surface: Arc<dyn Surface>,
        toasts: Arc<Toasts>,
    ) -> Self {
        Self {
            gateway,
            session,
            surface,
            toasts,
            notice_delay: FALLBACK_NOTICE_DELAY,
        }
    }

    pub async fn export(&self, report: ReportKind) -> ConsoleResult<Delivery> {
        let path = report.path();
        let primary = match self.gateway.fetch_file(&path).await {
            Ok(res) => {
                let filename = res
                    .header("Content-Disposition")
                    .and_then(content_disposition_filename)
                    .unwrap_or_else(|| default_filename(report, Local::now().date_naive()));
                self.surface
                    .save_download(&filename, &res.body)
                    .map(|_| (filename, res.body.len()))
                    .map_err(|e| ConsoleError::Storage(format!("{:#}", e)))
            }
            Err(err) => Err(err),
        };

        match primary {
            Ok((filename, bytes)) => {
                info!("Exported {} as {} ({} bytes)", report.as_str(), filename, bytes);
                self.toasts.success(&format!("Downloaded {}", filename));
                Ok(Delivery::Downloaded { filename, bytes })
            }
            Err(ConsoleError::Unauthorized) => Err(ConsoleError::Unauthorized),
            Err(ConsoleError::Forbidden(message)) => {
                warn!("Export of {} forbidden", report.as_str());
                self.toasts.error(&message);
                Err(ConsoleError::Forbidden(message))
            }
            Err(err) => {
                warn!(
                    "Primary export of {} failed ({}), using hidden request",
                    report.as_str(),
                    err
                );
                Ok(self.fallback(&path))
            }
        }
    }

    fn fallback(&self, path: &str) -> Delivery {
        let token = self.session.get_token().unwrap_or_default();
        let url = format!(
            "{}?token={}",
            self.gateway.url(path),
            urlencoding::encode(&token)
        );
        self.surface.submit_hidden_request(&url);

        let toasts = Arc::clone(&self.toasts);
        let delay = self.notice_delay;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    toasts.show("Export started, check your downloads", Severity::Info);
                });
            }
            Err(_) => {
                toasts.show("Export started, check your downloads", Severity::Info);
            }
        }
        Delivery::Assumed { url }
    }
}

/// Filename from a `Content-Disposition` header. `filename*` (RFC 5987) wins
/// over plain `filename`.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let params: Vec<(String, String)> = header
        .split(';')
        .skip(1)
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect();

    let extended = params
        .iter()
        .find(|(k, _)| k == "filename*")
        .and_then(|(_, v)| {
            let encoded = match v.split_once("''") {
                Some((_charset, rest)) => rest,
                None => v.as_str(),
            };
            urlencoding::decode(encoded.trim_matches('"'))
                .ok()
                .map(|s| s.into_owned())
        });

    extended
        .or_else(|| {
            params
                .iter()
                .find(|(k, _)| k == "filename")
                .map(|(_, v)| v.trim_matches('"').to_string())
        })
        .map(|name| sanitize_filename(&name))
        .filter(|name| !name.is_empty())
}

pub fn default_filename(report: ReportKind, date: NaiveDate) -> String {
    format!("{}_export_{}.csv", report.as_str(), date.format("%Y-%m-%d"))
}

/// Keeps only the final path component.
fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or("").trim().to_string()
}
