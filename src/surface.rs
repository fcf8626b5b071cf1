//! The UI surface the console draws on. In a browser this is the DOM; here it
//! is a trait so controllers stay independent of how markup reaches a screen.
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

/// Named, independently replaceable parts of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    PageTitle,
    Content,
    UserBadge,
    TableBody(&'static str),
    Pagination(&'static str),
    ImportPreview,
}

pub trait Surface: Send + Sync {
    fn set_region(&self, region: Region, html: String);
    fn show_overlay(&self, html: String);
    fn hide_overlay(&self);
    fn set_scroll_locked(&self, locked: bool);
    fn mount_toast(&self, id: u64, html: String);
    fn unmount_toast(&self, id: u64);
    /// Blocking yes/no prompt.
    fn confirm(&self, message: &str) -> bool;
    fn redirect(&self, url: &str);
    fn save_download(&self, filename: &str, bytes: &[u8]) -> Result<()>;
    /// Background GET through a hidden frame. Completion is never observable.
    fn submit_hidden_request(&self, url: &str);
}

#[derive(Debug, Default)]
struct HeadlessState {
    regions: HashMap<Region, String>,
    overlay: Option<String>,
    scroll_locked: bool,
    toasts: Vec<(u64, String)>,
    redirects: Vec<String>,
    confirmations: Vec<String>,
    downloads: Vec<(String, Vec<u8>)>,
    hidden_requests: Vec<String>,
}

/// In-memory surface used by the CLI driver and the tests.
#[derive(Debug)]
pub struct HeadlessSurface {
    state: Mutex<HeadlessState>,
    confirm_answer: Mutex<bool>,
    download_dir: Option<PathBuf>,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HeadlessState::default()),
            confirm_answer: Mutex::new(true),
            download_dir: None,
        }
    }

    /// Downloads are also written to `dir`.
    pub fn with_download_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: Some(dir.into()),
            ..Self::new()
        }
    }

    pub fn answer_confirmations(&self, answer: bool) {
        if let Ok(mut guard) = self.confirm_answer.lock() {
            *guard = answer;
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut HeadlessState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn region(&self, region: Region) -> Option<String> {
        self.with_state(|s| s.regions.get(&region).cloned())
    }

    pub fn overlay(&self) -> Option<String> {
        self.with_state(|s| s.overlay.clone())
    }

    pub fn scroll_locked(&self) -> bool {
        self.with_state(|s| s.scroll_locked)
    }

    pub fn toasts(&self) -> Vec<String> {
        self.with_state(|s| s.toasts.iter().map(|(_, html)| html.clone()).collect())
    }

    pub fn redirects(&self) -> Vec<String> {
        self.with_state(|s| s.redirects.clone())
    }

    pub fn confirmations(&self) -> Vec<String> {
        self.with_state(|s| s.confirmations.clone())
    }

    pub fn downloads(&self) -> Vec<(String, Vec<u8>)> {
        self.with_state(|s| s.downloads.clone())
    }

    pub fn hidden_requests(&self) -> Vec<String> {
        self.with_state(|s| s.hidden_requests.clone())
    }
}

impl Surface for HeadlessSurface {
    fn set_region(&self, region: Region, html: String) {
        self.with_state(|s| {
            s.regions.insert(region, html);
        });
    }

    fn show_overlay(&self, html: String) {
        self.with_state(|s| s.overlay = Some(html));
    }

    fn hide_overlay(&self) {
        self.with_state(|s| s.overlay = None);
    }

    fn set_scroll_locked(&self, locked: bool) {
        self.with_state(|s| s.scroll_locked = locked);
    }

    fn mount_toast(&self, id: u64, html: String) {
        self.with_state(|s| s.toasts.push((id, html)));
    }

    fn unmount_toast(&self, id: u64) {
        self.with_state(|s| s.toasts.retain(|(tid, _)| *tid != id));
    }

    fn confirm(&self, message: &str) -> bool {
        self.with_state(|s| s.confirmations.push(message.to_string()));
        self.confirm_answer.lock().map(|g| *g).unwrap_or(false)
    }

    fn redirect(&self, url: &str) {
        info!("Redirecting to {}", url);
        self.with_state(|s| s.redirects.push(url.to_string()));
    }

    fn save_download(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        if let Some(dir) = &self.download_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let path = dir.join(filename);
            fs::write(&path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Saved {} ({} bytes)", path.display(), bytes.len());
        }
        self.with_state(|s| s.downloads.push((filename.to_string(), bytes.to_vec())));
        Ok(())
    }

    fn submit_hidden_request(&self, url: &str) {
        debug!("Hidden request submitted");
        self.with_state(|s| s.hidden_requests.push(url.to_string()));
    }
}
