use crate::render;
use crate::surface::Surface;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

pub const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// Single-slot toast presenter: showing a toast replaces the visible one.
pub struct Toasts {
    surface: Arc<dyn Surface>,
    current: Mutex<Option<u64>>,
    next_id: AtomicU64,
    ttl: Duration,
}

impl Toasts {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self::with_ttl(surface, TOAST_TTL)
    }

    pub fn with_ttl(surface: Arc<dyn Surface>, ttl: Duration) -> Self {
        Self {
            surface,
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
            ttl,
        }
    }

    pub fn show(self: &Arc<Self>, message: &str, severity: Severity) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        {
            let mut current = match self.current.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(previous) = current.take() {
                self.surface.unmount_toast(previous);
            }
            self.surface
                .mount_toast(id, render::toast(id, message, severity));
            *current = Some(id);
        }
        debug!("Toast {} [{}]: {}", id, severity.as_str(), message);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let this = Arc::clone(self);
                let ttl = self.ttl;
                handle.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    this.dismiss(id);
                });
            }
            Err(_) => debug!("No runtime, toast {} will not auto-dismiss", id),
        }
        id
    }

    pub fn success(self: &Arc<Self>, message: &str) -> u64 {
        self.show(message, Severity::Success)
    }

    pub fn error(self: &Arc<Self>, message: &str) -> u64 {
        self.show(message, Severity::Error)
    }

    /// Removes toast `id` if it is still the visible one. Timers of replaced
    /// toasts land here and do nothing.
    pub fn dismiss(&self, id: u64) {
        let mut current = match self.current.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *current == Some(id) {
            self.surface.unmount_toast(id);
            *current = None;
        }
    }

    pub fn visible(&self) -> Option<u64> {
        self.current.lock().ok().and_then(|g| *g)
    }
}
