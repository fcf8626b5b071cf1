use crate::sequence::{Sequence, Ticket};
use crate::surface::Surface;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Proof that a particular modal was opened. Handlers bound to that modal
/// carry it and become no-ops once another modal replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalHandle(Ticket);

/// The single overlay slot.
pub struct Modal {
    surface: Arc<dyn Surface>,
    generation: Sequence,
    open: AtomicBool,
}

impl Modal {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self {
            surface,
            generation: Sequence::new(),
            open: AtomicBool::new(false),
        }
    }

    /// Replaces whatever the overlay held and locks background scrolling.
    pub fn show(&self, markup: String) -> ModalHandle {
        let ticket = self.generation.issue();
        self.surface.show_overlay(markup);
        self.surface.set_scroll_locked(true);
        self.open.store(true, Ordering::SeqCst);
        ModalHandle(ticket)
    }

    /// Cancel, backdrop click and successful submit all end here.
    pub fn close(&self) {
        self.generation.invalidate();
        self.surface.hide_overlay();
        self.surface.set_scroll_locked(false);
        self.open.store(false, Ordering::SeqCst);
    }

    /// Closes only if `handle` still owns the overlay.
    pub fn close_if_current(&self, handle: ModalHandle) -> bool {
        if !self.is_current(handle) {
            debug!("Ignoring close from a replaced modal");
            return false;
        }
        self.close();
        true
    }

    pub fn is_current(&self, handle: ModalHandle) -> bool {
        self.open.load(Ordering::SeqCst) && self.generation.is_current(handle.0)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
