//! Pure functions from data to markup. Nothing here touches the network or
//! the surface.
pub mod modals;
pub mod pages;
pub mod tables;
pub mod text;

use crate::toast::Severity;

/// Offset that keeps toasts clear of the fixed header.
const HEADER_OFFSET_PX: u32 = 80;

pub fn toast(id: u64, message: &str, severity: Severity) -> String {
    format!(
        concat!(
            r#"<div class="toast toast-{sev}" id="toast-{id}" role="status" style="top: {top}px">"#,
            r#"<span>{msg}</span><button class="toast-close" data-toast="{id}">&times;</button></div>"#
        ),
        sev = severity.as_str(),
        id = id,
        top = HEADER_OFFSET_PX,
        msg = text::escape(message),
    )
}
