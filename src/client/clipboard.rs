//! Copy-to-clipboard with a manual-copy modal fallback.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use super::view::{DashboardView, ElementId};

pub const TOAST_DURATION: Duration = Duration::from_secs(3);
pub const COPIED_MESSAGE: &str = "Copied to clipboard";

#[derive(Debug, Error)]
#[error("clipboard write rejected: {0}")]
pub struct ClipboardError(pub String);

/// Platform clipboard.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    /// The text was put in the copy modal for the user to copy by hand.
    ManualFallback,
}

pub fn is_ios(user_agent: &str) -> bool {
    ["iPhone", "iPad", "iPod"]
        .iter()
        .any(|device| user_agent.contains(device))
}

/// Copies `text`, falling back to the modal on iOS, without a clipboard, or when
/// the write is rejected.
pub async fn copy_text(
    view: &Arc<dyn DashboardView>,
    clipboard: Option<&dyn Clipboard>,
    user_agent: &str,
    text: &str,
) -> CopyOutcome {
    let clipboard = match clipboard {
        Some(clipboard) if !is_ios(user_agent) => clipboard,
        _ => {
            show_copy_modal(view.as_ref(), text);
            return CopyOutcome::ManualFallback;
        }
    };

    match clipboard.write_text(text).await {
        Ok(()) => {
            show_toast(view, COPIED_MESSAGE);
            CopyOutcome::Copied
        }
        Err(err) => {
            warn!("{err}, showing copy modal");
            show_copy_modal(view.as_ref(), text);
            CopyOutcome::ManualFallback
        }
    }
}

pub fn show_copy_modal(view: &dyn DashboardView, text: &str) {
    view.set_value(ElementId::CopyModalInput, text);
    view.set_class(ElementId::CopyModal, "show", true);
    view.focus_and_select(ElementId::CopyModalInput);
}

pub fn close_copy_modal(view: &dyn DashboardView) {
    view.set_class(ElementId::CopyModal, "show", false);
}

/// Shows a toast and hides it again after [`TOAST_DURATION`].
pub fn show_toast(view: &Arc<dyn DashboardView>, message: &str) {
    view.set_text(ElementId::ToastMessage, message);
    view.set_class(ElementId::Toast, "show", true);

    let view = Arc::clone(view);
    tokio::spawn(async move {
        tokio::time::sleep(TOAST_DURATION).await;
        view.set_class(ElementId::Toast, "show", false);
        debug!("toast hidden");
    });
}
