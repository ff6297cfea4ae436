use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HostError;

/// The user's answer to a message dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalResult {
    Affirmative,
    Negative,
}

pub type CancelHandler = Box<dyn Fn() + Send + Sync>;

/// Handle to an open busy dialog.
#[async_trait]
pub trait DialogController: Send + Sync {
    fn set_indeterminate(&self);

    /// `fraction` is in `0.0..=1.0`.
    fn set_progress(&self, fraction: f64);

    /// Installs the action run when the user presses the dialog's cancel
    /// button. Only called for cancelable batches.
    fn set_cancel_handler(&self, handler: CancelHandler);

    async fn close(&self) -> Result<(), HostError>;
}

/// The view layer that owns the dialogs.
#[async_trait]
pub trait HostView: Send + Sync {
    async fn show_progress_dialog(
        &self,
        title: Option<&str>,
        cancelable: bool,
    ) -> Result<Arc<dyn DialogController>, HostError>;

    async fn show_message(&self, title: &str, message: &str) -> Result<ModalResult, HostError>;
}

/// Blocking OS message box used when no host view is attached.
pub trait SystemMessageBox: Send + Sync {
    fn show(&self, title: &str, message: &str) -> Result<ModalResult, HostError>;
}
