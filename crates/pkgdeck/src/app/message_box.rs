use std::ffi::OsStr;

use pkgdeck_core::{HostError, ModalResult, SystemMessageBox};
use rfd::{MessageButtons, MessageDialog, MessageDialogResult, MessageLevel};

/// Native OS message box, used when no terminal host is attached.
#[derive(Debug, Default)]
pub struct NativeMessageBox;

impl SystemMessageBox for NativeMessageBox {
    fn show(&self, title: &str, message: &str) -> Result<ModalResult, HostError> {
        if !desktop_available() {
            log::warn!("No desktop session to show \"{title}\"");
            return Err(HostError::Unavailable);
        }

        let choice = MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::OkCancel)
            .show();

        log::debug!("Message box \"{title}\" answered with {choice:?}");
        Ok(modal_result(&choice))
    }
}

fn desktop_available() -> bool {
    if cfg!(all(unix, not(target_os = "macos"))) {
        has_display_server(
            std::env::var_os("DISPLAY").as_deref(),
            std::env::var_os("WAYLAND_DISPLAY").as_deref(),
        )
    } else {
        true
    }
}

/// X11 or Wayland session is set up for this process.
fn has_display_server(x11: Option<&OsStr>, wayland: Option<&OsStr>) -> bool {
    [x11, wayland].into_iter().flatten().any(|value| !value.is_empty())
}

fn modal_result(choice: &MessageDialogResult) -> ModalResult {
    match choice {
        MessageDialogResult::Ok | MessageDialogResult::Yes => ModalResult::Affirmative,
        _ => ModalResult::Negative,
    }
}
