use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::debug;
use pkgdeck_core::progress::CancelHandler;
use pkgdeck_core::{DialogController, HostError, HostView, ModalResult};
use tokio::task::JoinHandle;

const TICK_INTERVAL_MS: u64 = 100;
const DEFAULT_TITLE: &str = "Working";
const CANCEL_HINT: &str = "press Ctrl-C to cancel";

const SPINNER_TEMPLATE: &str = "{prefix:>12.bold.cyan} {spinner} {msg}";
const BAR_TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:30}] {pos:>3}% {msg}";

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .map(|style| style.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Busy dialog rendered as an `indicatif` line on stderr.
pub struct TerminalDialog {
    bar: ProgressBar,
    cancel_handler: Arc<Mutex<Option<CancelHandler>>>,
    ctrl_c_listener: Mutex<Option<JoinHandle<()>>>,
}

impl TerminalDialog {
    fn new(bar: ProgressBar) -> Self {
        Self {
            bar,
            cancel_handler: Arc::new(Mutex::new(None)),
            ctrl_c_listener: Mutex::new(None),
        }
    }

    /// Invokes the installed cancel handler. Returns whether one was set.
    fn press_cancel(handler: &Mutex<Option<CancelHandler>>) -> bool {
        let guard = handler.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(cancel) => {
                cancel();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl DialogController for TerminalDialog {
    fn set_indeterminate(&self) {
        self.bar.set_style(spinner_style());
        self.bar
            .enable_steady_tick(Duration::from_millis(TICK_INTERVAL_MS));
    }

    fn set_progress(&self, fraction: f64) {
        self.bar.disable_steady_tick();
        self.bar.set_style(bar_style());
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u64;
        self.bar.set_position(percent);
    }

    fn set_cancel_handler(&self, handler: CancelHandler) {
        *self
            .cancel_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);

        let handler = Arc::clone(&self.cancel_handler);
        let bar = self.bar.clone();
        let listener = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if TerminalDialog::press_cancel(&handler) {
                    debug!("Cancel requested from terminal");
                    bar.set_message("cancelling...");
                }
            }
        });

        if let Some(previous) = self
            .ctrl_c_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(listener)
        {
            previous.abort();
        }
    }

    async fn close(&self) -> Result<(), HostError> {
        if let Some(listener) = self
            .ctrl_c_listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.abort();
        }
        self.bar.finish_and_clear();
        Ok(())
    }
}

/// Host view for the command line: busy dialogs are progress lines on
/// stderr and questions are answered on stdin.
#[derive(Debug, Default)]
pub struct TerminalHost {
    hidden: bool,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that draws nothing. Questions still go to the terminal.
    pub fn hidden() -> Self {
        Self { hidden: true }
    }

    fn progress_bar(&self, title: Option<&str>, cancelable: bool) -> ProgressBar {
        let bar = ProgressBar::new(100);
        if self.hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_prefix(title.unwrap_or(DEFAULT_TITLE).to_string());
        if cancelable {
            bar.set_message(CANCEL_HINT);
        }
        bar
    }
}

#[async_trait]
impl HostView for TerminalHost {
    async fn show_progress_dialog(
        &self,
        title: Option<&str>,
        cancelable: bool,
    ) -> Result<Arc<dyn DialogController>, HostError> {
        let bar = self.progress_bar(title, cancelable);
        Ok(Arc::new(TerminalDialog::new(bar)))
    }

    async fn show_message(&self, title: &str, message: &str) -> Result<ModalResult, HostError> {
        let prompt = format!("{title}: {message} [y/N] ");
        tokio::task::spawn_blocking(move || ask(&prompt, io::stdin().lock(), io::stderr()))
            .await
            .map_err(|e| HostError::dialog_from("ask question", e))?
            .map_err(|e| HostError::dialog_from("read answer", e))
    }
}

fn ask(prompt: &str, mut input: impl BufRead, mut output: impl Write) -> io::Result<ModalResult> {
    output.write_all(prompt.as_bytes())?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> ModalResult {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "ok" => ModalResult::Affirmative,
        _ => ModalResult::Negative,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use pkgdeck_core::{DialogController, HostView, ModalResult};

    use super::{CANCEL_HINT, DEFAULT_TITLE, TerminalDialog, TerminalHost, ask, parse_answer};

    #[test]
    fn yes_answers_are_affirmative() {
        assert_eq!(parse_answer("y\n"), ModalResult::Affirmative);
        assert_eq!(parse_answer("  YES "), ModalResult::Affirmative);
        assert_eq!(parse_answer("n"), ModalResult::Negative);
        assert_eq!(parse_answer(""), ModalResult::Negative);
    }

    #[test]
    fn ask_writes_prompt_and_reads_one_line() {
        let mut output = Vec::new();
        let result = ask("Reboot? [y/N] ", "yes\nignored\n".as_bytes(), &mut output)
            .expect("ask should succeed");

        assert_eq!(result, ModalResult::Affirmative);
        assert_eq!(String::from_utf8(output).expect("utf8"), "Reboot? [y/N] ");
    }

    #[test]
    fn cancel_hint_shown_only_for_cancelable_dialogs() {
        let host = TerminalHost::hidden();

        let cancelable = host.progress_bar(Some("Upgrade"), true);
        assert_eq!(cancelable.message(), CANCEL_HINT);
        assert_eq!(cancelable.prefix(), "Upgrade");

        let fixed = host.progress_bar(None, false);
        assert_eq!(fixed.message(), "");
        assert_eq!(fixed.prefix(), DEFAULT_TITLE);
    }

    #[tokio::test]
    async fn hidden_host_opens_and_closes_dialogs() {
        let host = TerminalHost::hidden();

        let dialog = host
            .show_progress_dialog(Some("Upgrade"), true)
            .await
            .expect("dialog should open");
        dialog.set_indeterminate();

        dialog.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn installed_cancel_handler_is_invoked() {
        let bar = indicatif::ProgressBar::hidden();
        let dialog = TerminalDialog::new(bar.clone());
        let pressed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&pressed);

        dialog.set_cancel_handler(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(TerminalDialog::press_cancel(&dialog.cancel_handler));
        assert!(pressed.load(Ordering::SeqCst));

        dialog.set_progress(0.42);
        assert_eq!(bar.position(), 42);

        dialog.close().await.expect("close should succeed");
        assert!(bar.is_finished());
    }
}
