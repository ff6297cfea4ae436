mod async_helpers;
mod message_box;
mod runner;
mod terminal_host;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use pkgdeck_core::{HostView, LoadingCoordinator, ModalResult, Property};
use tokio::sync::broadcast::error::RecvError;

use crate::error::AppError;
use crate::settings::AppSettings;

use message_box::NativeMessageBox;
use runner::{RunRequest, run_commands};
use terminal_host::TerminalHost;

const CONFIRM_TITLE: &str = "pkgdeck";

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub commands: Vec<String>,
    pub title: Option<String>,
    pub cancelable: Option<bool>,
    pub confirm: Option<String>,
    pub native_dialogs: bool,
    pub quiet: bool,
    pub transcript: Option<PathBuf>,
}

pub struct Pkgdeck {
    pub(crate) settings: AppSettings,
    pub(crate) coordinator: Arc<LoadingCoordinator>,
}

impl Pkgdeck {
    pub fn new(settings: AppSettings) -> Self {
        let coordinator = Arc::new(LoadingCoordinator::new(
            settings.status_log_capacity,
            Arc::new(NativeMessageBox),
        ));
        Self {
            settings,
            coordinator,
        }
    }

    pub fn attach_host_view(&self, host: Arc<dyn HostView>) {
        self.coordinator.set_host_view(Some(host));
    }

    /// Runs the requested commands as one batch. Returns whether every
    /// command exited successfully.
    pub async fn run(&self, options: &RunOptions) -> Result<bool, AppError> {
        if options.commands.is_empty() {
            return Err(AppError::message("No commands to run"));
        }

        if !options.native_dialogs {
            let host = if options.quiet {
                TerminalHost::hidden()
            } else {
                TerminalHost::new()
            };
            self.attach_host_view(Arc::new(host));
        }

        if let Some(question) = &options.confirm {
            let answer = self
                .coordinator
                .show_message(CONFIRM_TITLE, question)
                .await
                .map_err(|e| AppError::operation_failed("ask for confirmation", e))?;
            if answer == ModalResult::Negative {
                info!("Run declined by user");
                return Err(AppError::DeclinedByUser);
            }
        }

        let watcher = self.spawn_change_logger();

        let request = RunRequest {
            title: options.title.as_deref(),
            cancelable: options.cancelable.unwrap_or(self.settings.default_cancelable),
            timeout: Duration::from_secs(self.settings.command_timeout_secs),
        };
        let results = run_commands(&self.coordinator, &options.commands, &request).await;

        watcher.abort();

        if !options.quiet {
            print!("{}", self.coordinator.output().transcript());
        }
        if let Some(path) = &options.transcript {
            self.export_transcript(path)?;
        }

        let mut all_succeeded = true;
        for result in results {
            match result {
                Ok(outcome) if outcome.success() => {}
                Ok(outcome) => {
                    all_succeeded = false;
                    eprintln!("{} exited with {}", outcome.command_line, outcome.status);
                }
                Err(error) if error.is_cancelled() => {
                    all_succeeded = false;
                    warn!("{error}");
                    eprintln!("{error}");
                }
                Err(error) => {
                    all_succeeded = false;
                    eprintln!("Error: {error}");
                }
            }
        }

        Ok(all_succeeded)
    }

    pub fn export_transcript(&self, path: &std::path::Path) -> Result<(), AppError> {
        let lines = self.coordinator.output().snapshot();
        let content =
            serde_json::to_string_pretty(&lines).map_err(AppError::transcript_export_failed)?;
        std::fs::write(path, content).map_err(AppError::transcript_export_failed)?;
        info!("Transcript written to {}", path.display());
        Ok(())
    }

    fn spawn_change_logger(&self) -> tokio::task::JoinHandle<()> {
        let mut changes = self.coordinator.subscribe();
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(Property::IsLoading) => {
                        debug!("is_loading = {}", coordinator.is_loading());
                    }
                    Ok(Property::Progress) => {
                        debug!("progress = {:.1}", coordinator.progress());
                    }
                    Ok(Property::Output) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Change logger skipped {skipped} notifications");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
