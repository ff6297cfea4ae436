use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, warn};
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use crate::error::{HostError, ProgressError};

use super::host::{DialogController, HostView, ModalResult, SystemMessageBox};
use super::observer::Property;
use super::status_log::{LineKind, OutputLine, StatusLog};

pub const DEFAULT_STATUS_LOG_CAPACITY: usize = 100;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

struct ActiveBatch {
    dialog: Option<Arc<dyn DialogController>>,
    cancel: CancellationToken,
}

/// Shares one busy dialog between overlapping operations.
///
/// Every `start_loading` must be paired with a `stop_loading`. The first
/// start of a batch opens the dialog and the matching last stop closes it;
/// the calls in between only move the operation count.
pub struct LoadingCoordinator {
    transition: Mutex<()>,
    loading_items: AtomicUsize,
    is_loading: AtomicBool,
    progress_bits: AtomicU64,
    batch: RwLock<Option<ActiveBatch>>,
    host_view: RwLock<Option<Arc<dyn HostView>>>,
    message_box: Arc<dyn SystemMessageBox>,
    output: StatusLog,
    changes: broadcast::Sender<Property>,
}

impl std::fmt::Debug for LoadingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingCoordinator")
            .field("loading_items", &self.active_operations())
            .field("is_loading", &self.is_loading())
            .field("progress", &self.progress())
            .field("output", &self.output.len())
            .finish_non_exhaustive()
    }
}

impl LoadingCoordinator {
    pub fn new(status_log_capacity: usize, message_box: Arc<dyn SystemMessageBox>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            transition: Mutex::new(()),
            loading_items: AtomicUsize::new(0),
            is_loading: AtomicBool::new(false),
            progress_bits: AtomicU64::new(0f64.to_bits()),
            batch: RwLock::new(None),
            host_view: RwLock::new(None),
            message_box,
            output: StatusLog::new(status_log_capacity),
            changes,
        }
    }

    pub fn set_host_view(&self, host_view: Option<Arc<dyn HostView>>) {
        *self
            .host_view
            .write()
            .unwrap_or_else(PoisonError::into_inner) = host_view;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Property> {
        self.changes.subscribe()
    }

    pub fn progress(&self) -> f64 {
        f64::from_bits(self.progress_bits.load(Ordering::SeqCst))
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn active_operations(&self) -> usize {
        self.loading_items.load(Ordering::SeqCst)
    }

    pub fn output(&self) -> &StatusLog {
        &self.output
    }

    /// Registers one more running operation.
    ///
    /// The first operation of a batch opens the host's progress dialog, sets
    /// it indeterminate, creates the batch cancellation token and clears the
    /// status log. Later callers join the open batch. A host failure while
    /// opening the dialog is returned and the operation is not registered.
    ///
    /// The count only moves once the batch is fully set up, so dropping this
    /// future while the dialog opens registers nothing.
    pub async fn start_loading(
        &self,
        title: Option<&str>,
        cancelable: bool,
    ) -> Result<(), ProgressError> {
        let _transition = self.transition.lock().await;

        if self.active_operations() > 0 {
            let current = self.loading_items.fetch_add(1, Ordering::SeqCst) + 1;
            debug!("Joined loading batch ({current} operations active)");
            return Ok(());
        }

        let dialog = match self.host_view() {
            Some(host) => Some(
                host.show_progress_dialog(title, cancelable)
                    .await
                    .inspect_err(|error| warn!("Failed to open progress dialog: {error}"))?,
            ),
            None => None,
        };

        let cancel = CancellationToken::new();
        if let Some(dialog) = &dialog {
            dialog.set_indeterminate();
            if cancelable {
                let token = cancel.clone();
                dialog.set_cancel_handler(Box::new(move || token.cancel()));
            }
        }

        *self.batch.write().unwrap_or_else(PoisonError::into_inner) =
            Some(ActiveBatch { dialog, cancel });
        self.loading_items.fetch_add(1, Ordering::SeqCst);

        self.output.clear();
        self.notify(Property::Output);

        self.is_loading.store(true, Ordering::SeqCst);
        self.notify(Property::IsLoading);

        debug!(
            "Loading batch started: title={:?}, cancelable={cancelable}",
            title.unwrap_or_default()
        );
        Ok(())
    }

    /// Marks one operation as finished; the last one closes the dialog and
    /// resets progress to 0.
    pub async fn stop_loading(&self) -> Result<(), ProgressError> {
        let _transition = self.transition.lock().await;

        let previous = self
            .loading_items
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| ProgressError::NotLoading)?;
        if previous > 1 {
            debug!("Left loading batch ({} operations active)", previous - 1);
            return Ok(());
        }

        let batch = self
            .batch
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let closed = match batch.and_then(|batch| batch.dialog) {
            Some(dialog) => dialog.close().await,
            None => Ok(()),
        };

        self.report(0.0);

        self.is_loading.store(false, Ordering::SeqCst);
        self.notify(Property::IsLoading);

        debug!("Loading batch finished");
        closed.map_err(ProgressError::from)
    }

    /// Records a progress percentage for the current batch.
    ///
    /// Negative values (and NaN) switch the dialog to indeterminate; other
    /// values are clamped to `0..=100` and forwarded as a fraction.
    pub fn report(&self, value: f64) {
        let indeterminate = value.is_nan() || value < 0.0;
        let stored = if indeterminate {
            value
        } else {
            value.min(100.0)
        };
        self.progress_bits.store(stored.to_bits(), Ordering::SeqCst);

        if let Some(dialog) = self.current_dialog() {
            if indeterminate {
                dialog.set_indeterminate();
            } else {
                dialog.set_progress(stored / 100.0);
            }
        }

        self.notify(Property::Progress);
    }

    /// Token shared by every operation of the current batch.
    ///
    /// A batch started without `cancelable` hands out a token nothing ever
    /// cancels.
    pub fn cancellation_token(&self) -> Result<CancellationToken, ProgressError> {
        if self.active_operations() == 0 {
            return Err(ProgressError::NotLoading);
        }

        self.batch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|batch| batch.cancel.clone())
            .ok_or(ProgressError::NotLoading)
    }

    pub fn write_message(&self, message: impl Into<String>, kind: LineKind, new_line: bool) {
        self.output.push(OutputLine::new(message, kind, new_line));
        self.notify(Property::Output);
    }

    pub fn write_output(&self, message: impl Into<String>) {
        self.write_message(message, LineKind::Output, true);
    }

    /// Asks the user a question through the host view, or through the
    /// blocking system message box when no host view is attached.
    pub async fn show_message(
        &self,
        title: &str,
        message: &str,
    ) -> Result<ModalResult, ProgressError> {
        if let Some(host) = self.host_view() {
            return Ok(host.show_message(title, message).await?);
        }

        let message_box = Arc::clone(&self.message_box);
        let title = title.to_string();
        let message = message.to_string();
        let result = tokio::task::spawn_blocking(move || message_box.show(&title, &message))
            .await
            .map_err(|e| HostError::dialog_from("show message box", e))??;
        Ok(result)
    }

    /// Starts (or joins) a batch and returns a guard holding the batch
    /// cancellation token.
    ///
    /// Finish the guard with [`LoadingGuard::finish`] to observe the stop
    /// result. A guard dropped early (a timed out or cancelled future, a
    /// panicking operation) stops loading on a spawned task instead.
    pub async fn begin(
        self: &Arc<Self>,
        title: Option<&str>,
        cancelable: bool,
    ) -> Result<LoadingGuard, ProgressError> {
        self.start_loading(title, cancelable).await?;

        match self.cancellation_token() {
            Ok(token) => Ok(LoadingGuard {
                coordinator: Some(Arc::clone(self)),
                token,
            }),
            Err(error) => {
                self.stop_loading().await?;
                Err(error)
            }
        }
    }

    /// Runs `operation` as one operation of the current batch, passing it the
    /// batch cancellation token. Loading is stopped once the operation
    /// completes or when this future is dropped.
    pub async fn run_loading<F, Fut, T>(
        self: &Arc<Self>,
        title: Option<&str>,
        cancelable: bool,
        operation: F,
    ) -> Result<T, ProgressError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.begin(title, cancelable).await?;
        let value = operation(guard.token().clone()).await;
        guard.finish().await?;
        Ok(value)
    }

    fn host_view(&self) -> Option<Arc<dyn HostView>> {
        self.host_view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn current_dialog(&self) -> Option<Arc<dyn DialogController>> {
        self.batch
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|batch| batch.dialog.clone())
    }

    fn notify(&self, property: Property) {
        // No receivers is not an error.
        let _ = self.changes.send(property);
    }
}

/// One registered operation of a loading batch.
#[must_use = "call `finish` to stop loading"]
pub struct LoadingGuard {
    coordinator: Option<Arc<LoadingCoordinator>>,
    token: CancellationToken,
}

impl LoadingGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub async fn finish(mut self) -> Result<(), ProgressError> {
        match self.coordinator.take() {
            Some(coordinator) => coordinator.stop_loading().await,
            None => Ok(()),
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let Some(coordinator) = self.coordinator.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!("Loading guard dropped before finish, stopping in background");
                runtime.spawn(async move {
                    if let Err(error) = coordinator.stop_loading().await {
                        warn!("Failed to stop loading for dropped guard: {error}");
                    }
                });
            }
            Err(_) => {
                warn!("Loading guard dropped outside a runtime, operation stays registered");
            }
        }
    }
}
