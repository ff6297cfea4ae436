//! Busy-indicator coordination for long-running operations.
//!
//! Overlapping operations share one batch: the first `start_loading` opens
//! the host's progress dialog and the last `stop_loading` closes it.

mod coordinator;
mod host;
mod observer;
mod status_log;

pub use coordinator::{DEFAULT_STATUS_LOG_CAPACITY, LoadingCoordinator, LoadingGuard};
pub use host::{CancelHandler, DialogController, HostView, ModalResult, SystemMessageBox};
pub use observer::Property;
pub use status_log::{LineKind, OutputLine, StatusLog};
