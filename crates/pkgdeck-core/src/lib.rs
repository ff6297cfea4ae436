//! Presentation core for pkgdeck.
//!
//! This crate holds the UI-toolkit independent pieces of the client:
//! - The loading coordinator that shares one busy indicator between
//!   overlapping operations, plus the host-view traits it drives.
//! - The bounded status transcript written by running operations.
//! - Small view helpers (version label, boolean to visibility conversion).

mod error;
pub mod progress;
mod version;
mod visibility;

/// Coordinator and host-view error types.
pub use error::{HostError, ProgressError};
/// Loading coordinator, host-view traits, transcript and change notifications.
pub use progress::{
    DialogController, HostView, LineKind, LoadingCoordinator, LoadingGuard, ModalResult,
    OutputLine, Property, StatusLog, SystemMessageBox,
};
/// Cached "Version: x.y.z" label.
pub use version::VersionNumberProvider;
/// Boolean to visibility converter used by view bindings.
pub use visibility::{BooleanToVisibility, ConvertError, Visibility};
