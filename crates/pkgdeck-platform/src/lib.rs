mod commands;
mod paths;

pub use commands::{HideWindow, shell_command};
pub use paths::{AppPaths, AppPathsError};
