use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("No desktop session is available to show dialogs")]
    Unavailable,

    #[error("Dialog failed to {action}: {details}")]
    Dialog {
        action: &'static str,
        details: String,
    },
}

impl HostError {
    pub fn dialog(action: &'static str, details: impl Into<String>) -> Self {
        Self::Dialog {
            action,
            details: details.into(),
        }
    }

    pub fn dialog_from<E>(action: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::dialog(action, error.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("There's no current operation in process")]
    NotLoading,

    #[error(transparent)]
    Host(#[from] HostError),
}
