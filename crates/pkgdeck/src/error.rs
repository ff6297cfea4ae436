use pkgdeck_core::ProgressError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorDetail {
    Message(String),
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },
    Progress(ProgressError),
}

impl std::fmt::Display for AppErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => write!(f, "{message}"),
            Self::Io { kind, message } => write!(f, "{kind}: {message}"),
            Self::Progress(error) => write!(f, "{error}"),
        }
    }
}

impl From<String> for AppErrorDetail {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for AppErrorDetail {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

impl From<std::io::Error> for AppErrorDetail {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<ProgressError> for AppErrorDetail {
    fn from(value: ProgressError) -> Self {
        Self::Progress(value)
    }
}

impl From<serde_json::Error> for AppErrorDetail {
    fn from(value: serde_json::Error) -> Self {
        Self::Message(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    Message(String),
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
    OperationFailed {
        operation: &'static str,
        details: AppErrorDetail,
    },
    OperationCancelled {
        operation: &'static str,
    },
    DeclinedByUser,
    SettingsSaveFailed {
        details: AppErrorDetail,
    },
    TranscriptExportFailed {
        details: AppErrorDetail,
    },
}

impl AppError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn timeout(operation: &'static str, seconds: u64) -> Self {
        Self::Timeout { operation, seconds }
    }

    pub fn operation_failed(operation: &'static str, details: impl Into<AppErrorDetail>) -> Self {
        Self::OperationFailed {
            operation,
            details: details.into(),
        }
    }

    pub fn operation_cancelled(operation: &'static str) -> Self {
        Self::OperationCancelled { operation }
    }

    pub fn settings_save_failed(details: impl Into<AppErrorDetail>) -> Self {
        Self::SettingsSaveFailed {
            details: details.into(),
        }
    }

    pub fn transcript_export_failed(details: impl Into<AppErrorDetail>) -> Self {
        Self::TranscriptExportFailed {
            details: details.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::OperationCancelled { .. } | Self::DeclinedByUser)
    }
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for AppError {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => write!(f, "{message}"),
            Self::Timeout { operation, seconds } => {
                write!(f, "{operation} timed out after {seconds}s")
            }
            Self::OperationFailed { operation, details } => {
                write!(f, "{operation} failed: {details}")
            }
            Self::OperationCancelled { operation } => write!(f, "{operation} was cancelled"),
            Self::DeclinedByUser => write!(f, "Declined by user"),
            Self::SettingsSaveFailed { details } => {
                write!(f, "Failed to save settings: {details}")
            }
            Self::TranscriptExportFailed { details } => {
                write!(f, "Failed to export transcript: {details}")
            }
        }
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use pkgdeck_core::ProgressError;

    use super::{AppError, AppErrorDetail};

    #[test]
    fn io_detail_keeps_kind_and_message() {
        let detail = AppErrorDetail::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "choco not found",
        ));

        assert_eq!(
            detail,
            AppErrorDetail::Io {
                kind: std::io::ErrorKind::NotFound,
                message: "choco not found".to_string(),
            }
        );
    }

    #[test]
    fn operation_failed_display_includes_details() {
        let error = AppError::operation_failed("start loading", ProgressError::NotLoading);

        assert_eq!(
            error.to_string(),
            "start loading failed: There's no current operation in process"
        );
    }

    #[test]
    fn timeout_display_includes_seconds() {
        assert_eq!(
            AppError::timeout("Command", 30).to_string(),
            "Command timed out after 30s"
        );
    }

    #[test]
    fn cancellation_and_decline_count_as_cancelled() {
        assert!(AppError::operation_cancelled("command").is_cancelled());
        assert!(AppError::DeclinedByUser.is_cancelled());
        assert!(!AppError::message("boom").is_cancelled());
    }
}
