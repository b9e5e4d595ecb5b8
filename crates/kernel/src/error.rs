//! Application error types.

use thiserror::Error;

use crate::plugin::PluginError;

/// Exit code for a successful run.
pub const EXIT_OK: u8 = 0;
/// Exit code for bad command-line usage.
pub const EXIT_USAGE: u8 = 1;
/// Exit code for a failed operation.
pub const EXIT_ERROR: u8 = 2;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("unexpected error: {0:#}")]
    Internal(anyhow::Error),
}

impl AppError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Usage(_) => EXIT_USAGE,
            AppError::Config(_) | AppError::Plugin(_) | AppError::Internal(_) => EXIT_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    /// Recover the plugin error taxonomy from command results; anything else
    /// is unexpected.
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<PluginError>() {
            Ok(plugin) => AppError::Plugin(plugin),
            Err(other) => AppError::Internal(other),
        }
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_errors_survive_anyhow() {
        let err: anyhow::Error = PluginError::InvalidRequest { action: "enable" }.into();
        let app = AppError::from(err);
        assert!(matches!(app, AppError::Plugin(PluginError::InvalidRequest { .. })));
        assert_eq!(app.exit_code(), EXIT_ERROR);
    }

    #[test]
    fn other_errors_are_unexpected() {
        let app = AppError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(app.to_string(), "unexpected error: disk on fire");
        assert_eq!(app.exit_code(), EXIT_ERROR);
    }

    #[test]
    fn usage_exit_code() {
        assert_eq!(AppError::Usage("bad flag".into()).exit_code(), EXIT_USAGE);
    }
}
