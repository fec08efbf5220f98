use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Market data request failed: {status} {body}")]
    Upstream { status: u16, body: String },

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("Could not parse {field} for {symbol}: {value:?}")]
    Parse {
        symbol: String,
        field: &'static str,
        value: String,
    },

    #[error("Alert store error: {0}")]
    Store(String),

    #[error("Alert not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("{0}")]
    Validation(String),

    #[error("Field `{0}` cannot change after an alert is created")]
    ImmutableField(&'static str),
}

impl AppError {
    /// Errors that only mean "no data for this symbol this cycle".
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Transport(_)
                | AppError::Upstream { .. }
                | AppError::Timeout(_)
                | AppError::Parse { .. }
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Store(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
