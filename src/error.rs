//! Binary-boundary error type.
//!
//! Library stages raise typed errors (`FetchError`, `AlignError`, ...). The
//! binary only needs a message and an exit code, so everything funnels into
//! `AppError` here:
//!
//! - `2`: usage or configuration problems
//! - `3`: nothing to show (no data, rejected credential)
//! - `4`: runtime failures (I/O, terminal)

use crate::app::pipeline::RunError;
use crate::data::registry::RegistryError;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        AppError::new(2, format!("Invalid series registry: {err}"))
    }
}

impl From<RunError> for AppError {
    fn from(err: RunError) -> Self {
        let code = match &err {
            RunError::InvalidParams(_) => 2,
            RunError::Unauthorized | RunError::NoData { .. } => 3,
            RunError::Align(_) | RunError::Metrics(_) | RunError::Superseded => 4,
        };
        AppError::new(code, err.to_string())
    }
}
