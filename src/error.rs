//! Fatal error type.
//!
//! Per-sample fit failures are not errors: they are reported as
//! [`crate::domain::FitStatus`] codes. `AppError` is reserved for conditions
//! that stop the pipeline for a sample or a whole file (missing source data,
//! malformed input, invalid configuration).

/// Invalid input or configuration.
pub const CODE_INVALID_INPUT: u8 = 2;
/// Source data missing or unusable (no file, empty field series, zero field vector).
pub const CODE_MISSING_DATA: u8 = 3;
/// Numerical or internal failure.
pub const CODE_NUMERICAL: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    code: u8,
    message: String,
}

impl AppError {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(CODE_INVALID_INPUT, message)
    }

    pub fn missing_data(message: impl Into<String>) -> Self {
        Self::new(CODE_MISSING_DATA, message)
    }

    pub fn code(&self) -> u8 {
        self.code
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
            .field("code", &self.code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
