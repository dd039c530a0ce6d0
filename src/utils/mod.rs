//! Utility modules.

pub mod file;
pub mod retry;

pub use file::{is_supported_document, read_document};
pub use retry::{Retryable, RetryConfig, with_retry};
