mod retry;

pub use retry::{RetryConfig, is_retryable_error, retry_with_backoff};
