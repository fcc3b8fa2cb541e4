mod retry;

pub use retry::{retry, RetryPolicy, Retryable};
