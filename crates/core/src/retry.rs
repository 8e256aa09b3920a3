use reqwest::StatusCode;
use std::time::Duration;

pub(crate) fn retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn retryable_transport(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_body() || error.is_request()
}

pub(crate) fn backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[cfg(test)]
mod tests {
    use super::{backoff, retryable_status};
    use reqwest::StatusCode;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff(1).as_millis(), 1_000);
        assert_eq!(backoff(2).as_millis(), 2_000);
        assert_eq!(backoff(5), backoff(9));
    }

    #[test]
    fn only_throttling_and_server_errors_retry() {
        assert!(retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!retryable_status(StatusCode::BAD_REQUEST));
    }
}
