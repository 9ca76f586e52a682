use std::fmt;

/// Normalized failure taxonomy for every remote operation.
///
/// Nothing past a client boundary ever panics or propagates a raw transport
/// error; callers always see one of these. Cancellation is deliberately not
/// represented here: a superseded fetch is dropped at the coordinator's
/// commit point and produces no user-visible value at all.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Transport-level failure: DNS, refused connection, TLS, reset.
    NetworkUnreachable(String),
    /// The fixed per-request deadline elapsed.
    Timeout,
    /// Body was not JSON, or JSON of an unusable shape.
    InvalidResponseBody(String),
    /// Non-2xx status, or a 2xx body carrying `error` / `success: false`.
    RemoteRejected(String),
    /// Self-imposed throttle; not a real failure. Retry after the window.
    Cooldown { next_allowed_in_ms: u64 },
    /// A lookup completed but yielded no identity/address.
    NotFound(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkUnreachable(detail) => {
                write!(f, "network error / API unreachable ({detail})")
            }
            Self::Timeout => f.write_str("request timed out"),
            Self::InvalidResponseBody(detail) => write!(f, "invalid response body: {detail}"),
            Self::RemoteRejected(message) => f.write_str(message),
            Self::Cooldown { next_allowed_in_ms } => {
                write!(f, "cooldown active; retry in {next_allowed_in_ms}ms")
            }
            Self::NotFound(what) => write!(f, "{what} not found"),
        }
    }
}

impl std::error::Error for FetchError {}

/// The four-way status every widget renders: data, nothing, throttled, failed.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus<T> {
    Ok(T),
    Empty,
    Cooldown { next_allowed_in_ms: u64 },
    Error(String),
}

impl<T> FetchStatus<T> {
    /// Collapse a client result into the render surface. `Ok(None)` means the
    /// remote answered but had nothing for this key.
    pub fn from_result(result: Result<Option<T>, FetchError>) -> Self {
        match result {
            Ok(Some(value)) => Self::Ok(value),
            Ok(None) => Self::Empty,
            Err(FetchError::Cooldown { next_allowed_in_ms }) => {
                Self::Cooldown { next_allowed_in_ms }
            }
            Err(err) => Self::Error(err.to_string()),
        }
    }

    pub fn map<U>(self, op: impl FnOnce(T) -> U) -> FetchStatus<U> {
        match self {
            Self::Ok(value) => FetchStatus::Ok(op(value)),
            Self::Empty => FetchStatus::Empty,
            Self::Cooldown { next_allowed_in_ms } => FetchStatus::Cooldown { next_allowed_in_ms },
            Self::Error(message) => FetchStatus::Error(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_result_covers_all_four_surfaces() {
        assert_eq!(FetchStatus::from_result(Ok(Some(7))), FetchStatus::Ok(7));
        assert_eq!(FetchStatus::<u32>::from_result(Ok(None)), FetchStatus::Empty);
        assert_eq!(
            FetchStatus::<u32>::from_result(Err(FetchError::Cooldown {
                next_allowed_in_ms: 1500
            })),
            FetchStatus::Cooldown {
                next_allowed_in_ms: 1500
            }
        );
        match FetchStatus::<u32>::from_result(Err(FetchError::Timeout)) {
            FetchStatus::Error(message) => assert_eq!(message, "request timed out"),
            other => panic!("expected error status, got {other:?}"),
        }
    }

    #[test]
    fn network_failures_display_as_api_unreachable() {
        let err = FetchError::NetworkUnreachable("connection refused".to_string());
        assert!(err.to_string().starts_with("network error / API unreachable"));
    }
}
