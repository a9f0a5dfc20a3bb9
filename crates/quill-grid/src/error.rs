use thiserror::Error;

/// Configuration problems detected before any remote call is attempted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {detail}")]
    Invalid { key: &'static str, detail: String },
    #[error("unsupported grid api version: {0}")]
    UnsupportedApiVersion(String),
}

/// Failures of the admin credential lifecycle.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("grid backend rejected admin credentials: status {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("grid backend unreachable during {operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl AuthError {
    /// True when the failure never reached the backend (connect, timeout,
    /// decode), as opposed to the backend actively refusing the credentials.
    pub fn is_transport(&self) -> bool {
        matches!(self, AuthError::Transport { .. })
    }
}

/// Failures of authenticated grid API operations.
#[derive(Debug, Error)]
pub enum GridError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("grid api rejected {operation}: status {status}: {detail}")]
    Api {
        operation: &'static str,
        status: u16,
        detail: String,
    },
    #[error("http error during {operation}: {source}")]
    Http {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

pub type GridResult<T> = Result<T, GridError>;

const DETAIL_LIMIT: usize = 256;

/// Bounds a backend error body to a snippet safe to carry in errors and logs.
pub(crate) fn detail_snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= DETAIL_LIMIT {
        return trimmed.to_string();
    }
    let mut end = DETAIL_LIMIT;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let missing = ConfigError::Missing("QUILL_GRID_URL");
        assert!(missing.to_string().contains("QUILL_GRID_URL"));

        let invalid = ConfigError::Invalid {
            key: "QUILL_GRID_REFRESH_BUFFER_SECS",
            detail: "must be positive".to_string(),
        };
        assert!(invalid.to_string().contains("must be positive"));

        let version = ConfigError::UnsupportedApiVersion("v9".to_string());
        assert!(version.to_string().contains("v9"));
    }

    #[test]
    fn detail_snippet_bounds_long_bodies() {
        let short = detail_snippet("  bad credentials  ");
        assert_eq!(short, "bad credentials");

        let long = detail_snippet(&"x".repeat(1000));
        assert!(long.len() <= DETAIL_LIMIT + 3);
        assert!(long.ends_with("..."));
    }

    #[test]
    fn grid_error_carries_operation_and_status() {
        let err = GridError::Api {
            operation: "create_table",
            status: 400,
            detail: "name too long".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("create_table"));
        assert!(text.contains("400"));
    }
}
