use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Slack API returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// `ok: false` response; holds Slack's error code, e.g. `channel_not_found`
    #[error("{0}")]
    Slack(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Slack error code for `ok: false` responses
    pub fn slack_code(&self) -> Option<&str> {
        match self {
            ApiError::Slack(code) => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slack_error_displays_bare_code() {
        let err = ApiError::Slack("user_not_found".to_string());

        assert_eq!(err.to_string(), "user_not_found");
        assert_eq!(err.slack_code(), Some("user_not_found"));
    }

    #[test]
    fn http_error_includes_status() {
        let err = ApiError::Http {
            status: 429,
            message: "ratelimited".to_string(),
        };

        assert_eq!(err.to_string(), "Slack API returned HTTP 429: ratelimited");
        assert_eq!(err.slack_code(), None);
    }
}
