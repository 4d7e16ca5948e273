use thiserror::Error;

/// Failure of a single completion request.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Error code: 429 - {body}")]
    RateLimited { body: String },

    #[error("Request timed out.")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    /// Any other non-success HTTP status.
    #[error("Error code: {status} - {body}")]
    Status { status: u16, body: String },

    /// The server answered 2xx but the body was not a usable message.
    /// Reported as an unknown error, not an API error.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{message}")]
    Unexpected {
        type_name: &'static str,
        message: String,
    },
}

impl ApiError {
    /// Wrap an error that has no dedicated variant, remembering its type.
    pub fn unexpected<E: std::fmt::Display>(err: E) -> Self {
        Self::Unexpected { type_name: std::any::type_name::<E>(), message: err.to_string() }
    }

    /// Short type name shown in the report for unexpected errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            ApiError::RateLimited { .. } => "RateLimited",
            ApiError::Timeout => "Timeout",
            ApiError::Connection(_) => "Connection",
            ApiError::Status { .. } => "Status",
            ApiError::InvalidResponse(_) => "InvalidResponse",
            ApiError::Unexpected { type_name, .. } => *type_name,
        }
    }

    /// Classify for the report. Variant decides the category; for API errors
    /// the rendered message is searched for a status code or reason phrase.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::RateLimited { .. } => ErrorKind::RateLimited,
            ApiError::Timeout => ErrorKind::TimedOut,
            ApiError::Connection(_) => ErrorKind::ConnectionFailed,
            ApiError::Status { .. } => ErrorKind::Api(ApiFault::from_message(&self.to_string())),
            ApiError::InvalidResponse(_) | ApiError::Unexpected { .. } => ErrorKind::Unknown,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() || err.is_request() {
            ApiError::Connection(report(&err))
        } else if err.is_decode() || err.is_body() {
            ApiError::InvalidResponse(report(&err))
        } else {
            ApiError::Unexpected { type_name: "reqwest::Error", message: report(&err) }
        }
    }
}

/// Report category, in the order the probe checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    TimedOut,
    ConnectionFailed,
    Api(ApiFault),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFault {
    ServerError,
    Unauthorized,
    Forbidden,
    Other,
}

impl ApiFault {
    /// Substring match, first hit wins. Any "500" in the text counts.
    pub fn from_message(msg: &str) -> Self {
        if msg.contains("500") || msg.contains("Internal Server Error") {
            ApiFault::ServerError
        } else if msg.contains("401") || msg.contains("Unauthorized") {
            ApiFault::Unauthorized
        } else if msg.contains("403") || msg.contains("Forbidden") {
            ApiFault::Forbidden
        } else {
            ApiFault::Other
        }
    }
}

/// Flatten an error and its sources into one line.
fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = err.to_string();
    while let Some(src) = err.source() {
        s.push_str(": ");
        s.push_str(&src.to_string());
        err = src;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_categories() {
        assert_eq!(ApiError::RateLimited { body: String::new() }.kind(), ErrorKind::RateLimited);
        assert_eq!(ApiError::Timeout.kind(), ErrorKind::TimedOut);
        assert_eq!(ApiError::Connection("refused".into()).kind(), ErrorKind::ConnectionFailed);
        assert_eq!(ApiError::unexpected("boom").kind(), ErrorKind::Unknown);
    }

    #[test]
    fn status_errors_are_classified_by_message() {
        let err = ApiError::Status { status: 500, body: "oops".into() };
        assert_eq!(err.kind(), ErrorKind::Api(ApiFault::ServerError));

        let err = ApiError::Status { status: 401, body: "{}".into() };
        assert_eq!(err.kind(), ErrorKind::Api(ApiFault::Unauthorized));

        let err = ApiError::Status { status: 403, body: "{}".into() };
        assert_eq!(err.kind(), ErrorKind::Api(ApiFault::Forbidden));

        let err = ApiError::Status { status: 404, body: "not here".into() };
        assert_eq!(err.kind(), ErrorKind::Api(ApiFault::Other));
    }

    #[test]
    fn server_error_takes_precedence_over_auth_markers() {
        assert_eq!(
            ApiFault::from_message("401 Unauthorized upstream, then 500"),
            ApiFault::ServerError
        );
        assert_eq!(ApiFault::from_message("Forbidden: Unauthorized"), ApiFault::Unauthorized);
    }

    #[test]
    fn stray_digits_still_trigger_server_fault() {
        let err = ApiError::Status { status: 404, body: "expected 1500 bytes".into() };
        assert_eq!(err.kind(), ErrorKind::Api(ApiFault::ServerError));
    }

    #[test]
    fn unusable_success_body_is_unknown() {
        let err = ApiError::InvalidResponse("500 items missing".into());
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.type_name(), "InvalidResponse");
    }

    #[test]
    fn unexpected_keeps_type_name() {
        let err = ApiError::unexpected(std::fmt::Error);
        assert!(err.type_name().ends_with("fmt::Error"));
        assert_eq!(err.to_string(), "an error occurred when formatting an argument");
    }
}
