//! Application error types.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Application error that can be serialized for presentation layers.
#[derive(Debug, Clone)]
pub struct AppError {
    payload: HashMap<String, String>,
    kind: ErrorKind,
    status: Option<u16>,
    empty_body: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request exceeded its allotted time
    Timeout,
    /// Connection could not be established
    Network,
    /// Backend answered with a 5xx status
    ServerError,
    /// Backend rejected the credentials (401)
    Auth,
    /// Any other non-success HTTP status
    Http,
    /// Every attempt of a wake cycle failed
    ExhaustedRetries,
    /// Response body could not be decoded
    Decode,
    /// Configuration error
    Config,
    /// File system error
    Io,
    /// General error
    Other,
}

impl ErrorKind {
    pub fn code(&self) -> u32 {
        match self {
            Self::Timeout => 1001,
            Self::Network => 1002,
            Self::ServerError => 1003,
            Self::Auth => 1004,
            Self::Http => 1005,
            Self::ExhaustedRetries => 1006,
            Self::Decode => 1007,
            Self::Config => 2001,
            Self::Io => 2002,
            Self::Other => 9999,
        }
    }
}

impl AppError {
    pub fn new(kind: ErrorKind, payload: HashMap<String, String>) -> Self {
        Self {
            payload,
            kind,
            status: None,
            empty_body: false,
        }
    }

    /// Create an error with a single "detail" key from a non-empty string,
    /// or an empty payload if the string is empty.
    fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let payload = if detail.is_empty() {
            HashMap::new()
        } else {
            HashMap::from([("detail".to_string(), detail)])
        };
        Self::new(kind, payload)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Network, message)
    }

    pub fn network_with_url(url: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Network,
            HashMap::from([
                ("url".to_string(), url.to_string()),
                ("detail".to_string(), detail.into()),
            ]),
        )
    }

    /// Build an error from a non-success HTTP status and its (possibly empty) body.
    ///
    /// 401 maps to [`ErrorKind::Auth`], 5xx to [`ErrorKind::ServerError`],
    /// everything else to [`ErrorKind::Http`].
    pub fn http_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 => ErrorKind::Auth,
            s if s >= 500 => ErrorKind::ServerError,
            _ => ErrorKind::Http,
        };
        let trimmed = body.trim();
        let mut payload = HashMap::from([("status".to_string(), status.to_string())]);
        if !trimmed.is_empty() {
            payload.insert("detail".to_string(), trimmed.to_string());
        }
        Self {
            payload,
            kind,
            status: Some(status),
            empty_body: trimmed.is_empty(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::http_status(401, "")
    }

    pub fn exhausted_retries(attempts: u32, last_error: &str) -> Self {
        Self::new(
            ErrorKind::ExhaustedRetries,
            HashMap::from([
                ("attempts".to_string(), attempts.to_string()),
                ("detail".to_string(), last_error.to_string()),
            ]),
        )
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Decode, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Io, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Other, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_auth(&self) -> bool {
        self.kind == ErrorKind::Auth
    }

    /// Whether this failure looks like a suspended backend rather than a real rejection.
    ///
    /// Timeouts, connection failures, 502/503/504 and a bare 500 with no body all count.
    pub fn is_sleep_signature(&self) -> bool {
        match self.kind {
            ErrorKind::Timeout | ErrorKind::Network => true,
            ErrorKind::ServerError => match self.status {
                Some(502..=504) => true,
                Some(500) => self.empty_body,
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            let mut pairs: Vec<String> = self
                .payload
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            pairs.sort();
            write!(f, "{:?}: {}", self.kind, pairs.join(", "))
        }
    }
}

impl std::error::Error for AppError {}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct as _;
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("code", &self.kind.code())?;
        s.serialize_field("payload", &self.payload)?;
        s.end()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_decode() {
            Self::decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::http_status(status.as_u16(), "")
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err.to_string())
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_statuses_are_sleep_signatures() {
        for status in [502, 503, 504] {
            let err = AppError::http_status(status, "<html>bad gateway</html>");
            assert_eq!(err.kind(), ErrorKind::ServerError);
            assert!(err.is_sleep_signature(), "status {status}");
        }
    }

    #[test]
    fn bare_500_is_sleep_signature_but_500_with_body_is_not() {
        assert!(AppError::http_status(500, "  ").is_sleep_signature());
        assert!(!AppError::http_status(500, "{\"detail\":\"boom\"}").is_sleep_signature());
    }

    #[test]
    fn unauthorized_is_auth_and_never_sleep() {
        let err = AppError::unauthorized();
        assert!(err.is_auth());
        assert!(!err.is_sleep_signature());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn client_errors_are_plain_http() {
        let err = AppError::http_status(404, "not found");
        assert_eq!(err.kind(), ErrorKind::Http);
        assert!(!err.is_sleep_signature());
    }

    #[test]
    fn serializes_code_and_payload() {
        let err = AppError::exhausted_retries(3, "timeout");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], 1006);
        assert_eq!(value["payload"]["attempts"], "3");
    }

    #[test]
    fn display_lists_payload_pairs_in_order() {
        let err = AppError::network_with_url("http://x", "refused");
        assert_eq!(err.to_string(), "Network: detail=refused, url=http://x");
    }
}
