use crate::client::AuthMode;
use crate::quota::OperationClass;

use reqwest::header::InvalidHeaderValue;

use thiserror::Error;

/// Result type for `aviary`, using [`crate::error::Error`].
pub type Result<T> = ::std::result::Result<T, Error>;

/// Enum for `aviary` errors.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// No quota policy is registered for this operation class and auth mode. This is a
    /// programmer error: the registry must cover every combination the client can issue.
    #[error("no quota policy for {class:?} requests in {mode:?} context")]
    Configuration {
        class: OperationClass,
        mode: AuthMode,
    },

    /// An HTTP error has occurred. The first value is the status code, the second is the
    /// reason given by the API, if available.
    #[error("HTTP error {code}{}", describe_status(*.code, .reason))]
    Http { code: u16, reason: Option<String> },

    /// The request couldn't be sent. Contains a description of the error.
    #[error("couldn't send request: {0}")]
    CannotSendRequest(String),

    /// Response deserialization error. Contains a description of the error.
    #[error("deserialization error: {0}")]
    Serial(String),

    /// The client couldn't be created. Contains a description of the error.
    #[error("couldn't create client: {0}")]
    CannotCreateClient(String),

    /// A stream session in a terminal state was asked to run again.
    #[error("stream session is terminal; construct a new session to reconnect")]
    SessionTerminal,
}

fn describe_status(code: u16, reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {}", reason),
        None => match code {
            401 => String::from(" Unauthorized: Authentication credentials were missing or incorrect"),
            403 => String::from(" Forbidden: The request is understood, but it has been refused"),
            404 => String::from(" Not Found: The URI requested is invalid or the resource does not exist"),
            420 | 429 => String::from(" Rate Limited: The request cannot be served because a quota has been exhausted"),
            500 => String::from(" Internal Server Error: Something is broken on the remote side"),
            503 => String::from(" Service Unavailable: The servers are up, but overloaded with requests"),
            _ => String::new(),
        },
    }
}

impl From<InvalidHeaderValue> for Error {
    fn from(e: InvalidHeaderValue) -> Error {
        Error::CannotCreateClient(format!("invalid header value: {}", e))
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Error {
        Error::CannotCreateClient(format!("invalid base URL: {}", e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Error {
        Error::Serial(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_generic_reason() {
        let e = Error::Http {
            code: 429,
            reason: None,
        };

        assert!(e.to_string().contains("Rate Limited"));
    }

    #[test]
    fn http_error_api_reason() {
        let e = Error::Http {
            code: 404,
            reason: Some(String::from("Sorry, that page does not exist")),
        };

        assert_eq!(
            e.to_string(),
            "HTTP error 404: Sorry, that page does not exist"
        );
    }
}
