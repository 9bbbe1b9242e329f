//! Shared request/response types and the core error enum for the launcher.
//!
//! Kept dependency-free of `warp` so that it can be used by library crates
//! (`validator_store`, `supervisor`, `readiness`) without pulling in the HTTP
//! stack; `http_api` is the only crate that knows how to turn a
//! [`LauncherError`] into a rejection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;

/// A validator entry as surfaced by `GetOne`/`List`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorData {
    pub name: String,
    pub pubkey: Option<String>,
}

/// Body of `POST /validator` and `PUT /validator`.
#[derive(Debug, Deserialize)]
pub struct ValidatorRequest {
    pub name: String,
    pub keystore: serde_json::Value,
}

/// Body of `DELETE /validator`.
#[derive(Debug, Deserialize)]
pub struct DeleteValidatorRequest {
    pub name: String,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// A JSON error envelope, mirrored on the error responses of every route.
#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub code: u16,
    pub message: String,
}

/// The unified error type returned by every core component.
///
/// `http_api::reject` is the only place this is mapped onto a status code;
/// everywhere else it is propagated with `?`.
#[derive(Debug)]
pub enum LauncherError {
    BadRequest(String),
    MalformedKeystore(String),
    MissingFlag(String),
    NotFound(String),
    AlreadyExists(String),
    Conflict(String),
    Io(String),
    WatchFailure(String),
    ChildExited(String),
}

impl LauncherError {
    /// A short machine-friendly label, used in logs and in tests.
    pub fn kind(&self) -> &'static str {
        match self {
            LauncherError::BadRequest(_) => "bad_request",
            LauncherError::MalformedKeystore(_) => "malformed_keystore",
            LauncherError::MissingFlag(_) => "missing_flag",
            LauncherError::NotFound(_) => "not_found",
            LauncherError::AlreadyExists(_) => "already_exists",
            LauncherError::Conflict(_) => "conflict",
            LauncherError::Io(_) => "io",
            LauncherError::WatchFailure(_) => "watch_failure",
            LauncherError::ChildExited(_) => "child_exited",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LauncherError::BadRequest(m)
            | LauncherError::MalformedKeystore(m)
            | LauncherError::MissingFlag(m)
            | LauncherError::NotFound(m)
            | LauncherError::AlreadyExists(m)
            | LauncherError::Conflict(m)
            | LauncherError::Io(m)
            | LauncherError::WatchFailure(m)
            | LauncherError::ChildExited(m) => m,
        }
    }
}

impl fmt::Display for LauncherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for LauncherError {}

impl From<io::Error> for LauncherError {
    fn from(e: io::Error) -> Self {
        LauncherError::Io(e.to_string())
    }
}
