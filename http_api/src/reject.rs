//! Maps [`LauncherError`] onto `warp` rejections and rejections onto JSON
//! error responses.
//!
//! Modelled directly on the teacher's `http_api::reject`: a `Reject` wrapper
//! around the domain error type, and a `handle_rejection` that inspects
//! `Rejection` variants in a fixed priority order and always produces a
//! JSON body, never an empty response.

use launcher_types::{ErrorMessage, LauncherError};
use std::convert::Infallible;
use warp::{http::StatusCode, reject::Reject};

#[derive(Debug)]
pub struct Rejected(pub LauncherError);

impl Reject for Rejected {}

pub fn custom(e: LauncherError) -> warp::reject::Rejection {
    warp::reject::custom(Rejected(e))
}

fn status_for(e: &LauncherError) -> StatusCode {
    match e {
        LauncherError::BadRequest(_)
        | LauncherError::MalformedKeystore(_)
        | LauncherError::MissingFlag(_) => StatusCode::BAD_REQUEST,
        LauncherError::NotFound(_) => StatusCode::NOT_FOUND,
        LauncherError::AlreadyExists(_) => StatusCode::CONFLICT,
        LauncherError::Conflict(_) => StatusCode::BAD_REQUEST,
        LauncherError::Io(_) | LauncherError::WatchFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LauncherError::ChildExited(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Receives a `Rejection` and always returns a JSON error envelope, falling
/// through a fixed list of known rejection causes before giving up with a
/// generic 500.
pub async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "NOT_FOUND".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            format!("BAD_REQUEST: {}", e),
        )
    } else if let Some(_) = err.find::<warp::reject::MethodNotAllowed>() {
        (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED".to_string())
    } else if let Some(e) = err.find::<Rejected>() {
        (status_for(&e.0), e.0.to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "UNHANDLED_REJECTION".to_string())
    };

    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message,
    });

    Ok(warp::reply::with_status(json, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_the_error_handling_policy() {
        assert_eq!(status_for(&LauncherError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&LauncherError::AlreadyExists("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_for(&LauncherError::Conflict("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&LauncherError::Io("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
