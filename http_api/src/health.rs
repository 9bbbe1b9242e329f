//! Handlers for `GET /healthz`, `GET /readyz` and `GET /status`.

use launcher_state::LauncherState;
use launcher_types::StatusResponse;
use warp::http::StatusCode;

pub async fn healthz() -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::with_status("alive", StatusCode::OK))
}

pub async fn readyz(state: LauncherState) -> Result<impl warp::Reply, warp::Rejection> {
    if state.is_ready() {
        Ok(warp::reply::with_status("ready", StatusCode::OK))
    } else {
        Ok(warp::reply::with_status("not ready", StatusCode::SERVICE_UNAVAILABLE))
    }
}

pub async fn status(state: LauncherState) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(warp::reply::json(&StatusResponse {
        status: state.status().as_str(),
    }))
}
