//! Handlers for `GET/POST/PUT/DELETE /validator`.
//!
//! Filesystem work runs on `tokio::task::spawn_blocking` the way the
//! teacher's `blocking_json_task` keeps synchronous, potentially slow work
//! off the async executor's worker threads (see the validator-client HTTP
//! API's `GET lighthouse/validators` handler, which does the equivalent for
//! an in-memory read).

use crate::reject;
use crate::Context;
use launcher_types::{DeleteValidatorRequest, LauncherError, ValidatorRequest};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use warp::http::StatusCode;

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

fn resolve_store_location(ctx: &Context) -> Result<(PathBuf, String), warp::Rejection> {
    let flags = launch_flags::parse(&ctx.launcher_args).map_err(reject::custom)?;
    Ok((PathBuf::from(flags.datadir), flags.network))
}

pub async fn get_validator(
    query: NameQuery,
    ctx: Arc<Context>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (datadir, network) = resolve_store_location(&ctx)?;
    let log = ctx.log.clone();

    match query.name {
        Some(name) => {
            let result = tokio::task::spawn_blocking(move || validator_store::get_one(&datadir, &network, &name))
                .await
                .map_err(|e| reject::custom(LauncherError::Io(e.to_string())))?;

            result
                .map(|data| warp::reply::with_status(warp::reply::json(&data), StatusCode::OK))
                .map_err(reject::custom)
        }
        None => {
            let result = tokio::task::spawn_blocking(move || validator_store::list(&datadir, &network, &log))
                .await
                .map_err(|e| reject::custom(LauncherError::Io(e.to_string())))?;

            result
                .map(|data| warp::reply::with_status(warp::reply::json(&data), StatusCode::OK))
                .map_err(reject::custom)
        }
    }
}

pub async fn create_validator(
    body: ValidatorRequest,
    ctx: Arc<Context>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (datadir, network) = resolve_store_location(&ctx)?;
    let log = ctx.log.clone();
    let name = body.name;
    let keystore_bytes = serde_json::to_vec(&body.keystore)
        .map_err(|e| reject::custom(LauncherError::BadRequest(e.to_string())))?;

    let result = tokio::task::spawn_blocking(move || {
        validator_store::create(&datadir, &network, &name, &keystore_bytes, &log)
    })
    .await
    .map_err(|e| reject::custom(LauncherError::Io(e.to_string())))?;

    result
        .map(|()| {
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "message": "validator keystore created" })),
                StatusCode::CREATED,
            )
        })
        .map_err(reject::custom)
}

pub async fn update_validator(
    body: ValidatorRequest,
    ctx: Arc<Context>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let (datadir, network) = resolve_store_location(&ctx)?;
    let log = ctx.log.clone();
    let name = body.name;
    let keystore_bytes = serde_json::to_vec(&body.keystore)
        .map_err(|e| reject::custom(LauncherError::BadRequest(e.to_string())))?;

    let result = tokio::task::spawn_blocking(move || {
        validator_store::update(&datadir, &network, &name, &keystore_bytes, &log)
    })
    .await
    .map_err(|e| reject::custom(LauncherError::Io(e.to_string())))?;

    result
        .map(|()| {
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "message": "validator keystore updated" })),
                StatusCode::OK,
            )
        })
        .map_err(reject::custom)
}

pub async fn delete_validator(
    body: DeleteValidatorRequest,
    ctx: Arc<Context>,
) -> Result<impl warp::Reply, warp::Rejection> {
    if body.name.is_empty() {
        return Err(reject::custom(LauncherError::BadRequest(
            "name is required".to_string(),
        )));
    }

    let (datadir, network) = resolve_store_location(&ctx)?;
    let log = ctx.log.clone();
    let name = body.name;

    let result = tokio::task::spawn_blocking(move || validator_store::delete(&datadir, &network, &name, &log))
        .await
        .map_err(|e| reject::custom(LauncherError::Io(e.to_string())))?;

    result
        .map(|()| {
            warp::reply::with_status(
                warp::reply::json(&serde_json::json!({ "message": "validator keystore deleted" })),
                StatusCode::OK,
            )
        })
        .map_err(reject::custom)
}
