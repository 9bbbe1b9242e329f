//! Handler for `POST /start`.

use crate::reject;
use crate::Context;
use launcher_types::LauncherError;
use serde::Deserialize;
use slog::info;
use std::path::PathBuf;
use std::sync::Arc;
use warp::http::StatusCode;

#[derive(Debug, Deserialize)]
pub struct StartForm {
    pub fee_recipient: Option<String>,
    pub dry_run: Option<String>,
}

fn parse_dry_run(raw: Option<&str>) -> bool {
    matches!(raw, Some("true") | Some("1"))
}

pub async fn start(form: StartForm, ctx: Arc<Context>) -> Result<impl warp::Reply, warp::Rejection> {
    let fee_recipient = form
        .fee_recipient
        .filter(|s| !s.is_empty())
        .ok_or_else(|| reject::custom(LauncherError::BadRequest("fee_recipient is required".to_string())))?;
    let dry_run = parse_dry_run(form.dry_run.as_deref());

    let flags = launch_flags::parse(&ctx.launcher_args).map_err(reject::custom)?;

    let mut final_args = ctx.launcher_args.clone();
    final_args.push(format!("--suggested-fee-recipient={}", fee_recipient));

    if dry_run {
        info!(
            ctx.log,
            "dry run requested, validator will not be launched";
            "fee_recipient" => &fee_recipient,
        );
        return Ok(warp::reply::with_status(
            format!("dry run: would launch with args {:?}", final_args),
            StatusCode::OK,
        ));
    }

    let datadir = PathBuf::from(flags.datadir);
    ctx.supervisor
        .launch(&datadir, final_args)
        .await
        .map(|()| warp::reply::with_status("validator launched".to_string(), StatusCode::OK))
        .map_err(reject::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_accepts_true_or_one_only() {
        assert!(parse_dry_run(Some("true")));
        assert!(parse_dry_run(Some("1")));
        assert!(!parse_dry_run(Some("yes")));
        assert!(!parse_dry_run(None));
    }
}
