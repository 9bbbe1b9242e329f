//! The validator-launcher's HTTP surface.
//!
//! Route composition follows the teacher's `beacon_node::http_api` shape: a
//! shared `Context` threaded through every filter via `warp::any().map`,
//! a single `.recover(reject::handle_rejection)` at the top, and an access
//! log wrapped around everything except the liveness/readiness probes (so
//! a Kubernetes kubelet hammering `/healthz` every few seconds doesn't
//! flood the log).

mod health;
mod reject;
mod start;
mod validator;

use launcher_state::LauncherState;
use launcher_types::{DeleteValidatorRequest, ValidatorRequest};
use slog::{info, Logger};
use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use supervisor::Supervisor;
use warp::{Filter, Rejection, Reply};

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: IpAddr,
    pub listen_port: u16,
}

pub struct Context {
    pub config: Config,
    /// The validator binary's pass-through tail arguments, captured once at
    /// startup and never mutated; handlers re-derive `--datadir`/`--network`
    /// from it on every request rather than caching the parse.
    pub launcher_args: Vec<String>,
    pub state: LauncherState,
    pub supervisor: Arc<Supervisor>,
    pub log: Logger,
}

fn with_ctx(ctx: Arc<Context>) -> impl Filter<Extract = (Arc<Context>,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn with_state(state: LauncherState) -> impl Filter<Extract = (LauncherState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Builds the full route table. Exposed so integration tests under
/// `tests/` can drive it directly with `warp::test::request()` without
/// binding a real socket.
pub fn routes(ctx: Arc<Context>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let healthz = warp::get()
        .and(warp::path("healthz"))
        .and(warp::path::end())
        .and_then(health::healthz);

    let readyz = warp::get()
        .and(warp::path("readyz"))
        .and(warp::path::end())
        .and(with_state(ctx.state.clone()))
        .and_then(health::readyz);

    let probes = healthz.or(readyz);

    let status = warp::get()
        .and(warp::path("status"))
        .and(warp::path::end())
        .and(with_state(ctx.state.clone()))
        .and_then(health::status);

    let get_validator = warp::get()
        .and(warp::path("validator"))
        .and(warp::path::end())
        .and(warp::query::<validator::NameQuery>())
        .and(with_ctx(ctx.clone()))
        .and_then(validator::get_validator);

    let create_validator = warp::post()
        .and(warp::path("validator"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(1024 * 1024))
        .and(warp::body::json::<ValidatorRequest>())
        .and(with_ctx(ctx.clone()))
        .and_then(validator::create_validator);

    let update_validator = warp::put()
        .and(warp::path("validator"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(1024 * 1024))
        .and(warp::body::json::<ValidatorRequest>())
        .and(with_ctx(ctx.clone()))
        .and_then(validator::update_validator);

    let delete_validator = warp::delete()
        .and(warp::path("validator"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(1024 * 1024))
        .and(warp::body::json::<DeleteValidatorRequest>())
        .and(with_ctx(ctx.clone()))
        .and_then(validator::delete_validator);

    let start = warp::post()
        .and(warp::path("start"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::form::<start::StartForm>())
        .and(with_ctx(ctx.clone()))
        .and_then(start::start);

    let logged_log = ctx.log.clone();
    let logged = status
        .or(get_validator)
        .or(create_validator)
        .or(update_validator)
        .or(delete_validator)
        .or(start)
        .with(warp::log::custom(move |info| {
            info!(
                logged_log,
                "http request";
                "method" => %info.method(),
                "path" => info.path(),
                "status" => info.status().as_u16(),
                "elapsed_ms" => info.elapsed().as_millis() as u64,
            );
        }));

    let catch_all = warp::any().and_then(|| async {
        Ok::<_, Rejection>(warp::redirect::redirect(warp::http::Uri::from_static("/healthz")))
    });

    probes.or(logged).or(catch_all).recover(reject::handle_rejection)
}

/// Binds the HTTP listener and returns the bound address plus a future that
/// drives the server until `shutdown` resolves.
pub fn serve(
    ctx: Arc<Context>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()>), std::io::Error> {
    let socket_addr = SocketAddr::new(ctx.config.listen_addr, ctx.config.listen_port);
    let filter = routes(ctx);

    let (addr, server) = warp::serve(filter)
        .try_bind_with_graceful_shutdown(socket_addr, shutdown)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    Ok((addr, server))
}
