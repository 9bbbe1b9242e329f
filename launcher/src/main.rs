//! Entry point: parses CLI flags, wires the readiness watcher, the process
//! supervisor and the HTTP API together, and drives them on a
//! multi-threaded Tokio runtime.
//!
//! The CLI surface is built with `clap`'s 2.x builder API (`App`/`Arg`),
//! matching the way the teacher's top-level binary composes its flags
//! rather than the newer derive macros.

use clap::{App, Arg};
use launcher_state::LauncherState;
use slog::{crit, info};
use std::net::IpAddr;
use std::process::exit;
use std::sync::Arc;
use std::time::Duration;
use supervisor::Supervisor;

const CHILD_BINARY: &str = "lighthouse";

/// Splits `std::env::args()` at the literal `--` separator. Everything
/// before it is this binary's own flags; everything after is the
/// validator child's argument vector, forwarded untouched.
fn split_args(all: Vec<String>) -> (Vec<String>, Vec<String>) {
    match all.iter().position(|a| a == "--") {
        Some(idx) => {
            let own = all[..idx].to_vec();
            let child = all[idx + 1..].to_vec();
            (own, child)
        }
        None => (all, vec![]),
    }
}

/// Parses `-timeout`: a bare number of seconds, or a number suffixed with
/// `s`/`m`/`h`. `0` (in any unit) means "wait forever". Anything else that
/// doesn't parse is an error rather than a silently-substituted default.
fn parse_timeout(raw: &str) -> Result<Option<Duration>, String> {
    let (digits, unit) = match raw.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&raw[..raw.len() - 1], c),
        _ => (raw, 's'),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid -timeout value: {:?}", raw))?;

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        _ => return Err(format!("invalid -timeout unit: {:?}", raw)),
    };

    let secs = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("-timeout value overflows: {:?}", raw))?;

    if secs == 0 {
        Ok(None)
    } else {
        Ok(Some(Duration::from_secs(secs)))
    }
}

fn main() {
    let all_args: Vec<String> = std::env::args().collect();
    let (own_args, child_args) = split_args(all_args);

    let matches = App::new("launcher")
        .author("Sigma Prime <contact@sigmaprime.io>")
        .about("Supervises a validator client binary inside a cluster-managed pod.")
        .arg(
            Arg::with_name("address")
                .long("address")
                .value_name("ADDRESS")
                .help("Address the HTTP control plane binds to.")
                .default_value("0.0.0.0")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("port")
                .long("port")
                .value_name("PORT")
                .help("Port the HTTP control plane binds to.")
                .default_value("5000")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("loglevel")
                .long("loglevel")
                .value_name("LEVEL")
                .help("Log level: debug, info, warn or error. Defaults to the LOG_LEVEL env var, then info. Unrecognised values map to info.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("pod")
                .long("pod")
                .value_name("NAME")
                .help("Name of the beacon node pod to watch for readiness. Takes precedence over -service.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("service")
                .long("service")
                .value_name("NAME")
                .help("Name of the beacon node service to watch for readiness.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("namespace")
                .long("namespace")
                .value_name("NAMESPACE")
                .help("Kubernetes namespace to watch in. Auto-detected from the service account when empty.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("DURATION")
                .help("Duration to wait for readiness before giving up, e.g. 30s, 10m, 1h. 0 waits forever.")
                .default_value("10m")
                .takes_value(true),
        )
        .get_matches_from(own_args);

    let log = logging::build_structured_logger(logging::resolve_level(matches.value_of("loglevel")));
    let plain_log = logging::build_plain_logger(format!("[{}] ", CHILD_BINARY));

    let listen_addr: IpAddr = matches
        .value_of("address")
        .unwrap()
        .parse()
        .unwrap_or_else(|e| {
            crit!(log, "invalid -address value"; "error" => %e);
            exit(2);
        });
    let listen_port: u16 = matches.value_of("port").unwrap().parse().unwrap_or_else(|e| {
        crit!(log, "invalid -port value"; "error" => %e);
        exit(2);
    });

    let target = match (matches.value_of("pod"), matches.value_of("service")) {
        (Some(pod), _) => Some(readiness::Target::Pod(pod.to_string())),
        (None, Some(svc)) => Some(readiness::Target::Service(svc.to_string())),
        (None, None) => None,
    };
    let namespace = matches.value_of("namespace").map(|s| s.to_string());
    let timeout = parse_timeout(matches.value_of("timeout").unwrap()).unwrap_or_else(|e| {
        crit!(log, "invalid -timeout value"; "error" => e);
        exit(2);
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build the Tokio runtime");

    runtime.block_on(async move {
        let state = LauncherState::new();

        if let Some(target) = target {
            let watcher_config = readiness::WatcherConfig {
                target,
                namespace,
                timeout,
            };
            let watcher_state = state.clone();
            let watcher_log = log.clone();
            tokio::spawn(readiness::run(watcher_config, watcher_state, watcher_log));
        } else {
            info!(log, "no -pod or -service given, readiness watcher not started");
        }

        let supervisor = Arc::new(Supervisor::new(
            CHILD_BINARY,
            state.clone(),
            log.clone(),
            plain_log,
        ));

        let ctx = Arc::new(http_api::Context {
            config: http_api::Config {
                listen_addr,
                listen_port,
            },
            launcher_args: child_args,
            state,
            supervisor,
            log: log.clone(),
        });

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        match http_api::serve(ctx, shutdown) {
            Ok((addr, server)) => {
                info!(log, "http control plane listening"; "address" => %addr);
                server.await;
                exit(0);
            }
            Err(e) => {
                crit!(log, "failed to bind the http control plane"; "error" => %e);
                exit(2);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_args_separates_own_flags_from_child_args() {
        let all = vec![
            "launcher".to_string(),
            "--port".to_string(),
            "6000".to_string(),
            "--".to_string(),
            "--datadir".to_string(),
            "/data".to_string(),
        ];
        let (own, child) = split_args(all);
        assert_eq!(own, vec!["launcher", "--port", "6000"]);
        assert_eq!(child, vec!["--datadir", "/data"]);
    }

    #[test]
    fn split_args_without_separator_has_no_child_args() {
        let all = vec!["launcher".to_string(), "--port".to_string(), "6000".to_string()];
        let (own, child) = split_args(all);
        assert_eq!(own, vec!["launcher", "--port", "6000"]);
        assert!(child.is_empty());
    }

    #[test]
    fn parse_timeout_zero_means_forever() {
        assert_eq!(parse_timeout("0").unwrap(), None);
        assert_eq!(parse_timeout("0m").unwrap(), None);
    }

    #[test]
    fn parse_timeout_accepts_bare_seconds_and_suffixed_units() {
        assert_eq!(parse_timeout("30").unwrap(), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout("30s").unwrap(), Some(Duration::from_secs(30)));
        assert_eq!(parse_timeout("10m").unwrap(), Some(Duration::from_secs(600)));
        assert_eq!(parse_timeout("1h").unwrap(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn parse_timeout_rejects_malformed_input() {
        assert!(parse_timeout("10x").is_err());
        assert!(parse_timeout("abc").is_err());
        assert!(parse_timeout("").is_err());
    }
}
