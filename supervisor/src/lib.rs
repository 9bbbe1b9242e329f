//! Spawns and supervises the validator child process.
//!
//! Single-writer discipline: at most one child exists at a time. A launch
//! races the child's exit against a 10-second timer to decide whether to
//! report success/failure synchronously to the HTTP caller, or to let the
//! child run and observe its eventual exit in the background.
//!
//! The subprocess plumbing (piped stdio, closing stdin immediately, two
//! line-draining tasks, a dedicated exit-waiter task) is the async
//! analogue of the teacher's `std::process::Command` usage for shelling out
//! to helper binaries (see the pack's Kubernetes test-harness examples),
//! generalized from "run one command to completion" to "stream a
//! long-lived child's output while racing its exit against a timer".

use launcher_state::{LauncherState, ValidatorStatus};
use launcher_types::LauncherError;
use slog::{error, info, Logger};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// How long a launch waits to observe an early failing exit before
/// reporting success and continuing to watch in the background.
const EARLY_EXIT_WINDOW: Duration = Duration::from_secs(10);

const INIT_SLASHING_PROTECTION_FLAG: &str = "--init-slashing-protection";

pub struct Supervisor {
    child_binary: String,
    state: LauncherState,
    log: Logger,
    plain_log: Logger,
}

impl Supervisor {
    pub fn new(
        child_binary: impl Into<String>,
        state: LauncherState,
        log: Logger,
        plain_log: Logger,
    ) -> Self {
        Self {
            child_binary: child_binary.into(),
            state,
            log,
            plain_log,
        }
    }

    /// Spawns the validator child with `final_args`, appended with
    /// `--init-slashing-protection` on first boot only (i.e. when the
    /// slashing-protection database does not yet exist and the caller
    /// hasn't already requested it). Concurrent first-boot launches on a
    /// fresh datadir are not defended against; see `DESIGN.md`.
    pub async fn launch(&self, datadir: &Path, mut final_args: Vec<String>) -> Result<(), LauncherError> {
        if self.state.status() == ValidatorStatus::Running {
            return Err(LauncherError::Conflict(
                "Validator is already running".to_string(),
            ));
        }

        let db_path = validator_store::slashing_protection_db_path(datadir);
        if !db_path.exists() && !final_args.iter().any(|a| a == INIT_SLASHING_PROTECTION_FLAG) {
            final_args.push(INIT_SLASHING_PROTECTION_FLAG.to_string());
        }

        info!(self.log, "spawning validator child"; "binary" => &self.child_binary, "args" => final_args.join(" "));

        let mut child = Command::new(&self.child_binary)
            .args(&final_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                LauncherError::Io(format!("failed to spawn {}: {}", self.child_binary, e))
            })?;

        // The validator doesn't read a password from stdin; close it
        // immediately so the child never blocks waiting for one.
        drop(child.stdin.take());

        if let Some(stdout) = child.stdout.take() {
            let plain_log = self.plain_log.clone();
            tokio::spawn(drain_stdout(stdout, plain_log));
        }
        if let Some(stderr) = child.stderr.take() {
            let log = self.log.clone();
            tokio::spawn(drain_stderr(stderr, log));
        }

        let (exit_tx, exit_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let result = child.wait().await;
            let _ = exit_tx.send(result);
        });

        self.observe_launch(exit_rx).await
    }

    async fn observe_launch(
        &self,
        mut exit_rx: tokio::sync::oneshot::Receiver<std::io::Result<std::process::ExitStatus>>,
    ) -> Result<(), LauncherError> {
        let state = self.state.clone();
        let log = self.log.clone();

        tokio::select! {
            exit_result = &mut exit_rx => {
                match exit_result {
                    Ok(Ok(status)) if status.success() => {
                        state.set_status(ValidatorStatus::Stopped);
                        info!(log, "validator exited cleanly within the observation window");
                        Ok(())
                    }
                    Ok(Ok(status)) => {
                        state.set_status(ValidatorStatus::Errored);
                        Err(LauncherError::ChildExited(format!(
                            "validator exited early with status {}", status
                        )))
                    }
                    Ok(Err(e)) => {
                        state.set_status(ValidatorStatus::Errored);
                        Err(LauncherError::ChildExited(format!("failed to wait on child: {}", e)))
                    }
                    Err(_) => {
                        state.set_status(ValidatorStatus::Errored);
                        Err(LauncherError::ChildExited("exit channel closed unexpectedly".to_string()))
                    }
                }
            }
            _ = tokio::time::sleep(EARLY_EXIT_WINDOW) => {
                state.set_status(ValidatorStatus::Running);
                info!(log, "validator observed running past the early-exit window");
                tokio::spawn(observe_in_background(exit_rx, state, log));
                Ok(())
            }
        }
    }
}

/// Continues watching a child that survived the 10-second window, updating
/// status to `stopped`/`errored` whenever it eventually exits.
async fn observe_in_background(
    exit_rx: tokio::sync::oneshot::Receiver<std::io::Result<std::process::ExitStatus>>,
    state: LauncherState,
    log: Logger,
) {
    match exit_rx.await {
        Ok(Ok(status)) if status.success() => {
            state.set_status(ValidatorStatus::Stopped);
            info!(log, "validator exited cleanly");
        }
        Ok(Ok(status)) => {
            state.set_status(ValidatorStatus::Errored);
            error!(log, "validator exited with a non-zero status"; "status" => %status);
        }
        Ok(Err(e)) => {
            state.set_status(ValidatorStatus::Errored);
            error!(log, "failed to wait on validator child"; "error" => %e);
        }
        Err(_) => {
            state.set_status(ValidatorStatus::Errored);
            error!(log, "lost the validator child's exit channel");
        }
    }
}

/// Forwards stdout lines verbatim to the plain logger. Scanner errors are
/// logged once and end the drainer without killing the child.
async fn drain_stdout<R: AsyncRead + Unpin>(reader: R, plain_log: Logger) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => info!(plain_log, "{}", line),
            Ok(None) => break,
            Err(e) => {
                error!(plain_log, "stdout scanner error, stopping stdout drain"; "error" => %e);
                break;
            }
        }
    }
}

/// Forwards stderr lines to the structured logger at info level.
async fn drain_stderr<R: AsyncRead + Unpin>(reader: R, log: Logger) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => info!(log, "validator stderr"; "line" => line),
            Ok(None) => break,
            Err(e) => {
                error!(log, "stderr scanner error, stopping stderr drain"; "error" => %e);
                break;
            }
        }
    }
}
