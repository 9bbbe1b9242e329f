//! Waits for the beacon node sidecar to become reachable by watching a pod
//! (preferred) or a service's endpoints, then flips the process-wide
//! readiness flag exactly once.
//!
//! Built on `kube`'s `Api`/`kube::runtime::watcher`, which already owns
//! retry/reconnect semantics, rather than hand-rolling HTTP long-polling of
//! the API server — grounded on the pack's Kubernetes-watching examples
//! (e.g. the `watcher(api, params).touched_objects()` idiom used to turn
//! pod readiness conditions into application-level events).

use futures::StreamExt;
use k8s_openapi::api::core::v1::{Endpoints, Pod};
use kube::api::Api;
use kube::runtime::{watcher, WatchStreamExt};
use kube::Client;
use launcher_state::LauncherState;
use slog::{info, warn, Logger};
use std::time::Duration;

const SA_NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
const DEFAULT_NAMESPACE: &str = "default";

/// What to watch. A pod takes precedence over a service when both are
/// configured (enforced by the caller when building this).
#[derive(Debug, Clone)]
pub enum Target {
    Pod(String),
    Service(String),
}

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub target: Target,
    pub namespace: Option<String>,
    /// `None` means wait forever.
    pub timeout: Option<Duration>,
}

/// Namespace resolution order: explicit argument, then the mounted
/// service-account namespace file, then the literal `"default"`.
pub async fn resolve_namespace(explicit: Option<String>) -> String {
    if let Some(ns) = explicit {
        if !ns.is_empty() {
            return ns;
        }
    }

    match tokio::fs::read_to_string(SA_NAMESPACE_FILE).await {
        Ok(contents) => {
            let trimmed = contents.trim();
            if trimmed.is_empty() {
                DEFAULT_NAMESPACE.to_string()
            } else {
                trimmed.to_string()
            }
        }
        Err(_) => DEFAULT_NAMESPACE.to_string(),
    }
}

/// Runs the watcher to completion: either the target becomes ready (the
/// readiness flag is flipped and this returns), the timeout elapses, or the
/// watch itself fails. This is not retried — a failed watch is terminal for
/// this process' lifetime; the scheduler is expected to restart the pod.
pub async fn run(config: WatcherConfig, state: LauncherState, log: Logger) {
    let namespace = resolve_namespace(config.namespace.clone()).await;

    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(e) => {
            warn!(log, "failed to build in-cluster Kubernetes client"; "error" => %e);
            return;
        }
    };

    let wait = watch_until_ready(client, &config.target, &namespace, log.clone());

    let became_ready = match config.timeout {
        Some(timeout) if !timeout.is_zero() => tokio::select! {
            ready = wait => ready,
            _ = tokio::time::sleep(timeout) => {
                warn!(log, "timed out waiting for readiness"; "timeout_secs" => timeout.as_secs());
                false
            }
        },
        _ => wait.await,
    };

    if became_ready && state.set_ready() {
        info!(log, "readiness flag set"; "namespace" => namespace);
    }
}

async fn watch_until_ready(client: Client, target: &Target, namespace: &str, log: Logger) -> bool {
    match target {
        Target::Pod(name) => watch_pod(client, name, namespace, log).await,
        Target::Service(name) => watch_service(client, name, namespace, log).await,
    }
}

fn name_selector(name: &str) -> watcher::Config {
    watcher::Config::default().fields(&format!("metadata.name={}", name))
}

async fn watch_pod(client: Client, name: &str, namespace: &str, log: Logger) -> bool {
    let api: Api<Pod> = Api::namespaced(client, namespace);
    let mut stream = Box::pin(watcher(api, name_selector(name)).touched_objects());

    while let Some(event) = stream.next().await {
        match event {
            Ok(pod) => {
                if pod_is_ready(&pod) {
                    return true;
                }
            }
            Err(e) => warn!(log, "pod watch error"; "pod" => name, "error" => %e),
        }
    }

    warn!(log, "pod watch stream ended before readiness"; "pod" => name);
    false
}

async fn watch_service(client: Client, name: &str, namespace: &str, log: Logger) -> bool {
    let api: Api<Endpoints> = Api::namespaced(client, namespace);
    let mut stream = Box::pin(watcher(api, name_selector(name)).applied_objects());

    while let Some(event) = stream.next().await {
        match event {
            Ok(endpoints) => {
                if endpoints_have_address(&endpoints) {
                    return true;
                }
            }
            Err(e) => warn!(log, "service watch error"; "service" => name, "error" => %e),
        }
    }

    warn!(log, "service watch stream ended before readiness"; "service" => name);
    false
}

/// Ready when a condition of type `Ready` has status `True`. Emitted once;
/// a later flap back to NotReady is intentionally not observed again — see
/// `DESIGN.md` for the "monotonic readiness" note.
fn pod_is_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| conditions.iter().any(|c| c.type_ == "Ready" && c.status == "True"))
        .unwrap_or(false)
}

/// Ready when any subset carries at least one address.
fn endpoints_have_address(endpoints: &Endpoints) -> bool {
    endpoints
        .subsets
        .as_ref()
        .map(|subsets| {
            subsets
                .iter()
                .any(|s| s.addresses.as_ref().map(|a| !a.is_empty()).unwrap_or(false))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{EndpointAddress, EndpointSubset, PodCondition, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod_with_conditions(conditions: Vec<PodCondition>) -> Pod {
        Pod {
            metadata: ObjectMeta::default(),
            spec: None,
            status: Some(PodStatus {
                conditions: Some(conditions),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn pod_ready_requires_true_ready_condition() {
        let not_ready = pod_with_conditions(vec![PodCondition {
            type_: "Ready".to_string(),
            status: "False".to_string(),
            ..Default::default()
        }]);
        assert!(!pod_is_ready(&not_ready));

        let ready = pod_with_conditions(vec![PodCondition {
            type_: "Ready".to_string(),
            status: "True".to_string(),
            ..Default::default()
        }]);
        assert!(pod_is_ready(&ready));
    }

    #[test]
    fn pod_without_status_is_not_ready() {
        let pod = Pod {
            metadata: ObjectMeta::default(),
            spec: None,
            status: None,
        };
        assert!(!pod_is_ready(&pod));
    }

    #[test]
    fn endpoints_ready_when_any_subset_has_an_address() {
        let empty = Endpoints {
            metadata: ObjectMeta::default(),
            subsets: Some(vec![EndpointSubset {
                addresses: Some(vec![]),
                ..Default::default()
            }]),
        };
        assert!(!endpoints_have_address(&empty));

        let populated = Endpoints {
            metadata: ObjectMeta::default(),
            subsets: Some(vec![EndpointSubset {
                addresses: Some(vec![EndpointAddress {
                    ip: "10.0.0.1".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }]),
        };
        assert!(endpoints_have_address(&populated));
    }

    #[tokio::test]
    async fn namespace_falls_back_to_default_without_mounted_file() {
        // In any environment without the service-account file mounted
        // (true for this test sandbox), resolution falls through to the
        // literal default.
        assert_eq!(resolve_namespace(None).await, DEFAULT_NAMESPACE);
    }

    #[tokio::test]
    async fn explicit_namespace_wins() {
        assert_eq!(resolve_namespace(Some("staging".to_string())).await, "staging");
    }
}
