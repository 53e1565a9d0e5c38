//! Delegate pod readiness watcher
//!
//! Follows pod events in the target namespace until the delegate
//! reaches the Running phase.

use std::time::Duration;

use futures::{pin_mut, Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::Api,
    runtime::watcher::{self, Event as WatchEvent},
};
use tracing::{error, info};

use super::client::K8sClient;
use crate::error::{Error, Result};
use crate::notify::{Notifier, Progress};

/// Block until a pod matching `label_selector` in `namespace` reports
/// the Running phase.
///
/// Every pod event emits a [`Progress::DelegateConnecting`] notification
/// so the caller can show liveness while the delegate starts up. If the
/// event stream ends before any pod runs, this returns
/// [`Error::WatchStreamClosed`]; if `deadline` elapses first, it returns
/// [`Error::WatchTimeout`]. Transient watch errors are logged and the
/// stream continues.
pub async fn watch_delegate_ready(
    client: &K8sClient,
    namespace: &str,
    label_selector: &str,
    deadline: Option<Duration>,
    notifier: &dyn Notifier,
) -> Result<()> {
    let pods: Api<Pod> = Api::namespaced(client.inner().clone(), namespace);
    let watcher_config = watcher::Config::default().labels(label_selector);
    let pod_stream = watcher::watcher(pods, watcher_config);

    info!(namespace, label_selector, "watching for delegate pod readiness");

    watch_events(pod_stream, deadline, notifier).await
}

/// Deadline wrapper around the event loop; separated from the cluster
/// stream so both error paths are exercisable in tests.
async fn watch_events<S>(
    events: S,
    deadline: Option<Duration>,
    notifier: &dyn Notifier,
) -> Result<()>
where
    S: Stream<Item = std::result::Result<WatchEvent<Pod>, watcher::Error>>,
{
    match deadline {
        Some(limit) => {
            match tokio::time::timeout(limit, watch_until_running(events, notifier)).await {
                Ok(result) => result,
                Err(_) => Err(Error::WatchTimeout),
            }
        }
        None => watch_until_running(events, notifier).await,
    }
}

async fn watch_until_running<S>(events: S, notifier: &dyn Notifier) -> Result<()>
where
    S: Stream<Item = std::result::Result<WatchEvent<Pod>, watcher::Error>>,
{
    pin_mut!(events);

    while let Some(event) = events.next().await {
        match event {
            Ok(WatchEvent::Applied(pod)) => {
                notifier.notify(Progress::DelegateConnecting);
                if pod_is_running(&pod) {
                    notifier.notify(Progress::DelegateRunning);
                    return Ok(());
                }
            }
            Ok(WatchEvent::Restarted(pods)) => {
                notifier.notify(Progress::DelegateConnecting);
                if let Some(pod) = pods.iter().find(|p| pod_is_running(p)) {
                    info!(
                        pod = %pod.metadata.name.as_deref().unwrap_or("unknown"),
                        "delegate pod already running"
                    );
                    notifier.notify(Progress::DelegateRunning);
                    return Ok(());
                }
            }
            Ok(WatchEvent::Deleted(_)) => {
                notifier.notify(Progress::DelegateConnecting);
            }
            Err(e) => {
                // The watcher re-establishes itself; keep consuming.
                error!("pod watch error: {}", e);
            }
        }
    }

    Err(Error::WatchStreamClosed)
}

fn pod_is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(|phase| phase == "Running")
        .unwrap_or(false)
}
