//! Error types for the bootstrap workflow.

use std::process::ExitStatus;

use thiserror::Error;

/// Result type alias for bootstrap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating the cluster or applying the
/// delegate manifest.
///
/// Absence of a resource is never an error (existence checks return
/// `Ok(false)`), and a denied permission is never an error (the prober
/// returns a decision value). Everything here is a genuine failure the
/// caller has to act on.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to read kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("failed to infer cluster configuration: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("manifest fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Non-zero apply exit with captured stderr; the stderr text is the
    /// error message, verbatim.
    #[error("{0}")]
    Apply(String),

    /// Non-zero apply exit with nothing on stderr.
    #[error("apply command exited with {0}")]
    ApplyExit(ExitStatus),

    #[error("watch stream closed before the delegate pod reached Running")]
    WatchStreamClosed,

    #[error("timed out waiting for the delegate pod to reach Running")]
    WatchTimeout,
}
